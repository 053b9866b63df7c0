//! Error types for airband operations.

use thiserror::Error;

/// Result type for airband operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while opening or reading a sample source.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file, stdin or TCP sources).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Device enumeration or initialization failed.
    #[error("Device error: {0}")]
    Device(String),

    /// Invalid receiver configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// RTL-SDR driver error (requires the "rtlsdr" feature).
    #[cfg(feature = "rtlsdr")]
    #[error("RTL-SDR error: {0}")]
    RtlSdr(String),
}

impl Error {
    /// Create a device error with a custom message
    pub fn device<S: Into<String>>(msg: S) -> Self {
        Error::Device(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_device_error_constructor() {
        let err = Error::device("no supported devices found");
        assert!(matches!(err, Error::Device(_)));
        assert_eq!(err.to_string(), "Device error: no supported devices found");
    }

    #[test]
    fn test_config_error_constructor() {
        let err = Error::config("please specify a frequency");
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("Configuration error"));
    }
}
