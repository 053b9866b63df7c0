//! IQ sample sources and baseband conditioning for VHF airband receivers.
//!
//! This crate provides the front half of a software-radio receive chain:
//! - pull-oriented IQ sample sources (file, stdin, TCP, and RTL-SDR devices
//!   behind the `rtlsdr` feature) delivering raw offset-127 byte pairs,
//! - the [`dsp`] module with the baseband conditioner (fs/4 rotation,
//!   decimation, AM envelope detection) and its post filters and squelch.

use std::str::FromStr;

pub mod dsp;
pub mod error;
pub mod iqread;
#[cfg(feature = "rtlsdr")]
pub mod rtlsdr;

pub use error::{Error, Result};

/// Base read size in bytes; actual block sizes are a small multiple of this.
pub const DEFAULT_BLOCK_BYTES: usize = 16384;

/// Largest supported post-downsample factor.
pub const MAXIMUM_OVERSAMPLE: usize = 16;

/// Least common multiple helper indexed by the post-downsample factor, so
/// that a block always carries a whole number of output samples.
const LCM_POST: [usize; MAXIMUM_OVERSAMPLE + 1] =
    [1, 1, 1, 3, 1, 5, 3, 7, 1, 9, 5, 11, 3, 13, 7, 15, 1];

/// Size in bytes of one IQ block for the given post-downsample factor.
pub fn block_len(post_downsample: usize) -> usize {
    LCM_POST[post_downsample.min(MAXIMUM_OVERSAMPLE)] * DEFAULT_BLOCK_BYTES
}

/**
 * I/Q Data Format
 */
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IqFormat {
    /// Complex unsigned 8-bit (Cu8), offset-127 pairs
    Cu8,
    /// Complex signed 8-bit (Cs8), re-biased to offset form on read
    Cs8,
}

impl FromStr for IqFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cu8" => Ok(IqFormat::Cu8),
            "cs8" => Ok(IqFormat::Cs8),
            other => Err(format!("unknown IQ format: {}", other)),
        }
    }
}

/**
 * Synchronous I/Q Data Source
 *
 * Every variant delivers fixed-size blocks of raw IQ bytes (offset-127
 * unsigned pairs) through [`SampleSource::read_block`]. Retuning is a
 * device operation; stream-backed sources accept it as a no-op so a
 * scanning receiver can be exercised against recorded data.
 */
pub enum SampleSource {
    /// File-based IQ source
    File(iqread::IqRead<std::io::BufReader<std::fs::File>>),
    /// Stdin-based IQ source
    Stdin(iqread::IqRead<std::io::BufReader<std::io::Stdin>>),
    /// TCP-based IQ source
    Tcp(iqread::IqRead<std::io::BufReader<std::net::TcpStream>>),
    /// RTL-SDR-based IQ source (requires "rtlsdr" feature)
    #[cfg(feature = "rtlsdr")]
    RtlSdr(rtlsdr::RtlSdrReader),
}

impl SampleSource {
    /// Create a new file-based I/Q source
    pub fn from_file<P: AsRef<std::path::Path>>(path: P, iq_format: IqFormat) -> Result<Self> {
        Ok(SampleSource::File(iqread::IqRead::from_file(path, iq_format)?))
    }

    /// Create a new stdin-based I/Q source
    pub fn from_stdin(iq_format: IqFormat) -> Self {
        SampleSource::Stdin(iqread::IqRead::from_stdin(iq_format))
    }

    /// Create a new TCP-based I/Q source
    pub fn from_tcp(addr: &str, port: u16, iq_format: IqFormat) -> Result<Self> {
        Ok(SampleSource::Tcp(iqread::IqRead::from_tcp(addr, port, iq_format)?))
    }

    /// Create a new RTL-SDR-based I/Q source
    #[cfg(feature = "rtlsdr")]
    pub fn from_rtlsdr(config: &rtlsdr::RtlSdrConfig) -> Result<Self> {
        Ok(SampleSource::RtlSdr(rtlsdr::RtlSdrReader::new(config)?))
    }

    /// Fill `out` with raw IQ bytes. Returns the number of bytes read;
    /// zero means the stream is exhausted.
    pub fn read_block(&mut self, out: &mut [u8]) -> Result<usize> {
        match self {
            SampleSource::File(source) => source.read_block(out),
            SampleSource::Stdin(source) => source.read_block(out),
            SampleSource::Tcp(source) => source.read_block(out),
            #[cfg(feature = "rtlsdr")]
            SampleSource::RtlSdr(source) => source.read_block(out),
        }
    }

    /// Move the capture frequency. Stream-backed sources ignore this.
    pub fn retune(&mut self, capture_freq: u32) -> Result<()> {
        match self {
            SampleSource::File(_) | SampleSource::Stdin(_) | SampleSource::Tcp(_) => {
                let _ = capture_freq;
                Ok(())
            }
            #[cfg(feature = "rtlsdr")]
            SampleSource::RtlSdr(source) => source.retune(capture_freq),
        }
    }
}
