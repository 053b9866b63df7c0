//! RTL-SDR sample source (requires the "rtlsdr" feature).

use rtl_sdr_rs::{RtlSdr, TunerGain};

use crate::error::{Error, Result};

/// Bytes read and discarded after a retune so the PLL settles.
const SETTLE_DUMP_BYTES: usize = 4096;

#[derive(Debug, Clone)]
pub struct RtlSdrConfig {
    /// Device index (0 for first device)
    pub device_index: usize,
    /// Capture frequency in Hz (already offset by capture_rate / 4)
    pub capture_freq: u32,
    /// Capture rate in Hz
    pub capture_rate: u32,
    /// Tuner gain in tenths of dB (None for AGC, Some(gain) for manual)
    pub gain: Option<i32>,
}

pub struct RtlSdrReader {
    rtlsdr: RtlSdr,
}

impl RtlSdrReader {
    pub fn new(config: &RtlSdrConfig) -> Result<Self> {
        let mut rtlsdr = RtlSdr::open_with_index(config.device_index)
            .map_err(|e| Error::RtlSdr(format!("{}", e)))?;
        rtlsdr
            .set_sample_rate(config.capture_rate)
            .map_err(|e| Error::RtlSdr(format!("{}", e)))?;
        rtlsdr
            .set_center_freq(config.capture_freq)
            .map_err(|e| Error::RtlSdr(format!("{}", e)))?;
        match config.gain {
            Some(gain) => rtlsdr.set_tuner_gain(TunerGain::Manual(gain)),
            None => rtlsdr.set_tuner_gain(TunerGain::Auto),
        }
        .map_err(|e| Error::RtlSdr(format!("{}", e)))?;
        let _ = rtlsdr.set_bias_tee(false);
        rtlsdr
            .reset_buffer()
            .map_err(|e| Error::RtlSdr(format!("{}", e)))?;
        Ok(Self { rtlsdr })
    }

    /// Fill `out` with raw offset-127 IQ bytes from the device.
    pub fn read_block(&mut self, out: &mut [u8]) -> Result<usize> {
        self.rtlsdr
            .read_sync(out)
            .map_err(|e| Error::RtlSdr(format!("{}", e)))
    }

    /// Move the capture frequency and flush one settling buffer.
    pub fn retune(&mut self, capture_freq: u32) -> Result<()> {
        self.rtlsdr
            .set_center_freq(capture_freq)
            .map_err(|e| Error::RtlSdr(format!("{}", e)))?;
        let mut dump = [0u8; SETTLE_DUMP_BYTES];
        let _ = self.rtlsdr.read_sync(&mut dump);
        Ok(())
    }
}
