//! ACARS decoding library.
//!
//! Building blocks for receiving Plain Old ACARS from a 48 kHz AM envelope
//! signal:
//! - [`bitsync::MskBitSync`]: per-sample MSK bit detection
//! - [`frame::FrameDecoder`]: frame assembly, CRC check and correction
//! - [`message::Message`]: the decoded record
//! - [`Decoder`]: the driver tying them together
//!
//! The [`airband`] crate supplies IQ sample sources and the baseband
//! conditioner feeding this pipeline.

pub mod bitsync;
pub mod crc;
pub mod frame;
pub mod message;
pub mod output;

pub use bitsync::MskBitSync;
pub use frame::{FrameDecoder, Step};
pub use message::Message;
pub use output::MessageSink;

/// ACARS bit rate in bits per second.
pub const BIT_RATE: u32 = 2400;

/// Demodulator output rate fed to the bit synchronizer.
pub const AUDIO_RATE: u32 = 48_000;

/// Samples per bit cell at [`AUDIO_RATE`]: one 1200 Hz half cycle.
pub const BITLEN: usize = (AUDIO_RATE / 1200) as usize;

/// Decoder driver: feeds envelope samples through the bit synchronizer and
/// hands complete byte windows to the frame machine, keeping count of bits
/// in flight.
pub struct Decoder {
    bitsync: MskBitSync,
    frame: FrameDecoder,
    nbits: u32,
    rx_idx: u64,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            bitsync: MskBitSync::new(),
            frame: FrameDecoder::new(),
            nbits: 0,
            rx_idx: 0,
        }
    }

    /// Number of messages delivered so far.
    pub fn rx_idx(&self) -> u64 {
        self.rx_idx
    }

    /// Run one block of conditioned audio through the pipeline, delivering
    /// any completed messages to `sink`.
    pub fn process(&mut self, audio: &[i16], sink: &mut dyn MessageSink) {
        for &sample in audio {
            let window = match self.bitsync.feed(sample as f32) {
                Some(window) => window,
                None => continue,
            };
            self.nbits += 1;
            while self.nbits >= 8 {
                match self.frame.feed_byte(window) {
                    Step::Complete(msg) => {
                        sink.emit(&msg, msg.crc_corrected, self.rx_idx);
                        self.rx_idx += 1;
                        self.nbits = 0;
                    }
                    Step::Consumed { bits, resync } => {
                        if resync {
                            self.bitsync.reset_decision();
                        }
                        self.nbits -= bits;
                    }
                }
            }
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u64);

    impl MessageSink for Counter {
        fn emit(&mut self, _msg: &Message, _crc_corrected: bool, rx_idx: u64) {
            assert_eq!(rx_idx, self.0);
            self.0 += 1;
        }
    }

    #[test]
    fn test_silence_delivers_nothing() {
        let mut decoder = Decoder::new();
        let mut sink = Counter(0);
        decoder.process(&vec![0i16; 48_000], &mut sink);
        assert_eq!(sink.0, 0);
        assert_eq!(decoder.rx_idx(), 0);
    }

    #[test]
    fn test_bit_budget_never_underflows() {
        // random envelope noise must never wedge the bit accounting
        let mut decoder = Decoder::new();
        let mut sink = Counter(0);
        let mut state = 0x1234_5678u32;
        let noise: Vec<i16> = (0..100_000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state % 20_000) as i16
            })
            .collect();
        decoder.process(&noise, &mut sink);
        assert!(decoder.nbits < 8);
    }
}
