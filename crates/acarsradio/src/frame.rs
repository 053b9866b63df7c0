//! ACARS frame state machine.
//!
//! Bytes from the bit synchronizer drive a seven-state decoder: hunt for
//! the pre-key, ride it, slide bit-by-bit over the BIT SYNC / CHAR SYNC /
//! SOH pattern, collect the block, pick up the two CRC bytes, then verify
//! and hand the frame to the parser. A frame with a single bit error is
//! repaired by exhaustive one-bit correction.

use std::fmt;

use tracing::{debug, trace};

use crate::crc::gen_crc;
use crate::message::{
    odd, Message, BIT_SYNC_1, BIT_SYNC_2, CHAR_SYNC_1, CHAR_SYNC_2, ETB, ETX, MAX_BLOCK_BYTES,
    PRE_KEY, SOH,
};

/// Consecutive pre-key bytes required before leaving `HeadLost`
/// (10 ms of the 2400 bit/s pre-key).
const PREKEY_LIMIT: u32 = (0.010 * 2400.0) as u32;

/// The sync pattern is five words of eight bits.
const SYNC_WORD_BITS: u32 = 40;

/// Bits spent hunting for the sync pattern before starting over.
const SYNC_BITS_LIMIT: u32 = SYNC_WORD_BITS + 15;

/// Bit errors tolerated across the 40-bit sync pattern.
const SYNC_ERR_LIMIT: u32 = 3;

/// The 40-bit pattern marking frame start, oldest byte in the low bits:
/// BIT SYNC, BIT SYNC, CHAR SYNC, CHAR SYNC, SOH, all odd parity.
const SYNC_CHECK: u64 = (odd(BIT_SYNC_1) as u64)
    | (odd(BIT_SYNC_2) as u64) << 8
    | (odd(CHAR_SYNC_1) as u64) << 16
    | (odd(CHAR_SYNC_2) as u64) << 24
    | (odd(SOH) as u64) << 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Hunting for the pre-key.
    HeadLost,
    /// Riding pre-key bytes until something else shows up.
    HeadFound,
    /// Sliding over the BIT SYNC / CHAR SYNC / SOH pattern.
    Sync,
    /// Collecting the block up to ETX or ETB.
    Text,
    /// First CRC byte.
    Crc1,
    /// Second CRC byte.
    Crc2,
    /// Verify, correct and deliver on the next byte.
    End,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::HeadLost => "HEADL",
            State::HeadFound => "HEADF",
            State::Sync => "SYNC",
            State::Text => "TXT",
            State::Crc1 => "CRC1",
            State::Crc2 => "CRC2",
            State::End => "END",
        };
        f.write_str(name)
    }
}

/// Outcome of feeding one byte to the frame machine.
pub enum Step {
    /// `bits` of the byte were consumed; when `resync` is set the caller
    /// must clear the bit synchronizer's slicer polarity.
    Consumed { bits: u32, resync: bool },
    /// A frame passed its CRC and parsed; the whole byte is consumed.
    Complete(Message),
}

pub struct FrameDecoder {
    state: State,
    /// Forming 40-bit sync word, filled from bit 39 downwards.
    sync_forming: u64,
    sync_bits_have: u32,
    consecutive_prekey: u32,
    /// Raw frame: odd-parity SOH, block, ETX/ETB, two CRC bytes.
    raw: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: State::HeadLost,
            sync_forming: 0,
            sync_bits_have: 0,
            consecutive_prekey: 0,
            raw: Vec::with_capacity(MAX_BLOCK_BYTES + 3),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = State::HeadLost;
        self.sync_forming = 0;
        self.sync_bits_have = 0;
        self.consecutive_prekey = 0;
        self.raw.clear();
    }

    /// Feed the current 8-bit window from the bit synchronizer. The loop
    /// allows a state change to reprocess the same byte, which happens when
    /// the first non-pre-key byte turns out to be forming BIT SYNC.
    pub fn feed_byte(&mut self, r: u8) -> Step {
        if self.state != State::HeadLost {
            trace!("{}: {:#04x}", self.state, r);
        }
        loop {
            match self.state {
                State::HeadLost => {
                    if r == PRE_KEY {
                        self.consecutive_prekey += 1;
                        if self.consecutive_prekey > PREKEY_LIMIT {
                            self.state = State::HeadFound;
                        }
                        return Step::Consumed {
                            bits: 1,
                            resync: false,
                        };
                    }
                    self.reset();
                    return Step::Consumed {
                        bits: 1,
                        resync: true,
                    };
                }

                State::HeadFound => {
                    // keep consuming pre-key whole; anything else may be
                    // the first bits of BIT SYNC, so reprocess it there
                    if r == PRE_KEY {
                        return Step::Consumed {
                            bits: 1,
                            resync: false,
                        };
                    }
                    self.state = State::Sync;
                    self.sync_forming = 0;
                    self.sync_bits_have = 0;
                }

                State::Sync => {
                    let mut consumed = 0;
                    for i in 0..8 {
                        self.sync_forming >>= 1;
                        if r & (1u8 << i) != 0 {
                            self.sync_forming |= 1 << (SYNC_WORD_BITS - 1);
                        }
                        consumed += 1;
                        self.sync_bits_have += 1;

                        if self.sync_bits_have >= SYNC_WORD_BITS {
                            let errors = (self.sync_forming ^ SYNC_CHECK).count_ones();
                            trace!(
                                "sync check {:#012x} vs {:#012x}: {} errors",
                                self.sync_forming,
                                SYNC_CHECK,
                                errors
                            );
                            if errors <= SYNC_ERR_LIMIT {
                                self.state = State::Text;
                                self.raw.clear();
                                self.raw.push(odd(SOH));
                                return Step::Consumed {
                                    bits: consumed,
                                    resync: false,
                                };
                            }
                        }

                        if self.sync_bits_have >= SYNC_BITS_LIMIT {
                            self.state = State::HeadLost;
                            return Step::Consumed {
                                bits: consumed,
                                resync: true,
                            };
                        }
                    }
                    return Step::Consumed {
                        bits: consumed,
                        resync: false,
                    };
                }

                State::Text => {
                    self.raw.push(r);
                    // SOH is carried in raw on top of the block maximum
                    if self.raw.len() > MAX_BLOCK_BYTES + 1 {
                        debug!("block overflow at {} bytes", self.raw.len());
                        self.state = State::HeadLost;
                        return Step::Consumed {
                            bits: 8,
                            resync: true,
                        };
                    }
                    if r == odd(ETX) || r == odd(ETB) {
                        self.state = State::Crc1;
                    }
                    return Step::Consumed {
                        bits: 8,
                        resync: false,
                    };
                }

                State::Crc1 => {
                    self.raw.push(r);
                    self.state = State::Crc2;
                    return Step::Consumed {
                        bits: 8,
                        resync: false,
                    };
                }

                State::Crc2 => {
                    self.raw.push(r);
                    self.state = State::End;
                    return Step::Consumed {
                        bits: 8,
                        resync: false,
                    };
                }

                State::End => {
                    // the byte in hand is the block check sequence suffix;
                    // whatever happens the machine starts over
                    self.state = State::HeadLost;

                    if gen_crc(&self.raw) == 0 {
                        return self.deliver(false);
                    }

                    // one-bit correction, first hit by scan order wins
                    for i in 0..self.raw.len() {
                        for j in 0..8 {
                            self.raw[i] ^= 1 << j;
                            if gen_crc(&self.raw) == 0 {
                                return self.deliver(true);
                            }
                            self.raw[i] ^= 1 << j;
                        }
                    }

                    debug!("CRC check failure, {} byte frame dropped", self.raw.len());
                    return Step::Consumed {
                        bits: 8,
                        resync: true,
                    };
                }
            }
        }
    }

    fn deliver(&mut self, crc_corrected: bool) -> Step {
        match Message::parse(&self.raw, crc_corrected) {
            Some(msg) => Step::Complete(msg),
            None => {
                debug!("undersized frame dropped ({} bytes)", self.raw.len());
                Step::Consumed {
                    bits: 8,
                    resync: true,
                }
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
