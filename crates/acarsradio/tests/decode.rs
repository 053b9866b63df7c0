//! End-to-end frame decoding scenarios, driven bit by bit through the
//! frame machine the way the bit synchronizer delivers them.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use acarsradio::crc::{crc_bytes, gen_crc};
use acarsradio::frame::{FrameDecoder, State, Step};
use acarsradio::message::{
    odd, Message, BIT_SYNC_1, BIT_SYNC_2, CHAR_SYNC_1, CHAR_SYNC_2, DEL, ETX, NAK, PRE_KEY, SOH,
    STX,
};

/// Odd-parity encode a block: fixed header fields, text, ETX.
fn block_bytes(text: &[u8]) -> Vec<u8> {
    let mut block = Vec::new();
    for &c in b"2.N12345" {
        block.push(odd(c));
    }
    block.push(odd(NAK));
    for &c in b"H11" {
        block.push(odd(c));
    }
    block.push(odd(STX));
    for &c in b"M01AAB1234" {
        block.push(odd(c));
    }
    for &c in text {
        block.push(odd(c));
    }
    block.push(odd(ETX));
    block
}

/// A complete transmission: pre-key, sync words, SOH, block, CRC, suffix.
fn wire_frame(text: &[u8]) -> Vec<u8> {
    let mut raw = vec![odd(SOH)];
    raw.extend_from_slice(&block_bytes(text));
    let fcs = crc_bytes(&raw);

    let mut wire = vec![PRE_KEY; 26]; // 208 bits of pre-key
    wire.extend_from_slice(&[
        odd(BIT_SYNC_1),
        odd(BIT_SYNC_2),
        odd(CHAR_SYNC_1),
        odd(CHAR_SYNC_2),
    ]);
    wire.extend_from_slice(&raw);
    wire.extend_from_slice(&fcs);
    wire.push(odd(DEL));
    wire
}

/// Bit-level harness around the frame machine: an 8-bit sliding window
/// filled LSB-first, handed over whenever eight bits are pending.
struct BitHarness {
    decoder: FrameDecoder,
    window: u8,
    nbits: u32,
    messages: Vec<Message>,
}

impl BitHarness {
    fn new() -> Self {
        Self {
            decoder: FrameDecoder::new(),
            window: 0,
            nbits: 0,
            messages: Vec::new(),
        }
    }

    fn push_bytes(&mut self, wire: &[u8]) {
        for &byte in wire {
            for j in 0..8 {
                self.window = (self.window >> 1) | if byte & (1 << j) != 0 { 0x80 } else { 0 };
                self.nbits += 1;
                while self.nbits >= 8 {
                    match self.decoder.feed_byte(self.window) {
                        Step::Complete(msg) => {
                            self.messages.push(msg);
                            self.nbits = 0;
                        }
                        Step::Consumed { bits, .. } => self.nbits -= bits,
                    }
                }
            }
        }
    }
}

#[test]
fn minimum_length_frame() {
    let mut harness = BitHarness::new();
    harness.push_bytes(&wire_frame(b""));
    assert_eq!(harness.messages.len(), 1);
    let msg = &harness.messages[0];
    assert_eq!(msg.mode, '2');
    assert_eq!(msg.address, ".N12345");
    assert_eq!(msg.ack, '.'); // NAK renders as a placeholder
    assert_eq!(msg.label, "H1");
    assert_eq!(msg.block_id, '1');
    assert_eq!(msg.seq_no, "M01A");
    assert_eq!(msg.flight_id, "AB1234");
    assert_eq!(msg.text, "");
    assert!(!msg.crc_corrected);
}

#[test]
fn maximum_text_frame() {
    let text = [b'X'; 220];
    let mut harness = BitHarness::new();
    harness.push_bytes(&wire_frame(&text));
    assert_eq!(harness.messages.len(), 1);
    let msg = &harness.messages[0];
    assert_eq!(msg.text.len(), 220);
    assert!(msg.text.bytes().all(|b| b == b'X'));
    assert!(!msg.crc_corrected);
}

#[test]
fn noise_burst_then_valid_frame() {
    let mut rng = StdRng::seed_from_u64(0xacab);
    let noise: Vec<u8> = (0..500)
        .map(|_| loop {
            let b: u8 = rng.gen();
            if b != PRE_KEY {
                break b;
            }
        })
        .collect();

    let mut harness = BitHarness::new();
    harness.push_bytes(&noise);
    assert!(harness.messages.is_empty());
    assert_eq!(harness.decoder.state(), State::HeadLost);

    harness.push_bytes(&wire_frame(b"NOISE TEST"));
    assert_eq!(harness.messages.len(), 1);
    assert_eq!(harness.messages[0].text, "NOISE TEST");
}

#[test]
fn two_concatenated_frames() {
    let mut wire = wire_frame(b"FIRST");
    wire.extend_from_slice(&wire_frame(b"SECOND"));
    let mut harness = BitHarness::new();
    harness.push_bytes(&wire);
    assert_eq!(harness.messages.len(), 2);
    assert_eq!(harness.messages[0].text, "FIRST");
    assert_eq!(harness.messages[1].text, "SECOND");
}

#[test]
fn flipped_bit_in_byte_14_is_corrected() {
    let mut wire = wire_frame(b"FIXABLE");
    // byte 14 of the raw frame counts from the SOH; the sync words and
    // pre-key sit in front of it on the wire
    let raw_start = 26 + 4;
    wire[raw_start + 14] ^= 0x08;
    let mut harness = BitHarness::new();
    harness.push_bytes(&wire);
    assert_eq!(harness.messages.len(), 1);
    let msg = &harness.messages[0];
    assert!(msg.crc_corrected);
    assert_eq!(msg.text, "FIXABLE");
    assert_eq!(msg.seq_no, "M01A");
}

#[test]
fn double_flip_is_dropped() {
    let mut wire = wire_frame(b"BROKEN");
    let raw_start = 26 + 4;
    wire[raw_start + 3] ^= 0x01;
    wire[raw_start + 9] ^= 0x40;
    let mut harness = BitHarness::new();
    harness.push_bytes(&wire);
    assert!(harness.messages.is_empty());
    assert_eq!(harness.decoder.state(), State::HeadLost);
}

#[test]
fn truncated_frame_is_dropped() {
    let full = wire_frame(b"CUT SHORT");
    // drop the second CRC byte and everything after it
    let truncated = &full[..full.len() - 2];

    // pick a filler byte that neither passes the CRC directly nor is
    // reachable by the machine's single-bit correction, so the damaged
    // frame cannot masquerade as valid
    let raw_start = 26 + 4;
    let raw = &full[raw_start..full.len() - 1];
    let filler = (0..=255u8)
        .find(|&candidate| {
            let mut trial = raw[..raw.len() - 1].to_vec();
            trial.push(candidate);
            if gen_crc(&trial) == 0 {
                return false;
            }
            for i in 0..trial.len() {
                for j in 0..8 {
                    trial[i] ^= 1 << j;
                    let fixed = gen_crc(&trial) == 0;
                    trial[i] ^= 1 << j;
                    if fixed {
                        return false;
                    }
                }
            }
            true
        })
        .expect("some filler byte must be uncorrectable");

    let mut harness = BitHarness::new();
    harness.push_bytes(truncated);
    harness.push_bytes(&[filler, filler, filler]);
    assert!(harness.messages.is_empty());
    assert_eq!(harness.decoder.state(), State::HeadLost);
}
