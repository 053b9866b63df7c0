//! Baseband conditioner: raw IQ byte blocks in, i16 envelope audio out.
//!
//! The conditioner owns every piece of mutable filter state so that a
//! receiver can run several of them independently (no globals). One call to
//! [`Conditioner::process`] runs the whole chain:
//!
//! 1. fs/4 rotation of the block in place, so the tuner can be parked a
//!    quarter of the capture rate away from the channel and the DC spike
//!    stays out of band,
//! 2. low-pass decimation down to the output rate (boxcar window, or a
//!    Hamming-windowed integer FIR when enabled),
//! 3. squelch assessment on the decimated IQ pairs,
//! 4. AM envelope detection into i16 audio (zeroed while squelched),
//! 5. optional post-downsample summing low-pass, de-emphasis and DC
//!    blocking.

use num_complex::Complex;

use super::filters::{DcBlocker, DeemphasisFilter, PostLowPass};
use super::squelch::Squelch;

/// Conditioner settings. `output_rate` is the rate fed to the bit
/// synchronizer multiplied by `post_downsample`; the post low-pass brings
/// it back down.
#[derive(Debug, Clone)]
pub struct ConditionerConfig {
    /// Decimated rate in Hz before post-downsampling.
    pub output_rate: u32,
    /// Post-downsample factor (1..=16), 1 disables the post low-pass.
    pub post_downsample: usize,
    /// Use the Hamming-windowed FIR instead of the boxcar window.
    pub fir_enabled: bool,
    /// Squelch threshold on the decimated IQ deviation; 0 disables.
    pub squelch_level: i32,
    /// Consecutive silent blocks tolerated before the squelch closes.
    pub squelch_blocks: u32,
    /// De-emphasis time constant in seconds, if enabled.
    pub deemphasis: Option<f64>,
    /// Enable the DC blocking filter.
    pub dc_block: bool,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            output_rate: 48_000,
            post_downsample: 1,
            fir_enabled: false,
            squelch_level: 0,
            squelch_blocks: 1,
            deemphasis: None,
            dc_block: false,
        }
    }
}

/// One conditioned block: envelope audio at the final output rate, plus the
/// squelch verdict for this block (`silent` means the squelch has been
/// closed for longer than the configured tolerance).
pub struct Conditioned<'a> {
    pub audio: &'a [i16],
    pub silent: bool,
}

pub struct Conditioner {
    downsample: usize,
    output_rate: u32,
    output_scale: i32,
    fir: Option<(Vec<i32>, i32)>,
    now: Complex<i32>,
    prev_index: usize,
    signal: Vec<Complex<i32>>,
    audio: Vec<i16>,
    squelch: Option<Squelch>,
    post: Option<PostLowPass>,
    deemphasis: Option<DeemphasisFilter>,
    dc_block: Option<DcBlocker>,
}

impl Conditioner {
    pub fn new(config: &ConditionerConfig) -> Self {
        let downsample = (1_000_000 / config.output_rate + 1) as usize;
        let output_scale = ((1 << 15) / (128 * downsample as i32)).max(1);
        let fir = config.fir_enabled.then(|| build_fir(downsample));
        let squelch = (config.squelch_level > 0)
            .then(|| Squelch::new(config.squelch_level, config.squelch_blocks));
        let post = (config.post_downsample > 1).then(|| PostLowPass::new(config.post_downsample));
        let final_rate = config.output_rate / config.post_downsample as u32;
        let deemphasis = config
            .deemphasis
            .map(|tau| DeemphasisFilter::new(final_rate, tau));
        let dc_block = config.dc_block.then(DcBlocker::new);
        Self {
            downsample,
            output_rate: config.output_rate,
            output_scale,
            fir,
            now: Complex::new(0, 0),
            prev_index: 0,
            signal: Vec::new(),
            audio: Vec::new(),
            squelch,
            post,
            deemphasis,
            dc_block,
        }
    }

    /// Decimation factor applied to the capture rate.
    pub fn downsample(&self) -> usize {
        self.downsample
    }

    /// Rate the device must capture at to produce `output_rate` here.
    pub fn capture_rate(&self) -> u32 {
        self.downsample as u32 * self.output_rate
    }

    /// Frequency the tuner must be set to for a channel at `tuned` Hz:
    /// a quarter of the capture rate above, undone by the fs/4 rotation.
    pub fn capture_freq(&self, tuned: u32) -> u32 {
        tuned + self.capture_rate() / 4
    }

    /// Reload the squelch hit counter after a frequency hop, so a still
    /// silent channel is left again after a single block.
    pub fn squelch_reload(&mut self) {
        if let Some(squelch) = self.squelch.as_mut() {
            squelch.reload();
        }
    }

    /// Condition one raw IQ block. The block is rotated in place.
    pub fn process(&mut self, iq: &mut [u8]) -> Conditioned<'_> {
        rotate_90(iq);
        self.decimate(iq);
        let silent = match self.squelch.as_mut() {
            Some(squelch) => squelch.assess(&self.signal),
            None => false,
        };
        self.demodulate(silent);
        if let Some(post) = self.post.as_ref() {
            post.process(&mut self.audio);
        }
        if let Some(deemphasis) = self.deemphasis.as_mut() {
            deemphasis.process(&mut self.audio);
        }
        if let Some(dc) = self.dc_block.as_mut() {
            dc.process(&mut self.audio);
        }
        Conditioned {
            audio: &self.audio,
            silent,
        }
    }

    fn decimate(&mut self, iq: &[u8]) {
        self.signal.clear();
        match self.fir.as_ref() {
            None => {
                // square window; odd outputs attenuated by 5/8 as a crude
                // band-limit, the channel is only ~10 kHz wide
                let mut seq = 0usize;
                for pair in iq.chunks_exact(2) {
                    self.now.re += pair[0] as i32 - 127;
                    self.now.im += pair[1] as i32 - 127;
                    self.prev_index += 1;
                    if self.prev_index < self.downsample {
                        continue;
                    }
                    let out = if seq % 2 == 1 {
                        Complex::new(self.now.re * 5 / 8, self.now.im * 5 / 8)
                    } else {
                        self.now
                    };
                    self.signal.push(out);
                    seq += 1;
                    self.prev_index = 0;
                    self.now = Complex::new(0, 0);
                }
            }
            Some((fir, fir_sum)) => {
                for pair in iq.chunks_exact(2) {
                    let w = fir[self.prev_index];
                    self.now.re += (pair[0] as i32 - 127) * w;
                    self.now.im += (pair[1] as i32 - 127) * w;
                    self.prev_index += 1;
                    if self.prev_index < self.downsample {
                        continue;
                    }
                    let n = self.downsample as i32;
                    self.signal.push(Complex::new(
                        self.now.re * n / fir_sum,
                        self.now.im * n / fir_sum,
                    ));
                    self.prev_index = 0;
                    self.now = Complex::new(0, 0);
                }
            }
        }
    }

    fn demodulate(&mut self, mute: bool) {
        self.audio.clear();
        if mute {
            self.audio.resize(self.signal.len(), 0);
            return;
        }
        for s in &self.signal {
            let pcm = (s.re as i64 * s.re as i64 + s.im as i64 * s.im as i64) as f64;
            let env = pcm.sqrt() as i32 * self.output_scale * 8;
            self.audio.push(env.min(i16::MAX as i32) as i16);
        }
    }
}

/// Rotate a block of IQ byte pairs by successive powers of j, shifting the
/// spectrum down by a quarter of the capture rate. The pattern over four
/// pairs is `1, j, -1, -j`; negation of an offset-127 byte is `255 - x`.
pub fn rotate_90(buf: &mut [u8]) {
    for chunk in buf.chunks_exact_mut(8) {
        let tmp = 255 - chunk[3];
        chunk[3] = chunk[2];
        chunk[2] = tmp;

        chunk[4] = 255 - chunk[4];
        chunk[5] = 255 - chunk[5];

        let tmp = 255 - chunk[6];
        chunk[6] = chunk[7];
        chunk[7] = tmp;
    }
}

/// Hamming window scaled to integer taps, one tap per input pair.
fn build_fir(len: usize) -> (Vec<i32>, i32) {
    let a = 25.0 / 46.0;
    let b = 21.0 / 46.0;
    let n1 = (len.max(2) - 1) as f64;
    let fir: Vec<i32> = (0..len)
        .map(|i| {
            let w = a - b * (2.0 * i as f64 * std::f64::consts::PI / n1).cos();
            (w * 255.0) as i32
        })
        .collect();
    let fir_sum = fir.iter().sum();
    (fir, fir_sum)
}
