//! Carrier-presence squelch over decimated IQ blocks.

use num_complex::Complex;

/// Mean absolute deviation of one component of the decimated IQ pairs.
fn mad<F: Fn(&Complex<i32>) -> i32>(signal: &[Complex<i32>], component: F) -> i32 {
    if signal.is_empty() {
        return 0;
    }
    let sum: i64 = signal.iter().map(|s| component(s) as i64).sum();
    let ave = (sum / signal.len() as i64) as i32;
    let dev: i64 = signal
        .iter()
        .map(|s| (component(s) - ave).abs() as i64)
        .sum();
    (dev / signal.len() as i64) as i32
}

/// Squelch with a consecutive-silent-block tolerance. A block counts as
/// carrying signal when either the I or the Q deviation exceeds the level;
/// the squelch closes once more than `tolerance` silent blocks pass.
pub struct Squelch {
    level: i32,
    tolerance: u32,
    hits: u32,
}

impl Squelch {
    pub fn new(level: i32, tolerance: u32) -> Self {
        Self {
            level,
            tolerance: tolerance.max(1),
            hits: 0,
        }
    }

    /// Assess one decimated block. Returns true when the squelch is closed.
    pub fn assess(&mut self, signal: &[Complex<i32>]) -> bool {
        let dev_r = mad(signal, |s| s.re);
        let dev_j = mad(signal, |s| s.im);
        if dev_r > self.level || dev_j > self.level {
            self.hits = 0;
            return false;
        }
        self.hits += 1;
        self.hits > self.tolerance
    }

    /// Hair trigger after a frequency hop: the next silent block closes the
    /// squelch immediately instead of waiting out the tolerance again.
    pub fn reload(&mut self) {
        self.hits = self.tolerance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(amplitude: i32, len: usize) -> Vec<Complex<i32>> {
        (0..len)
            .map(|i| {
                let v = if i % 2 == 0 { amplitude } else { -amplitude };
                Complex::new(v, v)
            })
            .collect()
    }

    #[test]
    fn test_mad_flat_is_zero() {
        let signal = vec![Complex::new(42, -7); 32];
        assert_eq!(mad(&signal, |s| s.re), 0);
        assert_eq!(mad(&signal, |s| s.im), 0);
    }

    #[test]
    fn test_mad_alternating() {
        let signal = alternating(100, 32);
        assert_eq!(mad(&signal, |s| s.re), 100);
    }

    #[test]
    fn test_mad_empty() {
        assert_eq!(mad(&[], |s| s.re), 0);
    }

    #[test]
    fn test_squelch_stays_open_on_signal() {
        let mut squelch = Squelch::new(50, 1);
        let signal = alternating(100, 32);
        for _ in 0..10 {
            assert!(!squelch.assess(&signal));
        }
    }

    #[test]
    fn test_squelch_closes_after_tolerance() {
        let mut squelch = Squelch::new(50, 2);
        let quiet = alternating(10, 32);
        assert!(!squelch.assess(&quiet));
        assert!(!squelch.assess(&quiet));
        assert!(squelch.assess(&quiet));
    }

    #[test]
    fn test_signal_reopens_squelch() {
        let mut squelch = Squelch::new(50, 1);
        let quiet = alternating(10, 32);
        let loud = alternating(100, 32);
        squelch.assess(&quiet);
        squelch.assess(&quiet);
        assert!(squelch.assess(&quiet));
        assert!(!squelch.assess(&loud));
        // tolerance applies afresh
        assert!(!squelch.assess(&quiet));
    }

    #[test]
    fn test_reload_hair_trigger() {
        let mut squelch = Squelch::new(50, 3);
        squelch.reload();
        let quiet = alternating(10, 32);
        assert!(squelch.assess(&quiet));
    }
}
