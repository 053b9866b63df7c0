/// Digital Signal Processing (DSP) module.
///
/// This module provides the baseband half of the receive chain, working on
/// raw IQ byte blocks straight from a sample source:
///
/// # Modules
/// - `baseband`: the conditioner turning IQ blocks into i16 envelope audio.
/// - `filters`: post-decimation low-pass, de-emphasis and DC blocking.
/// - `squelch`: mean-absolute-deviation carrier detection.
pub mod baseband;
pub mod filters;
pub mod squelch;

pub use baseband::{Conditioned, Conditioner, ConditionerConfig};
pub use filters::{DcBlocker, DeemphasisFilter, PostLowPass};
pub use squelch::Squelch;
