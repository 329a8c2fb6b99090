//! Wavelet-based wave delineation
//!
//! **Module Organization**:
//! - `wavelet` - difference-of-moving-averages transform, zero crossings, modulus maxima
//! - `qrs_complex` - onset, Q, R, S, R′, S′, J point
//! - `p_wave` - P wave between the previous T offset and the QRS onset
//! - `t_wave` - T wave between the J point and the next QRS onset, tangent-refined offset
//! - `u_wave` - small positive deflection after the T wave
//!
//! **Search windows** (cardiac timing conventions):
//! - P: previous T offset (else QRS onset − 300 ms) to QRS onset − 20 ms
//! - T: J + 50 ms to next QRS onset − 50 ms (else J + 400 ms)
//! - U: T offset + 20 ms to min(T offset + 250 ms, next QRS onset − 50 ms)
//!
//! A window too short to hold a wave yields an annotation with `present: false` and a
//! low explicit confidence instead of an error.

pub mod p_wave;
pub mod qrs_complex;
pub mod t_wave;
pub mod u_wave;
pub mod wavelet;

pub use p_wave::delineate_p;
pub use qrs_complex::delineate_qrs;
pub use t_wave::delineate_t;
pub use u_wave::delineate_u;
pub use wavelet::{
    extend_over_adjacent_lobes, locate_wave, modulus_maximum, scale_for, walk_to_boundary, wavelet_transform,
    zero_crossings, WaveFit,
};

use crate::stats;

/// Confidence reported for a wave whose search window is degenerate
pub const DEGENERATE_WINDOW_CONFIDENCE: f64 = 0.1;

/// Flat stretch separating two waves, ms
pub const LOBE_GAP_MS: f64 = 16.0;

/// One lead prepared for delineation: the samples, their isoelectric level, and the
/// transform at each wave's scale
#[derive(Debug, Clone)]
pub struct LeadContext<'a> {
    pub signal: &'a [f64],
    pub sample_rate: f64,
    /// Median of the lead, µV
    pub baseline: f64,
    pub w_p: Vec<f64>,
    pub w_qrs: Vec<f64>,
    pub w_t: Vec<f64>,
}

impl<'a> LeadContext<'a> {
    pub fn new(signal: &'a [f64], sample_rate: f64) -> Self {
        Self {
            signal,
            sample_rate,
            baseline: stats::median(signal),
            w_p: wavelet_transform(signal, scale_for(wavelet::P_SCALE, sample_rate)),
            w_qrs: wavelet_transform(signal, scale_for(wavelet::QRS_SCALE, sample_rate)),
            w_t: wavelet_transform(signal, scale_for(wavelet::T_SCALE, sample_rate)),
        }
    }

    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    /// Samples spanned by `ms` milliseconds
    pub fn samples(&self, ms: f64) -> usize {
        (ms * self.sample_rate / 1000.0).round().max(0.0) as usize
    }

    /// Milliseconds between two sample indices
    pub fn ms_between(&self, from: usize, to: usize) -> f64 {
        (to as f64 - from as f64) * 1000.0 / self.sample_rate
    }

    /// Sample value relative to the isoelectric level
    pub fn deviation(&self, index: usize) -> f64 {
        self.signal.get(index).map_or(0.0, |v| v - self.baseline)
    }
}

/// Multiplier for a measurement inside `[lo, hi]` (1.0), inside the wider `[wide_lo, wide_hi]`
/// (0.7), or outside both (0.4)
pub(crate) fn plausibility(value: f64, (lo, hi): (f64, f64), (wide_lo, wide_hi): (f64, f64)) -> f64 {
    if (lo..=hi).contains(&value) {
        1.0
    } else if (wide_lo..=wide_hi).contains(&value) {
        0.7
    } else {
        0.4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_helpers() {
        let signal = vec![10.0, 10.0, 30.0, 10.0, 10.0];
        let ctx = LeadContext::new(&signal, 500.0);
        assert_eq!(ctx.baseline, 10.0);
        assert_eq!(ctx.deviation(2), 20.0);
        assert_eq!(ctx.samples(20.0), 10);
        assert_eq!(ctx.ms_between(0, 50), 100.0);
        assert_eq!(ctx.ms_between(50, 0), -100.0);
    }

    #[test]
    fn test_plausibility_bands() {
        assert_eq!(plausibility(100.0, (60.0, 120.0), (40.0, 160.0)), 1.0);
        assert_eq!(plausibility(150.0, (60.0, 120.0), (40.0, 160.0)), 0.7);
        assert_eq!(plausibility(300.0, (60.0, 120.0), (40.0, 160.0)), 0.4);
    }
}
