//! U wave: a small positive deflection after the T wave

use super::{LeadContext, DEGENERATE_WINDOW_CONFIDENCE};
use crate::fiducial::types::{FiducialPoint, TWaveAnnotation, UWaveAnnotation};
use crate::stats;

pub const U_START_AFTER_T_MS: f64 = 20.0;
pub const U_SPAN_AFTER_T_MS: f64 = 250.0;
pub const U_END_BEFORE_QRS_MS: f64 = 50.0;
pub const U_MIN_WINDOW_MS: f64 = 40.0;

/// µV
pub const U_MIN_AMPLITUDE_UV: f64 = 20.0;

/// A U wave is never taller than this fraction of the T wave
pub const U_MAX_T_FRACTION: f64 = 0.5;

const PRESENT_CONFIDENCE: f64 = 0.6;
const NO_WAVE_CONFIDENCE: f64 = 0.3;

/// Look for a U wave after a delineated T wave
///
/// Without a T offset there is nowhere to look and the result is absent with zero confidence.
pub fn delineate_u(ctx: &LeadContext, t_wave: &TWaveAnnotation, next_qrs_onset: Option<usize>) -> UWaveAnnotation {
    let Some(t_offset) = t_wave.offset.filter(|_| t_wave.present).map(|p| p.index) else {
        return UWaveAnnotation::absent(0.0);
    };

    let start = t_offset + ctx.samples(U_START_AFTER_T_MS);
    let mut end = (t_offset + ctx.samples(U_SPAN_AFTER_T_MS)).min(ctx.len());
    if let Some(onset) = next_qrs_onset {
        end = end.min(onset.saturating_sub(ctx.samples(U_END_BEFORE_QRS_MS)));
    }
    if end <= start + ctx.samples(U_MIN_WINDOW_MS) {
        return UWaveAnnotation::absent(DEGENERATE_WINDOW_CONFIDENCE);
    }

    let Some(peak) = stats::argmax_in(ctx.signal, start..end) else {
        return UWaveAnnotation::absent(NO_WAVE_CONFIDENCE);
    };
    let amplitude = ctx.deviation(peak);
    let interior = peak > start && peak + 1 < end;
    let hump = interior && ctx.signal[peak] >= ctx.signal[peak - 1] && ctx.signal[peak] >= ctx.signal[peak + 1];
    if !hump || amplitude < U_MIN_AMPLITUDE_UV || amplitude > U_MAX_T_FRACTION * t_wave.amplitude.abs() {
        return UWaveAnnotation::absent(NO_WAVE_CONFIDENCE);
    }

    UWaveAnnotation {
        present: true,
        peak: Some(FiducialPoint::at(ctx.signal, peak, ctx.sample_rate, PRESENT_CONFIDENCE)),
        amplitude,
        confidence: PRESENT_CONFIDENCE,
    }
}
