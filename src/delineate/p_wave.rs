//! P wave delineation

use super::wavelet::{extend_over_adjacent_lobes, locate_wave, ADJACENT_LOBE_FRACTION};
use super::{plausibility, LeadContext, DEGENERATE_WINDOW_CONFIDENCE, LOBE_GAP_MS};
use crate::fiducial::types::{FiducialPoint, PWaveAnnotation, PWaveMorphology};
use crate::stats;

/// Window start before the QRS onset when no previous T offset is known, ms
pub const P_SEARCH_BEFORE_QRS_MS: f64 = 300.0;

/// Window end before the QRS onset, ms
pub const P_GAP_BEFORE_QRS_MS: f64 = 20.0;

/// Shortest window that can hold a P wave, ms
pub const P_MIN_WINDOW_MS: f64 = 40.0;

/// Smallest |amplitude| reported as a P wave, µV
pub const P_MIN_AMPLITUDE_UV: f64 = 20.0;

/// P waves taller than this are peaked (2.5 mm at 10 mm/mV), µV
pub const P_PEAKED_UV: f64 = 250.0;

/// Humps of a bifid P wave are at least this far apart, ms
pub const BIFID_SEPARATION_MS: f64 = 20.0;

/// Confidence of a window that holds no wave
const NO_WAVE_CONFIDENCE: f64 = 0.2;

/// Two humps above half the amplitude with a notch between them
fn is_bifid(ctx: &LeadContext, onset: usize, offset: usize, amplitude: f64) -> bool {
    if amplitude <= 0.0 || offset <= onset + 2 {
        return false;
    }
    let segment: Vec<f64> = (onset..=offset).map(|i| ctx.deviation(i)).collect();
    let humps = stats::find_peaks(&segment, 0.5 * amplitude, ctx.samples(BIFID_SEPARATION_MS).max(1));
    let [first, second, ..] = humps[..] else {
        return false;
    };
    let notch = segment[first..=second].iter().copied().fold(f64::INFINITY, f64::min);
    notch < 0.9 * segment[first].min(segment[second])
}

/// Delineate the P wave preceding a QRS complex
///
/// # Arguments
/// * `ctx` - Prepared lead
/// * `qrs_onset` - Onset of the beat's QRS complex
/// * `previous_t_offset` - End of the previous beat's T wave, bounding the search window
pub fn delineate_p(ctx: &LeadContext, qrs_onset: usize, previous_t_offset: Option<usize>) -> PWaveAnnotation {
    let end = qrs_onset.saturating_sub(ctx.samples(P_GAP_BEFORE_QRS_MS)).min(ctx.len());
    let start = previous_t_offset.unwrap_or_else(|| qrs_onset.saturating_sub(ctx.samples(P_SEARCH_BEFORE_QRS_MS)));
    if end <= start + ctx.samples(P_MIN_WINDOW_MS) {
        return PWaveAnnotation::absent(DEGENERATE_WINDOW_CONFIDENCE);
    }

    let Some(fit) = locate_wave(&ctx.w_p, start..end) else {
        return PWaveAnnotation::absent(NO_WAVE_CONFIDENCE);
    };
    let fit = extend_over_adjacent_lobes(&ctx.w_p, fit, start..end, ADJACENT_LOBE_FRACTION, ctx.samples(LOBE_GAP_MS));
    let amplitude = ctx.deviation(fit.peak);
    if amplitude.abs() < P_MIN_AMPLITUDE_UV {
        return PWaveAnnotation::absent(NO_WAVE_CONFIDENCE);
    }

    let duration_ms = ctx.ms_between(fit.onset, fit.offset);
    let morphology = if amplitude < 0.0 {
        PWaveMorphology::Inverted
    } else if is_bifid(ctx, fit.onset, fit.offset, amplitude) {
        PWaveMorphology::Bifid
    } else if amplitude > P_PEAKED_UV {
        PWaveMorphology::Peaked
    } else {
        PWaveMorphology::Normal
    };

    let confidence = plausibility(duration_ms, (60.0, 120.0), (40.0, 160.0))
        * plausibility(amplitude.abs(), (50.0, 250.0), (20.0, 400.0));
    let point = |i: usize| FiducialPoint::at(ctx.signal, i, ctx.sample_rate, confidence);

    PWaveAnnotation {
        present: true,
        onset: Some(point(fit.onset)),
        peak: Some(point(fit.peak)),
        offset: Some(point(fit.offset)),
        amplitude,
        duration_ms,
        morphology,
        confidence,
    }
}
