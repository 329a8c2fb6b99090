//! T wave delineation with tangent-refined offset

use super::wavelet::{
    extend_over_adjacent_lobes, locate_wave, modulus_maximum, scale_for, zero_crossings, ADJACENT_LOBE_FRACTION,
    T_SCALE,
};
use super::{plausibility, LeadContext, DEGENERATE_WINDOW_CONFIDENCE, LOBE_GAP_MS};
use crate::fiducial::types::{FiducialPoint, TWaveAnnotation, TWaveMorphology};

/// Window start after the J point, ms
pub const T_START_AFTER_J_MS: f64 = 50.0;

/// Window end before the next QRS onset, ms
pub const T_END_BEFORE_QRS_MS: f64 = 50.0;

/// Window span after J when there is no next beat, ms
pub const T_DEFAULT_SPAN_MS: f64 = 400.0;

/// Shortest window that can hold a T wave, ms
pub const T_MIN_WINDOW_MS: f64 = 80.0;

/// Smallest |amplitude| reported as a T wave, µV
pub const T_MIN_AMPLITUDE_UV: f64 = 30.0;

/// Tall T waves narrower than `T_PEAKED_MAX_DURATION_MS` are peaked, µV
pub const T_PEAKED_UV: f64 = 600.0;
pub const T_PEAKED_MAX_DURATION_MS: f64 = 180.0;

/// Taller than this and broad-based, µV
pub const T_HYPERACUTE_UV: f64 = 1000.0;

/// Each lobe of a biphasic T is at least this fraction of the dominant one
pub const BIPHASIC_LOBE_FRACTION: f64 = 0.3;

const NO_WAVE_CONFIDENCE: f64 = 0.2;

/// Where the tangent at the steepest point of the final lobe meets the baseline
fn tangent_offset(ctx: &LeadContext, peak: usize, offset: usize, end: usize) -> Option<usize> {
    let w = &ctx.w_t;
    let last_extremum = zero_crossings(w, peak..offset + 1).last().copied().unwrap_or(peak);
    let k = modulus_maximum(w, last_extremum + 1..offset + 1)?;

    // A ramp of slope a gives W_s = (s + 1) a
    let slope = w[k] / (scale_for(T_SCALE, ctx.sample_rate) + 1) as f64;
    if slope == 0.0 {
        return None;
    }
    let x = k as f64 + (ctx.baseline - ctx.signal[k]) / slope;
    (x.is_finite() && x >= k as f64 && x < end as f64).then(|| x.round() as usize)
}

/// Delineate the T wave following a QRS complex
///
/// # Arguments
/// * `ctx` - Prepared lead
/// * `j_point` - End of the beat's QRS complex
/// * `next_qrs_onset` - Onset of the following beat, if any
pub fn delineate_t(ctx: &LeadContext, j_point: usize, next_qrs_onset: Option<usize>) -> TWaveAnnotation {
    let start = j_point + ctx.samples(T_START_AFTER_J_MS);
    let end = next_qrs_onset
        .map(|onset| onset.saturating_sub(ctx.samples(T_END_BEFORE_QRS_MS)))
        .unwrap_or(j_point + ctx.samples(T_DEFAULT_SPAN_MS))
        .min(ctx.len());
    if end <= start + ctx.samples(T_MIN_WINDOW_MS) {
        return TWaveAnnotation::absent(DEGENERATE_WINDOW_CONFIDENCE);
    }

    let Some(fit) = locate_wave(&ctx.w_t, start..end) else {
        return TWaveAnnotation::absent(NO_WAVE_CONFIDENCE);
    };
    let fit = extend_over_adjacent_lobes(&ctx.w_t, fit, start..end, ADJACENT_LOBE_FRACTION, ctx.samples(LOBE_GAP_MS));
    let amplitude = ctx.deviation(fit.peak);
    if amplitude.abs() < T_MIN_AMPLITUDE_UV {
        return TWaveAnnotation::absent(NO_WAVE_CONFIDENCE);
    }

    let offset = tangent_offset(ctx, fit.peak, fit.offset, end).unwrap_or(fit.offset);
    let duration_ms = ctx.ms_between(fit.onset, offset);

    let (highest, lowest) = (fit.onset..=fit.offset)
        .map(|i| ctx.deviation(i))
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), v| (hi.max(v), lo.min(v)));
    let lobe_floor = (BIPHASIC_LOBE_FRACTION * amplitude.abs()).max(T_MIN_AMPLITUDE_UV);
    let morphology = if highest >= lobe_floor && -lowest >= lobe_floor {
        TWaveMorphology::Biphasic
    } else if amplitude < 0.0 {
        TWaveMorphology::Inverted
    } else if amplitude >= T_PEAKED_UV && duration_ms < T_PEAKED_MAX_DURATION_MS {
        TWaveMorphology::Peaked
    } else if amplitude >= T_HYPERACUTE_UV {
        TWaveMorphology::Hyperacute
    } else {
        TWaveMorphology::Normal
    };

    let confidence = plausibility(duration_ms, (100.0, 250.0), (60.0, 350.0))
        * plausibility(amplitude.abs(), (50.0, 800.0), (30.0, 1500.0));
    let point = |i: usize| FiducialPoint::at(ctx.signal, i, ctx.sample_rate, confidence);

    TWaveAnnotation {
        present: true,
        onset: Some(point(fit.onset)),
        peak: Some(point(fit.peak)),
        offset: Some(point(offset)),
        amplitude,
        duration_ms,
        morphology,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead_with(waves: &[(f64, f64, f64)]) -> Vec<f64> {
        let mut signal = vec![0.0; 1000];
        for &(center, width, amp) in waves {
            for (i, v) in signal.iter_mut().enumerate() {
                *v += amp * (-((i as f64 - center) / width).powi(2)).exp();
            }
        }
        signal
    }

    #[test]
    fn test_normal_t_wave() {
        let signal = lead_with(&[(650.0, 25.0, 300.0)]);
        let ctx = LeadContext::new(&signal, 500.0);
        let t = delineate_t(&ctx, 530, None);

        assert!(t.present);
        assert_eq!(t.peak.unwrap().index, 650);
        assert_eq!(t.morphology, TWaveMorphology::Normal);
        let onset = t.onset.unwrap().index;
        let offset = t.offset.unwrap().index;
        assert!(onset < 650 && offset > 650);
        // Tangent offset lands before the 10 % boundary
        assert!((680..=695).contains(&offset), "offset {offset}");
        assert!((100.0..=250.0).contains(&t.duration_ms));
        assert!(t.confidence > 0.9);
    }

    #[test]
    fn test_inverted_t_wave() {
        let signal = lead_with(&[(650.0, 25.0, -250.0)]);
        let ctx = LeadContext::new(&signal, 500.0);
        let t = delineate_t(&ctx, 530, None);
        assert!(t.present);
        assert_eq!(t.morphology, TWaveMorphology::Inverted);
        assert!(t.amplitude < -200.0);
    }

    #[test]
    fn test_biphasic_t_wave() {
        let signal = lead_with(&[(630.0, 18.0, 250.0), (675.0, 18.0, -200.0)]);
        let ctx = LeadContext::new(&signal, 500.0);
        let t = delineate_t(&ctx, 530, None);
        assert_eq!(t.morphology, TWaveMorphology::Biphasic);
        assert!(t.offset.unwrap().index > 675);
    }

    #[test]
    fn test_peaked_and_hyperacute() {
        let peaked = lead_with(&[(650.0, 15.0, 800.0)]);
        let ctx = LeadContext::new(&peaked, 500.0);
        assert_eq!(delineate_t(&ctx, 530, None).morphology, TWaveMorphology::Peaked);

        let broad = lead_with(&[(650.0, 30.0, 1200.0)]);
        let ctx = LeadContext::new(&broad, 500.0);
        assert_eq!(delineate_t(&ctx, 530, None).morphology, TWaveMorphology::Hyperacute);
    }

    #[test]
    fn test_late_t_wave_before_distant_beat() {
        // Peak 650 ms after J on a 1.6 s cycle
        let signal = lead_with(&[(425.0, 30.0, 300.0)]);
        let ctx = LeadContext::new(&signal, 500.0);
        let t = delineate_t(&ctx, 100, Some(900));
        assert!(t.present);
        assert_eq!(t.peak.unwrap().index, 425);
        assert_eq!(t.morphology, TWaveMorphology::Normal);
        assert!(t.offset.unwrap().index > 425);
    }

    #[test]
    fn test_window_too_short() {
        let signal = vec![0.0; 1000];
        let ctx = LeadContext::new(&signal, 500.0);
        let t = delineate_t(&ctx, 530, Some(600));
        assert!(!t.present);
        assert_eq!(t.confidence, DEGENERATE_WINDOW_CONFIDENCE);
    }

    #[test]
    fn test_flat_lead_has_no_t() {
        let signal = vec![0.0; 1000];
        let ctx = LeadContext::new(&signal, 500.0);
        let t = delineate_t(&ctx, 530, None);
        assert!(!t.present);
        assert_eq!(t.morphology, TWaveMorphology::Absent);
    }
}
