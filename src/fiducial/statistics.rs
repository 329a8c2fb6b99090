//! Summary statistics over a detection result

use std::collections::BTreeMap;

use super::types::{BeatAnnotation, DetectionStatistics};
use crate::lead::Lead;
use crate::stats;

/// RR intervals outside this range (ms) are ignored for heart rate
pub const RR_RANGE_MS: (f64, f64) = (200.0, 3000.0);

/// Aggregate heart rate from the global R peaks and detection rates over every annotation
///
/// # Arguments
/// * `global_r_peaks` - Reference-lead R peaks, ascending
/// * `sample_rate` - Samples per second
/// * `leads` - Per-lead beat annotations
pub fn compute_statistics(
    global_r_peaks: &[usize],
    sample_rate: f64,
    leads: &BTreeMap<Lead, Vec<BeatAnnotation>>,
) -> DetectionStatistics {
    let rates: Vec<f64> = global_r_peaks
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 * 1000.0 / sample_rate)
        .filter(|rr| (RR_RANGE_MS.0..=RR_RANGE_MS.1).contains(rr))
        .map(|rr| 60_000.0 / rr)
        .collect();

    let beats: Vec<&BeatAnnotation> = leads.values().flatten().collect();
    let fraction = |count: usize| {
        if beats.is_empty() {
            0.0
        } else {
            count as f64 / beats.len() as f64
        }
    };
    let qualities: Vec<f64> = beats.iter().map(|b| b.quality).collect();

    DetectionStatistics {
        total_beats: global_r_peaks.len(),
        mean_heart_rate: stats::mean(&rates),
        min_heart_rate: rates.iter().copied().reduce(f64::min).unwrap_or(0.0),
        max_heart_rate: rates.iter().copied().reduce(f64::max).unwrap_or(0.0),
        p_wave_detection_rate: fraction(beats.iter().filter(|b| b.p_wave.present).count()),
        t_wave_detection_rate: fraction(beats.iter().filter(|b| b.t_wave.present).count()),
        mean_confidence: stats::mean(&qualities),
    }
}
