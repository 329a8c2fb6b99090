//! Physiological plausibility scoring of calibration candidates
//!
//! A candidate is converted into a coarse voltage/time series for the reference lead, a
//! naive peak picker counts beats, and the implied heart rate is scored against
//! physiological ranges and against the visual estimate read off the image.
//!
//! The score constants below were tuned empirically on scanned tracings. They are not
//! physically derived and can be adjusted.

use std::cmp::Ordering;

use crate::lead::Lead;
use crate::stats;
use crate::trace::RawTrace;

use super::candidate::CalibrationCandidate;

/// Implied heart rate within [40, 200] bpm
pub const SCORE_HR_PHYSIOLOGICAL: f64 = 50.0;
/// Implied heart rate within [20, 300] bpm
pub const SCORE_HR_EXTREME: f64 = 25.0;
/// Implied heart rate within [10, 400] bpm
pub const SCORE_HR_MARGINAL: f64 = 5.0;
/// Implied heart rate outside every range, or none at all
pub const SCORE_HR_IMPLAUSIBLE: f64 = -50.0;

/// Agreement with the visual estimate within 10 %
pub const SCORE_VISUAL_WITHIN_10: f64 = 40.0;
/// Agreement within 20 %
pub const SCORE_VISUAL_WITHIN_20: f64 = 25.0;
/// Agreement within 30 %
pub const SCORE_VISUAL_WITHIN_30: f64 = 10.0;
/// Disagreement beyond 50 %
pub const SCORE_VISUAL_DISAGREE: f64 = -20.0;

/// Implied heart rate within the adult resting range [60, 100] bpm
pub const SCORE_NORMAL_RANGE_BONUS: f64 = 10.0;

/// Percentile above which samples count as peak candidates
pub const PEAK_PERCENTILE: f64 = 85.0;

/// Minimum spacing between picked peaks, seconds
pub const MIN_PEAK_SPACING_S: f64 = 0.2;

/// Score of one candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: CalibrationCandidate,
    pub implied_heart_rate: Option<f64>,
    pub score: f64,
}

/// Parse a free-text heart-rate estimate
///
/// "70-80 bpm" and "70 to 80" yield the midpoint 75; "about 72" yields 72. Returns `None`
/// when the text carries no positive number.
pub fn parse_visual_heart_rate(text: &str) -> Option<f64> {
    let mut numbers: Vec<(f64, usize, usize)> = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if let Ok(v) = text[start..i].trim_end_matches('.').parse::<f64>() {
                numbers.push((v, start, i));
            }
        } else {
            i += 1;
        }
    }

    let &(first, _, first_end) = numbers.first()?;
    if let Some(&(second, second_start, _)) = numbers.get(1) {
        let between = text[first_end..second_start].trim().to_ascii_lowercase();
        let is_range = between == "-" || between == "–" || between == "to" || between == "~";
        if is_range && second > 0.0 {
            return Some(0.5 * (first + second));
        }
    }
    (first > 0.0).then_some(first)
}

/// Score an implied heart rate against physiological ranges and the visual estimate
pub fn score_heart_rate(implied: Option<f64>, visual: Option<f64>) -> f64 {
    let Some(hr) = implied else {
        return SCORE_HR_IMPLAUSIBLE;
    };

    let mut score = if (40.0..=200.0).contains(&hr) {
        SCORE_HR_PHYSIOLOGICAL
    } else if (20.0..=300.0).contains(&hr) {
        SCORE_HR_EXTREME
    } else if (10.0..=400.0).contains(&hr) {
        SCORE_HR_MARGINAL
    } else {
        SCORE_HR_IMPLAUSIBLE
    };

    if let Some(v) = visual.filter(|v| *v > 0.0) {
        let disagreement = (hr - v).abs() / v;
        if disagreement <= 0.10 {
            score += SCORE_VISUAL_WITHIN_10;
        } else if disagreement <= 0.20 {
            score += SCORE_VISUAL_WITHIN_20;
        } else if disagreement <= 0.30 {
            score += SCORE_VISUAL_WITHIN_30;
        } else if disagreement > 0.50 {
            score += SCORE_VISUAL_DISAGREE;
        }
    }

    if (60.0..=100.0).contains(&hr) {
        score += SCORE_NORMAL_RANGE_BONUS;
    }
    score
}

/// Peaks of an irregularly sampled series above `threshold`, at least `min_spacing` apart
///
/// Works in time rather than sample index because pixel columns are not uniformly spaced.
/// Tallest peaks are accepted first.
pub fn pick_peaks_by_time(times: &[f64], values: &[f64], threshold: f64, min_spacing: f64) -> Vec<usize> {
    let n = times.len().min(values.len());
    if n < 3 {
        return Vec::new();
    }
    let mut candidates: Vec<usize> = (1..n - 1)
        .filter(|&i| values[i] > threshold && values[i] > values[i - 1] && values[i] >= values[i + 1])
        .collect();
    candidates.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut accepted: Vec<usize> = Vec::new();
    for c in candidates {
        if accepted.iter().all(|&p| (times[p] - times[c]).abs() >= min_spacing) {
            accepted.push(c);
        }
    }
    accepted.sort_unstable();
    accepted
}

/// Heart rate implied by a (time, voltage) series using the 85th-percentile peak picker
pub fn simple_heart_rate(times: &[f64], values: &[f64]) -> Option<f64> {
    let threshold = stats::percentile(values, PEAK_PERCENTILE);
    let peaks = pick_peaks_by_time(times, values, threshold, MIN_PEAK_SPACING_S);
    let peak_times: Vec<f64> = peaks.iter().map(|&i| times[i]).collect();
    stats::heart_rate_from_times(&peak_times)
}

/// Widest trace of lead II, else of the first trace's lead
pub fn reference_trace(traces: &[RawTrace]) -> Option<&RawTrace> {
    let lead = if traces.iter().any(|t| t.lead == Lead::II) {
        Lead::II
    } else {
        traces.first()?.lead
    };
    traces
        .iter()
        .filter(|t| t.lead == lead && t.len() >= 3)
        .fold(None, |best: Option<&RawTrace>, t| match best {
            Some(b) if b.width() >= t.width() => Some(b),
            _ => Some(t),
        })
}

/// Coarse (time s, voltage µV) series of one trace under a candidate calibration
pub fn coarse_series(trace: &RawTrace, candidate: &CalibrationCandidate, gain: f64) -> (Vec<f64>, Vec<f64>) {
    let mut points: Vec<(f64, f64)> = trace
        .x_pixels
        .iter()
        .zip(trace.y_pixels.iter())
        .map(|(&x, &y)| (x, y))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let x0 = points.first().map_or(0.0, |p| p.0);
    let px_per_s = candidate.px_per_mm * candidate.paper_speed;
    let px_per_mv = candidate.px_per_mm * gain;
    points
        .into_iter()
        .map(|(x, y)| ((x - x0) / px_per_s, (trace.baseline_y - y) * 1000.0 / px_per_mv))
        .unzip()
}

/// Score one candidate on the reference trace
pub fn score_candidate(
    candidate: &CalibrationCandidate,
    reference: Option<&RawTrace>,
    gain: f64,
    visual_heart_rate: Option<f64>,
) -> ScoredCandidate {
    let implied_heart_rate = reference.and_then(|trace| {
        let (times, values) = coarse_series(trace, candidate, gain);
        simple_heart_rate(&times, &values)
    });
    ScoredCandidate {
        candidate: *candidate,
        implied_heart_rate,
        score: score_heart_rate(implied_heart_rate, visual_heart_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationMethod;

    #[test]
    fn test_parse_visual_heart_rate() {
        assert_eq!(parse_visual_heart_rate("approximately 70-80 bpm"), Some(75.0));
        assert_eq!(parse_visual_heart_rate("60 to 100"), Some(80.0));
        assert_eq!(parse_visual_heart_rate("~72 bpm"), Some(72.0));
        assert_eq!(parse_visual_heart_rate("rate 88, regular, 12 leads"), Some(88.0));
        assert_eq!(parse_visual_heart_rate("irregular"), None);
    }

    #[test]
    fn test_score_heart_rate_ranges() {
        assert_eq!(score_heart_rate(Some(75.0), None), 60.0);
        assert_eq!(score_heart_rate(Some(150.0), None), 50.0);
        assert_eq!(score_heart_rate(Some(250.0), None), 25.0);
        assert_eq!(score_heart_rate(Some(350.0), None), 5.0);
        assert_eq!(score_heart_rate(Some(9000.0), None), -50.0);
        assert_eq!(score_heart_rate(None, None), -50.0);
        assert!(score_heart_rate(Some(75.0), None) > score_heart_rate(Some(9000.0), None));
    }

    #[test]
    fn test_score_visual_agreement() {
        assert_eq!(score_heart_rate(Some(75.0), Some(75.0)), 100.0);
        assert_eq!(score_heart_rate(Some(150.0), Some(130.0)), 75.0);
        assert_eq!(score_heart_rate(Some(150.0), Some(70.0)), 30.0);
        // 40 % off: neither bonus nor penalty
        assert_eq!(score_heart_rate(Some(140.0), Some(100.0)), 50.0);
    }

    #[test]
    fn test_pick_peaks_by_time_spacing() {
        let times = [0.0, 0.05, 0.1, 0.15, 0.2, 0.25, 0.3, 0.35];
        let values = [0.0, 5.0, 0.0, 6.0, 0.0, 0.0, 7.0, 0.0];
        assert_eq!(pick_peaks_by_time(&times, &values, 1.0, 0.2), vec![1, 6]);
    }

    #[test]
    fn test_coarse_series_converts_units() {
        let trace = RawTrace::new(Lead::II, vec![100.0, 150.0], vec![90.0, 100.0], 100.0);
        let candidate = CalibrationCandidate {
            px_per_mm: 10.0,
            paper_speed: 25.0,
            method: CalibrationMethod::AiDirect,
        };
        let (t, v) = coarse_series(&trace, &candidate, 10.0);
        assert_eq!(t, vec![0.0, 0.2]);
        assert_eq!(v, vec![100.0, 0.0]);
    }
}
