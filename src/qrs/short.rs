//! Peak picker for signals too short to learn adaptive thresholds from

use crate::stats;

/// Minimum spacing between picked peaks, milliseconds
pub const SHORT_MIN_SPACING_MS: f64 = 300.0;

/// IQR outlier factor
pub const IQR_FACTOR: f64 = 1.5;

/// Local maxima of `|x - median|` above `q3 + 1.5 · IQR`, at least 300 ms apart
pub fn short_signal_peaks(signal: &[f64], sample_rate: f64) -> Vec<usize> {
    if signal.len() < 3 {
        return Vec::new();
    }
    let med = stats::median(signal);
    let deviation: Vec<f64> = signal.iter().map(|x| (x - med).abs()).collect();
    let (q1, q3) = stats::quartiles(&deviation);
    let threshold = q3 + IQR_FACTOR * (q3 - q1);
    let spacing = ((SHORT_MIN_SPACING_MS * sample_rate / 1000.0).round() as usize).max(1);
    stats::find_peaks(&deviation, threshold, spacing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_signal_peaks() {
        let fs = 500.0;
        let mut signal = vec![0.0; 900];
        for &c in &[200usize, 600] {
            for k in 0..=10 {
                signal[c - 5 + k] = 1000.0 * (1.0 - (k as f64 - 5.0).abs() / 5.0);
            }
        }
        assert_eq!(short_signal_peaks(&signal, fs), vec![200, 600]);
    }

    #[test]
    fn test_flat_signal_has_no_peaks() {
        assert!(short_signal_peaks(&[5.0; 400], 500.0).is_empty());
    }
}
