///! Pan-Tompkins feature signals
///!
///! bandpass -> five-point derivative -> squaring -> moving-window integration.
///! Every stage is zero-phase or centered, so a QRS complex in the raw signal and its
///! integrated energy bump line up without a group-delay correction.

use crate::filter::{bandpass, moving_average};

/// Intermediate signals of the detector front end
#[derive(Debug, Clone, PartialEq)]
pub struct QrsFeatures {
    pub sample_rate: f64,
    /// Zero-phase bandpassed input
    pub filtered: Vec<f64>,
    /// Five-point derivative of `filtered`
    pub derivative: Vec<f64>,
    /// Moving-window integral of the squared derivative
    pub integrated: Vec<f64>,
    /// Samples on each side searched for the filtered peak backing an integrated peak
    pub half_window: usize,
}

/// Centered five-point derivative `(−x[n−2] − 2x[n−1] + 2x[n+1] + x[n+2]) · fs / 8`
///
/// Indices beyond the edges are clamped.
pub fn five_point_derivative(signal: &[f64], sample_rate: f64) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let at = |i: isize| signal[i.clamp(0, n as isize - 1) as usize];
    (0..n as isize)
        .map(|i| (-at(i - 2) - 2.0 * at(i - 1) + 2.0 * at(i + 1) + at(i + 2)) * sample_rate / 8.0)
        .collect()
}

/// Samples spanned by `ms` milliseconds (at least one)
pub fn ms_to_samples(ms: f64, sample_rate: f64) -> usize {
    ((ms * sample_rate / 1000.0).round() as usize).max(1)
}

/// Run the detector front end
///
/// # Arguments
/// * `signal` - Raw lead in µV
/// * `sample_rate` - Hz
/// * `low_pass_hz` - Upper edge of the passband
/// * `high_pass_hz` - Lower edge of the passband
/// * `integration_window_ms` - Width of the moving-window integrator
pub fn extract(
    signal: &[f64],
    sample_rate: f64,
    low_pass_hz: f64,
    high_pass_hz: f64,
    integration_window_ms: f64,
) -> QrsFeatures {
    let filtered = bandpass(signal, sample_rate, high_pass_hz, low_pass_hz);
    let derivative = five_point_derivative(&filtered, sample_rate);
    let squared: Vec<f64> = derivative.iter().map(|d| d * d).collect();
    let window = ms_to_samples(integration_window_ms, sample_rate);
    let integrated = moving_average(&squared, window);

    QrsFeatures {
        sample_rate,
        filtered,
        derivative,
        integrated,
        half_window: window / 2,
    }
}

impl QrsFeatures {
    pub fn len(&self) -> usize {
        self.integrated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.integrated.is_empty()
    }

    /// Local maxima of the integrated signal, ascending
    pub fn integrated_peaks(&self) -> Vec<usize> {
        let x = &self.integrated;
        if x.len() < 3 {
            return Vec::new();
        }
        (1..x.len() - 1)
            .filter(|&i| x[i] > x[i - 1] && x[i] >= x[i + 1])
            .collect()
    }

    /// Largest |filtered| and |derivative| within the half window around `index`
    pub fn local_maxima_around(&self, index: usize) -> (f64, f64) {
        let lo = index.saturating_sub(self.half_window);
        let hi = (index + self.half_window + 1).min(self.len());
        let peak = |v: &[f64]| v[lo..hi].iter().fold(0.0_f64, |m, x| m.max(x.abs()));
        (peak(&self.filtered), peak(&self.derivative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivative_of_ramp_is_constant() {
        let fs = 500.0;
        let ramp: Vec<f64> = (0..50).map(|i| 2.0 * i as f64).collect();
        let d = five_point_derivative(&ramp, fs);
        // slope 2 per sample = 1000 per second
        for v in &d[2..48] {
            assert!((v - 1000.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ms_to_samples() {
        assert_eq!(ms_to_samples(150.0, 500.0), 75);
        assert_eq!(ms_to_samples(200.0, 250.0), 50);
        assert_eq!(ms_to_samples(0.1, 100.0), 1);
    }

    #[test]
    fn test_integrated_energy_peaks_at_spike() {
        let fs = 500.0;
        let mut signal = vec![0.0; 1500];
        for k in 0..=20 {
            signal[740 + k] = 1000.0 * (1.0 - (k as f64 - 10.0).abs() / 10.0);
        }
        let features = extract(&signal, fs, 15.0, 5.0, 150.0);
        assert_eq!(features.len(), 1500);
        let peak = features
            .integrated
            .iter()
            .enumerate()
            .fold((0, 0.0), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
            .0;
        assert!(peak.abs_diff(750) <= 15, "integrated peak at {peak}");
    }
}
