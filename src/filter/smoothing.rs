//! FIR smoothing: moving average, moving median, Savitzky-Golay
//!
//! All windows are centered so smoothing never shifts a landmark in time. Windows shrink
//! symmetrically near the edges instead of padding.

use crate::stats;

/// Running prefix sums for O(1) window means
pub(crate) struct PrefixSum {
    sums: Vec<f64>,
}

impl PrefixSum {
    pub(crate) fn new(signal: &[f64]) -> Self {
        let mut sums = Vec::with_capacity(signal.len() + 1);
        sums.push(0.0);
        let mut acc = 0.0;
        for &x in signal {
            acc += x;
            sums.push(acc);
        }
        Self { sums }
    }

    /// Mean of `signal[start..end]`, clamped to the signal bounds
    pub(crate) fn mean(&self, start: isize, end: isize) -> f64 {
        let len = (self.sums.len() - 1) as isize;
        let s = start.clamp(0, len) as usize;
        let e = end.clamp(0, len) as usize;
        if e <= s {
            return 0.0;
        }
        (self.sums[e] - self.sums[s]) / (e - s) as f64
    }
}

/// Centered moving average of width `window` (rounded up to odd)
pub fn moving_average(signal: &[f64], window: usize) -> Vec<f64> {
    let half = (window / 2) as isize;
    if half == 0 {
        return signal.to_vec();
    }
    let prefix = PrefixSum::new(signal);
    let n = signal.len() as isize;
    (0..n)
        .map(|i| {
            let h = half.min(i).min(n - 1 - i);
            prefix.mean(i - h, i + h + 1)
        })
        .collect()
}

/// Centered moving median of width `window` (rounded up to odd)
pub fn moving_median(signal: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    if half == 0 {
        return signal.to_vec();
    }
    let n = signal.len();
    (0..n)
        .map(|i| {
            let h = half.min(i).min(n - 1 - i);
            stats::median(&signal[i - h..=i + h])
        })
        .collect()
}

/// Quadratic Savitzky-Golay smoothing weights for a `2m+1` point window
///
/// Closed form for polynomial order 2 (identical for order 3):
/// `c_i = (3(3m² + 3m − 1) − 15i²) / ((2m + 1)(4m² + 4m − 3))`
pub fn savitzky_golay_weights(half_window: usize) -> Vec<f64> {
    let m = half_window as f64;
    let norm = (2.0 * m + 1.0) * (4.0 * m * m + 4.0 * m - 3.0);
    (-(half_window as isize)..=half_window as isize)
        .map(|i| {
            let i = i as f64;
            (3.0 * (3.0 * m * m + 3.0 * m - 1.0) - 15.0 * i * i) / norm
        })
        .collect()
}

/// Quadratic Savitzky-Golay smoothing over a `2 * half_window + 1` window
///
/// Preserves peak heights and widths far better than a moving average of the same length.
/// Samples closer than `half_window` to either edge are passed through.
pub fn savitzky_golay(signal: &[f64], half_window: usize) -> Vec<f64> {
    let n = signal.len();
    if half_window == 0 || n < 2 * half_window + 1 {
        return signal.to_vec();
    }
    let weights = savitzky_golay_weights(half_window);
    let mut out = signal.to_vec();
    for i in half_window..n - half_window {
        out[i] = signal[i - half_window..=i + half_window]
            .iter()
            .zip(weights.iter())
            .map(|(x, w)| x * w)
            .sum();
    }
    out
}

/// Subtract the signal median
///
/// The median ignores QRS excursions that would bias a mean-based offset. Applying this
/// twice changes nothing beyond rounding.
pub fn remove_dc_offset(signal: &[f64]) -> Vec<f64> {
    let offset = stats::median(signal);
    signal.iter().map(|x| x - offset).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_savitzky_golay_7_point_weights() {
        let w = savitzky_golay_weights(3);
        let expected = [-2.0, 3.0, 6.0, 7.0, 6.0, 3.0, -2.0].map(|v| v / 21.0);
        for (a, b) in w.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_savitzky_golay_preserves_quadratic() {
        let signal: Vec<f64> = (0..20).map(|i| (i as f64 - 10.0).powi(2)).collect();
        let out = savitzky_golay(&signal, 3);
        for (a, b) in out.iter().zip(signal.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_moving_average_shrinks_at_edges() {
        let out = moving_average(&[0.0, 3.0, 6.0, 9.0, 12.0], 3);
        assert_eq!(out, vec![0.0, 3.0, 6.0, 9.0, 12.0]);
        let spike = moving_average(&[0.0, 0.0, 9.0, 0.0, 0.0], 3);
        assert_eq!(spike, vec![0.0, 3.0, 3.0, 3.0, 0.0]);
    }

    #[test]
    fn test_moving_median_removes_spike() {
        let out = moving_median(&[1.0, 1.0, 50.0, 1.0, 1.0], 3);
        assert_eq!(out, vec![1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_remove_dc_offset_is_idempotent() {
        let signal = vec![100.0, 102.0, 98.0, 1500.0, 101.0, 99.0];
        let once = remove_dc_offset(&signal);
        let twice = remove_dc_offset(&once);
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() <= f64::EPSILON * 1500.0);
        }
    }
}
