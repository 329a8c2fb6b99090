//! Statistics and numeric primitives shared across the pipeline
//!
//! Every function returns a defined value for degenerate input (empty slices, zero
//! variance, zero denominators) instead of NaN, so nothing downstream has to guard
//! against NaN propagation.

use std::cmp::Ordering;
use std::ops::Range;

/// Scale factor converting MAD to σ for Gaussian distributions
pub const MAD_SCALE: f64 = 1.4826;

/// Arithmetic mean (0.0 for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Median (0.0 for an empty slice)
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let v = sorted(values);
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        0.5 * (v[mid - 1] + v[mid])
    } else {
        v[mid]
    }
}

/// Median absolute deviation around the median
pub fn mad(values: &[f64]) -> f64 {
    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    median(&deviations)
}

/// Percentile with linear interpolation between order statistics
///
/// `p` is in percent and clamped to [0, 100].
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let v = sorted(values);
    percentile_of_sorted(&v, p)
}

fn percentile_of_sorted(v: &[f64], p: f64) -> f64 {
    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (v.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    v[lo] + (v[hi] - v[lo]) * frac
}

/// First and third quartiles
pub fn quartiles(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let v = sorted(values);
    (percentile_of_sorted(&v, 25.0), percentile_of_sorted(&v, 75.0))
}

/// Pearson correlation coefficient (0.0 when either side has zero variance)
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let ma = mean(a);
    let mb = mean(b);
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        cov += (x - ma) * (y - mb);
        va += (x - ma) * (x - ma);
        vb += (y - mb) * (y - mb);
    }
    let denom = (va * vb).sqrt();
    if denom < f64::EPSILON {
        0.0
    } else {
        cov / denom
    }
}

/// Ordinary least-squares line fit
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Fit `y = slope * x + intercept`
///
/// Degenerate input (fewer than two points, constant x) yields a flat line through the mean.
pub fn linear_regression(x: &[f64], y: &[f64]) -> LinearFit {
    let n = x.len().min(y.len());
    if n < 2 {
        return LinearFit {
            slope: 0.0,
            intercept: mean(&y[..n]),
            r_squared: 0.0,
        };
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = mean(x);
    let my = mean(y);
    let sxx: f64 = x.iter().map(|v| (v - mx) * (v - mx)).sum();
    if sxx < f64::EPSILON {
        return LinearFit {
            slope: 0.0,
            intercept: my,
            r_squared: 0.0,
        };
    }
    let sxy: f64 = x.iter().zip(y.iter()).map(|(a, b)| (a - mx) * (b - my)).sum();
    let slope = sxy / sxx;
    let r = correlation(x, y);
    LinearFit {
        slope,
        intercept: my - slope * mx,
        r_squared: r * r,
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Index of the largest value in `range` (first occurrence wins ties)
pub fn argmax_in(values: &[f64], range: Range<usize>) -> Option<usize> {
    let end = range.end.min(values.len());
    let start = range.start.min(end);
    values[start..end]
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, bv)) if cmp_f64(v, bv) != Ordering::Greater => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| start + i)
}

/// Index of the smallest value in `range` (first occurrence wins ties)
pub fn argmin_in(values: &[f64], range: Range<usize>) -> Option<usize> {
    let end = range.end.min(values.len());
    let start = range.start.min(end);
    values[start..end]
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, bv)) if cmp_f64(v, bv) != Ordering::Less => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| start + i)
}

/// Local maxima above `threshold` separated by at least `min_distance` samples
///
/// Candidates are accepted tallest first, so within any `min_distance` window the highest
/// peak survives. Returned indices are ascending.
pub fn find_peaks(values: &[f64], threshold: f64, min_distance: usize) -> Vec<usize> {
    let n = values.len();
    if n < 3 {
        return Vec::new();
    }

    let mut candidates: Vec<usize> = (1..n - 1)
        .filter(|&i| values[i] > threshold && values[i] > values[i - 1] && values[i] >= values[i + 1])
        .collect();

    // Tallest first; index breaks ties so the order is total
    candidates.sort_by(|&a, &b| cmp_f64(values[b], values[a]).then(a.cmp(&b)));

    let mut accepted: Vec<usize> = Vec::new();
    for c in candidates {
        if accepted.iter().all(|&p| p.abs_diff(c) >= min_distance) {
            accepted.push(c);
        }
    }
    accepted.sort_unstable();
    accepted
}

/// Mean heart rate in bpm from peak times in seconds
///
/// Returns `None` with fewer than two peaks or a non-positive mean interval.
pub fn heart_rate_from_times(peak_times: &[f64]) -> Option<f64> {
    if peak_times.len() < 2 {
        return None;
    }
    let intervals: Vec<f64> = peak_times.windows(2).map(|w| w[1] - w[0]).collect();
    let mean_rr = mean(&intervals);
    if mean_rr > 0.0 {
        Some(60.0 / mean_rr)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_mad_ignores_single_outlier() {
        let v = [1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 1000.0];
        assert_eq!(mad(&v), 1.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&v, 50.0), 20.0);
        assert!((percentile(&v, 85.0) - 34.0).abs() < 1e-9);
        assert_eq!(percentile(&v, 150.0), 40.0);
        assert_eq!(quartiles(&v), (10.0, 30.0));
    }

    #[test]
    fn test_correlation_degenerate_is_zero() {
        assert_eq!(correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
        assert!((correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_regression() {
        let fit = linear_regression(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 5.0, 7.0]);
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);

        let flat = linear_regression(&[2.0, 2.0], &[1.0, 3.0]);
        assert_eq!(flat.slope, 0.0);
        assert_eq!(flat.intercept, 2.0);
    }

    #[test]
    fn test_find_peaks_keeps_tallest_within_distance() {
        let v = [0.0, 5.0, 0.0, 8.0, 0.0, 0.0, 0.0, 0.0, 6.0, 0.0];
        assert_eq!(find_peaks(&v, 1.0, 3), vec![3, 8]);
        assert_eq!(find_peaks(&v, 1.0, 1), vec![1, 3, 8]);
        assert_eq!(find_peaks(&v, 7.0, 1), vec![3]);
    }

    #[test]
    fn test_argmax_argmin_ranges() {
        let v = [1.0, 4.0, 2.0, 4.0, -1.0];
        assert_eq!(argmax_in(&v, 0..5), Some(1));
        assert_eq!(argmax_in(&v, 2..5), Some(3));
        assert_eq!(argmin_in(&v, 0..4), Some(0));
        assert_eq!(argmin_in(&v, 3..10), Some(4));
        assert_eq!(argmax_in(&v, 7..9), None);
    }

    #[test]
    fn test_heart_rate_from_times() {
        assert_eq!(heart_rate_from_times(&[0.0, 1.0, 2.0]), Some(60.0));
        assert_eq!(heart_rate_from_times(&[0.5]), None);
    }
}
