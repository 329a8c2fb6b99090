///! Wavelet transform surrogate and wave localization
///!
///! `W_s[n]` is the mean of the `s` samples after `n` minus the mean of the `s` samples
///! before it: a difference of moving averages spanning `2s`, which behaves like the
///! quadratic-spline wavelet at scale `s`. It is a smoothed first derivative, so a wave's
///! peak is a zero crossing of `W_s` and its steepest flanks are the modulus maxima on
///! either side.

use std::ops::Range;

/// Scales at the 500 Hz reference rate
pub const P_SCALE: usize = 4;
pub const QRS_SCALE: usize = 2;
pub const T_SCALE: usize = 8;

/// Sample rate the base scales are tuned for
pub const REFERENCE_RATE: f64 = 500.0;

/// Onset/offset boundary as a fraction of the modulus maximum
pub const BOUNDARY_FRACTION: f64 = 0.1;

/// Neighbouring lobes at least this fraction of a wave's steepest lobe belong to the wave
pub const ADJACENT_LOBE_FRACTION: f64 = 0.5;

/// Scale for a base scale at `sample_rate` (linear in the rate, at least 1)
pub fn scale_for(base: usize, sample_rate: f64) -> usize {
    ((base as f64 * sample_rate / REFERENCE_RATE).round() as usize).max(1)
}

/// `W_s[n]`, with indices beyond the edges clamped
pub fn wavelet_transform(signal: &[f64], scale: usize) -> Vec<f64> {
    let n = signal.len();
    if n == 0 || scale == 0 {
        return vec![0.0; n];
    }
    let last = n as isize - 1;
    let at = |i: isize| signal[i.clamp(0, last) as usize];
    let s = scale as isize;
    (0..n as isize)
        .map(|i| {
            let ahead: f64 = (1..=s).map(|k| at(i + k)).sum();
            let behind: f64 = (1..=s).map(|k| at(i - k)).sum();
            (ahead - behind) / s as f64
        })
        .collect()
}

/// A wave located in one search window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveFit {
    /// Zero crossing of the transform
    pub peak: usize,
    /// Modulus maximum before the peak
    pub left_max: usize,
    /// Modulus maximum after the peak
    pub right_max: usize,
    pub onset: usize,
    pub offset: usize,
    /// `|W[left_max]| + |W[right_max]|`
    pub strength: f64,
}

/// Sign changes of `w` within `range`, at whichever neighbour is closer to zero
pub fn zero_crossings(w: &[f64], range: Range<usize>) -> Vec<usize> {
    let end = range.end.min(w.len());
    let start = range.start.min(end);
    if end < start + 2 {
        return Vec::new();
    }
    (start..end - 1)
        .filter(|&i| (w[i] > 0.0 && w[i + 1] <= 0.0) || (w[i] < 0.0 && w[i + 1] >= 0.0))
        .map(|i| if w[i + 1].abs() < w[i].abs() { i + 1 } else { i })
        .fold(Vec::new(), |mut acc: Vec<usize>, z| {
            if acc.last() != Some(&z) {
                acc.push(z);
            }
            acc
        })
}

/// Index of the largest `|w|` in `range` (first occurrence wins ties)
pub fn modulus_maximum(w: &[f64], range: Range<usize>) -> Option<usize> {
    let end = range.end.min(w.len());
    let start = range.start.min(end);
    (start..end).fold(None, |best: Option<usize>, i| match best {
        Some(b) if w[b].abs() >= w[i].abs() => Some(b),
        _ => Some(i),
    })
}

/// Walk from `from` towards `limit` until `|w|` drops below the boundary fraction of `|w[from]|`
pub fn walk_to_boundary(w: &[f64], from: usize, limit: usize) -> usize {
    let level = BOUNDARY_FRACTION * w[from].abs();
    let mut i = from;
    if limit < from {
        while i > limit && w[i].abs() >= level {
            i -= 1;
        }
    } else {
        while i < limit && w[i].abs() >= level {
            i += 1;
        }
    }
    i
}

/// Locate the dominant wave in `range`
///
/// Every zero crossing is scored by the modulus maxima between it and its neighbouring
/// crossings; the crossing with the largest combined magnitude is the peak. Returns `None`
/// when the window holds no crossing with lobes on both sides.
pub fn locate_wave(w: &[f64], range: Range<usize>) -> Option<WaveFit> {
    let end = range.end.min(w.len());
    let start = range.start.min(end);
    let crossings = zero_crossings(w, start..end);

    let mut best: Option<WaveFit> = None;
    for (k, &z) in crossings.iter().enumerate() {
        let lo = if k == 0 { start } else { crossings[k - 1] };
        let hi = crossings.get(k + 1).copied().unwrap_or(end);
        let (Some(left_max), Some(right_max)) = (modulus_maximum(w, lo..z), modulus_maximum(w, z + 1..hi)) else {
            continue;
        };
        let strength = w[left_max].abs() + w[right_max].abs();
        if best.is_some_and(|b| b.strength >= strength) {
            continue;
        }
        best = Some(WaveFit {
            peak: z,
            left_max,
            right_max,
            onset: walk_to_boundary(w, left_max, start),
            offset: walk_to_boundary(w, right_max, end.saturating_sub(1)),
            strength,
        });
    }
    best
}

/// Longest run of consecutive samples in `range` with `|w|` below `level`
fn longest_quiet_run(w: &[f64], range: Range<usize>, level: f64) -> usize {
    w[range.start.min(range.end)..range.end.min(w.len())]
        .iter()
        .fold((0, 0), |(longest, run), v| {
            let run = if v.abs() < level { run + 1 } else { 0 };
            (longest.max(run), run)
        })
        .0
}

/// Widen a fit over neighbouring lobes at least `fraction` of its own steepest lobe
///
/// Notched and biphasic waves have several crossings; the strongest one marks the peak but
/// the wave spans all of them. A lobe separated from the wave by `max_quiet` or more flat
/// samples belongs to a different wave.
pub fn extend_over_adjacent_lobes(
    w: &[f64],
    fit: WaveFit,
    range: Range<usize>,
    fraction: f64,
    max_quiet: usize,
) -> WaveFit {
    let end = range.end.min(w.len());
    let start = range.start.min(end);
    let last = end.saturating_sub(1);
    let reference = fraction * w[fit.left_max].abs().max(w[fit.right_max].abs());
    let quiet = BOUNDARY_FRACTION * reference;

    let mut onset = fit.onset;
    while onset > start {
        match modulus_maximum(w, start..onset) {
            Some(m) if w[m].abs() >= reference && longest_quiet_run(w, m..onset, quiet) < max_quiet => {
                onset = walk_to_boundary(w, m, start).min(onset - 1);
            }
            _ => break,
        }
    }
    let mut offset = fit.offset;
    while offset < last {
        match modulus_maximum(w, offset + 1..end) {
            Some(m) if w[m].abs() >= reference && longest_quiet_run(w, offset + 1..m, quiet) < max_quiet => {
                offset = walk_to_boundary(w, m, last).max(offset + 1);
            }
            _ => break,
        }
    }
    WaveFit { onset, offset, ..fit }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump(n: usize, center: usize, width: f64, amp: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amp * (-((i as f64 - center as f64) / width).powi(2)).exp())
            .collect()
    }

    #[test]
    fn test_scale_for_rate() {
        assert_eq!(scale_for(P_SCALE, 500.0), 4);
        assert_eq!(scale_for(T_SCALE, 250.0), 4);
        assert_eq!(scale_for(QRS_SCALE, 1000.0), 4);
        assert_eq!(scale_for(QRS_SCALE, 100.0), 1);
    }

    #[test]
    fn test_transform_of_ramp() {
        let ramp: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let w = wavelet_transform(&ramp, 2);
        // (mean of i+1, i+2) - (mean of i-1, i-2) = 3
        assert_eq!(w[10], 3.0);
    }

    #[test]
    fn test_locate_positive_bump() {
        let signal = bump(400, 200, 20.0, 100.0);
        let w = wavelet_transform(&signal, 8);
        let fit = locate_wave(&w, 100..300).unwrap();
        assert!(fit.peak.abs_diff(200) <= 1, "peak at {}", fit.peak);
        assert!(fit.onset < fit.left_max && fit.left_max < fit.peak);
        assert!(fit.peak < fit.right_max && fit.right_max < fit.offset);
        assert!(w[fit.left_max] > 0.0 && w[fit.right_max] < 0.0);
    }

    #[test]
    fn test_locate_prefers_larger_wave() {
        let small = bump(600, 150, 15.0, 30.0);
        let large = bump(600, 400, 15.0, 200.0);
        let signal: Vec<f64> = small.iter().zip(large.iter()).map(|(a, b)| a + b).collect();
        let w = wavelet_transform(&signal, 4);
        let fit = locate_wave(&w, 50..550).unwrap();
        assert!(fit.peak.abs_diff(400) <= 1);
    }

    #[test]
    fn test_extend_covers_notched_wave() {
        let first = bump(1000, 385, 9.0, 140.0);
        let second = bump(1000, 410, 9.0, 150.0);
        let signal: Vec<f64> = first.iter().zip(second.iter()).map(|(a, b)| a + b).collect();
        let w = wavelet_transform(&signal, 4);
        let fit = locate_wave(&w, 300..440).unwrap();
        assert!(fit.peak.abs_diff(410) <= 1);
        assert!(fit.onset > 385);

        let wide = extend_over_adjacent_lobes(&w, fit, 300..440, ADJACENT_LOBE_FRACTION, 8);
        assert!(wide.onset < 375, "onset {}", wide.onset);
        assert_eq!(wide.peak, fit.peak);
    }

    #[test]
    fn test_extend_stops_at_separate_wave() {
        // T wave at 350 followed by an unrelated P wave at 520 after a flat stretch
        let t = bump(700, 350, 25.0, 300.0);
        let p = bump(700, 520, 12.0, 150.0);
        let signal: Vec<f64> = t.iter().zip(p.iter()).map(|(a, b)| a + b).collect();
        let w = wavelet_transform(&signal, 8);
        let fit = locate_wave(&w, 247..522).unwrap();
        assert_eq!(fit.peak, 350);

        let extended = extend_over_adjacent_lobes(&w, fit, 247..522, ADJACENT_LOBE_FRACTION, 8);
        assert_eq!(extended.offset, fit.offset);
        assert!(extended.offset < 420);
    }

    #[test]
    fn test_flat_window_has_no_wave() {
        let w = wavelet_transform(&[0.0; 100], 4);
        assert!(locate_wave(&w, 10..90).is_none());
    }
}
