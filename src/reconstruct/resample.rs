//! Resampling of irregular pixel-derived series onto a uniform grid
//!
//! Pixel columns map to irregular instants (masked points, rhythm-strip joins, digitizer
//! jitter), so neither interpolator assumes uniform input spacing.

use core::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Lobes of the Lanczos window
pub const LANCZOS_LOBES: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Piecewise linear between neighbouring points
    #[default]
    Linear,
    /// Lanczos-windowed sinc over the surrounding points, weights normalized
    WindowedSinc,
}

/// Sort by time and merge points sharing one instant into their mean
fn prepare(times: &[f64], values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut points: Vec<(f64, f64)> = times
        .iter()
        .zip(values.iter())
        .filter(|(t, v)| t.is_finite() && v.is_finite())
        .map(|(&t, &v)| (t, v))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut ts: Vec<f64> = Vec::with_capacity(points.len());
    let mut vs: Vec<f64> = Vec::with_capacity(points.len());
    let mut run = 0usize;
    for (t, v) in points {
        if ts.last() == Some(&t) {
            run += 1;
            if let Some(last) = vs.last_mut() {
                *last += (v - *last) / run as f64;
            }
        } else {
            run = 1;
            ts.push(t);
            vs.push(v);
        }
    }
    (ts, vs)
}

/// Number of uniform samples covering `[0, t_last]`
pub fn output_len(t_last: f64, sample_rate: f64) -> usize {
    if t_last < 0.0 {
        return 0;
    }
    (t_last * sample_rate).floor() as usize + 1
}

/// Linear interpolation at `t`, clamped to the end values; `hint` tracks the segment
fn linear_at(times: &[f64], values: &[f64], t: f64, hint: &mut usize) -> f64 {
    let n = times.len();
    if t <= times[0] {
        return values[0];
    }
    if t >= times[n - 1] {
        return values[n - 1];
    }
    while *hint + 1 < n && times[*hint + 1] < t {
        *hint += 1;
    }
    let (t0, t1) = (times[*hint], times[*hint + 1]);
    let (v0, v1) = (values[*hint], values[*hint + 1]);
    if t1 - t0 <= 0.0 {
        return v0;
    }
    v0 + (v1 - v0) * (t - t0) / (t1 - t0)
}

fn lanczos(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        return 1.0;
    }
    if x.abs() >= LANCZOS_LOBES {
        return 0.0;
    }
    let px = PI * x;
    LANCZOS_LOBES * libm::sin(px) * libm::sin(px / LANCZOS_LOBES) / (px * px)
}

/// Resample an irregular series to `sample_rate`, starting at t = 0
///
/// Output sample `k` is at `k / sample_rate`. Instants before the first point or after the
/// last take the nearest end value.
///
/// # Returns
/// `floor(t_last * sample_rate) + 1` samples, or none for empty input
pub fn resample(times: &[f64], values: &[f64], sample_rate: f64, method: Interpolation) -> Vec<f64> {
    let (ts, vs) = prepare(times, values);
    let Some(&t_last) = ts.last() else {
        return Vec::new();
    };
    if !(sample_rate > 0.0) {
        return Vec::new();
    }
    let n = output_len(t_last, sample_rate);

    match method {
        Interpolation::Linear => {
            let mut hint = 0;
            (0..n)
                .map(|k| linear_at(&ts, &vs, k as f64 / sample_rate, &mut hint))
                .collect()
        }
        Interpolation::WindowedSinc => {
            // Kernel width follows whichever spacing is coarser
            let mean_spacing = if ts.len() > 1 {
                (t_last - ts[0]) / (ts.len() - 1) as f64
            } else {
                0.0
            };
            let width = mean_spacing.max(1.0 / sample_rate);
            let reach = LANCZOS_LOBES * width;

            let mut hint = 0;
            let mut lo = 0;
            (0..n)
                .map(|k| {
                    let t = k as f64 / sample_rate;
                    while lo < ts.len() && ts[lo] < t - reach {
                        lo += 1;
                    }
                    let mut num = 0.0;
                    let mut den = 0.0;
                    for j in lo..ts.len() {
                        if ts[j] > t + reach {
                            break;
                        }
                        let w = lanczos((t - ts[j]) / width);
                        num += w * vs[j];
                        den += w;
                    }
                    let linear = linear_at(&ts, &vs, t, &mut hint);
                    if den.abs() > 1e-9 {
                        num / den
                    } else {
                        linear
                    }
                })
                .collect()
        }
    }
}
