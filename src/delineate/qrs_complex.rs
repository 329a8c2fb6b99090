//! QRS complex delineation around a refined R peak

use super::wavelet::{modulus_maximum, walk_to_boundary};
use super::{plausibility, LeadContext};
use crate::fiducial::types::{FiducialPoint, QrsAnnotation, QrsMorphology};
use crate::stats;

/// Q is searched this far before R, S this far after, ms
pub const Q_S_SEARCH_MS: f64 = 60.0;

/// Steepest-slope search reach on either side of R, ms
pub const SLOPE_SEARCH_MS: f64 = 100.0;

/// Onset/offset may not lie further than this from R, ms
pub const BOUNDARY_LIMIT_MS: f64 = 150.0;

/// QRS duration above which the complex is wide
pub const WIDE_QRS_MS: f64 = 120.0;

/// Q and S must dip below the baseline by this fraction of R
pub const MIN_DEFLECTION_FRACTION: f64 = 0.05;

/// R′ must rise above the baseline by this fraction of R
pub const R_PRIME_FRACTION: f64 = 0.2;

/// A later lobe at least this fraction of the steepest QRS slope still belongs to the complex
pub const TRAILING_LOBE_FRACTION: f64 = 0.3;

fn is_local_min(signal: &[f64], i: usize) -> bool {
    i > 0 && i + 1 < signal.len() && signal[i] <= signal[i - 1] && signal[i] <= signal[i + 1]
}

fn is_local_max(signal: &[f64], i: usize) -> bool {
    i > 0 && i + 1 < signal.len() && signal[i] >= signal[i - 1] && signal[i] >= signal[i + 1]
}

/// Delineate the QRS complex whose main deflection is at `r`
///
/// A negative main deflection is reported as a QS complex with no Q or S.
pub fn delineate_qrs(ctx: &LeadContext, r: usize) -> QrsAnnotation {
    let signal = ctx.signal;
    let n = signal.len();
    let w = &ctx.w_qrs;
    let r = r.min(n.saturating_sub(1));

    let r_amp = ctx.deviation(r);
    let positive = r_amp > 0.0;
    let min_deflection = MIN_DEFLECTION_FRACTION * r_amp.abs();
    let search = ctx.samples(Q_S_SEARCH_MS);

    let dips_below = |i: &usize| ctx.deviation(*i) < -min_deflection && is_local_min(signal, *i);
    let (q, s) = if positive {
        (
            stats::argmin_in(signal, r.saturating_sub(search)..r).filter(dips_below),
            stats::argmin_in(signal, r + 1..r + search + 1).filter(dips_below),
        )
    } else {
        (None, None)
    };

    // Onset: walk left from the steepest slope leading into the complex
    let first = q.unwrap_or(r);
    let left_limit = r.saturating_sub(ctx.samples(BOUNDARY_LIMIT_MS));
    let left_search = r.saturating_sub(ctx.samples(SLOPE_SEARCH_MS));
    let onset = modulus_maximum(w, left_search..first)
        .map(|m| walk_to_boundary(w, m, left_limit))
        .unwrap_or(left_search);

    // Offset: walk right from the steepest slope leaving the complex, then absorb any
    // trailing lobe (R′) steep enough to belong to it
    let last = s.unwrap_or(r);
    let right_limit = (r + ctx.samples(BOUNDARY_LIMIT_MS)).min(n.saturating_sub(1));
    let right_search_end = (r + ctx.samples(SLOPE_SEARCH_MS) + 1).min(n);
    let mut j_point = modulus_maximum(w, last + 1..right_search_end)
        .map(|m| walk_to_boundary(w, m, right_limit))
        .unwrap_or_else(|| (r + search).min(n.saturating_sub(1)));

    let steepest = modulus_maximum(w, onset..j_point + 1).map_or(0.0, |m| w[m].abs());
    while let Some(next) = modulus_maximum(w, j_point + 1..right_limit + 1) {
        if steepest <= 0.0 || w[next].abs() < TRAILING_LOBE_FRACTION * steepest {
            break;
        }
        j_point = walk_to_boundary(w, next, right_limit).max(j_point + 1);
    }

    let r_prime = s.and_then(|s| {
        stats::argmax_in(signal, s + 1..j_point + 1)
            .filter(|&i| ctx.deviation(i) > R_PRIME_FRACTION * r_amp && is_local_max(signal, i))
    });
    let s_prime = r_prime.and_then(|rp| stats::argmin_in(signal, rp + 1..j_point + 1).filter(dips_below));

    let duration_ms = ctx.ms_between(onset, j_point);
    let morphology = if !positive {
        QrsMorphology::Qs
    } else if r_prime.is_some() {
        QrsMorphology::RsRPrime
    } else if duration_ms > WIDE_QRS_MS {
        QrsMorphology::Wide
    } else {
        QrsMorphology::Normal
    };

    let amplitude_factor = match r_amp.abs() {
        a if a >= 100.0 => 1.0,
        a if a >= 30.0 => 0.7,
        _ => 0.4,
    };
    let confidence =
        (plausibility(duration_ms, (60.0, 120.0), (40.0, 200.0)) * amplitude_factor).clamp(0.0, 1.0);

    let point = |i: usize| FiducialPoint::at(signal, i, ctx.sample_rate, confidence);
    QrsAnnotation {
        onset: point(onset),
        q: q.map(point),
        r: point(r),
        r_prime: r_prime.map(point),
        s: s.map(point),
        s_prime: s_prime.map(point),
        j_point: point(j_point),
        duration_ms,
        amplitude: r_amp,
        morphology,
        confidence,
    }
}
