//! Goertzel single-tone detection
//!
//! Used to decide whether a reconstructed lead carries mains interference (50 or 60 Hz)
//! worth notching out. Scanned paper rarely does, but photographed monitor screens can.

/// Mains frequencies checked, in Hz
pub const POWERLINE_FREQUENCIES: [f64; 2] = [50.0, 60.0];

/// Squared magnitude of the DFT of `signal` at `freq_hz`
///
/// Generalized Goertzel recurrence; `freq_hz` need not fall on a DFT bin.
pub fn goertzel_power(signal: &[f64], sample_rate: f64, freq_hz: f64) -> f64 {
    if signal.is_empty() || sample_rate <= 0.0 {
        return 0.0;
    }
    let omega = 2.0 * core::f64::consts::PI * freq_hz / sample_rate;
    let coeff = 2.0 * libm::cos(omega);

    let mut s1 = 0.0;
    let mut s2 = 0.0;
    for &x in signal {
        let s0 = x + coeff * s1 - s2;
        s2 = s1;
        s1 = s0;
    }
    (s1 * s1 + s2 * s2 - coeff * s1 * s2).max(0.0)
}

/// Fraction of the signal's energy carried by the tone at `freq_hz`
///
/// A pure sinusoid at `freq_hz` spanning the whole signal scores ≈ 1.0. Returns 0.0 for
/// a silent signal.
pub fn tone_fraction(signal: &[f64], sample_rate: f64, freq_hz: f64) -> f64 {
    let energy: f64 = signal.iter().map(|x| x * x).sum();
    if energy <= f64::EPSILON {
        return 0.0;
    }
    let n = signal.len() as f64;
    (2.0 * goertzel_power(signal, sample_rate, freq_hz) / (n * energy)).min(1.0)
}

/// Mains frequency dominating the signal, if any carries more than `min_fraction` of its energy
///
/// Frequencies at or above Nyquist are skipped. The stronger of 50/60 Hz wins.
pub fn detect_powerline(signal: &[f64], sample_rate: f64, min_fraction: f64) -> Option<f64> {
    POWERLINE_FREQUENCIES
        .iter()
        .filter(|&&f| 2.0 * f < sample_rate)
        .map(|&f| (f, tone_fraction(signal, sample_rate, f)))
        .filter(|&(_, fraction)| fraction > min_fraction)
        .fold(None, |best: Option<(f64, f64)>, (f, fraction)| match best {
            Some((_, bf)) if bf >= fraction => best,
            _ => Some((f, fraction)),
        })
        .map(|(f, _)| f)
}
