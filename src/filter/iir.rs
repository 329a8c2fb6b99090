//! IIR filtering with second-order biquad sections
//!
//! Thin layer over the `biquad` crate (RBJ cookbook designs, transposed direct form II).
//! Designs that violate the Nyquist bound are rejected by `biquad`; the filtering
//! functions then return the input unchanged and log a warning, since a missing filter
//! stage degrades quality but must not abort digitization.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, Type, Q_BUTTERWORTH_F64};
use tracing::warn;

/// One second-order section
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IirDesign {
    LowPass { cutoff_hz: f64 },
    HighPass { cutoff_hz: f64 },
    Notch { center_hz: f64, q: f64 },
}

impl IirDesign {
    /// Whether the section has unity gain at DC
    fn passes_dc(&self) -> bool {
        matches!(self, IirDesign::LowPass { .. } | IirDesign::Notch { .. })
    }

    fn coefficients(&self, sample_rate: f64) -> Option<Coefficients<f64>> {
        let (kind, f0, q) = match *self {
            IirDesign::LowPass { cutoff_hz } => (Type::LowPass, cutoff_hz, Q_BUTTERWORTH_F64),
            IirDesign::HighPass { cutoff_hz } => (Type::HighPass, cutoff_hz, Q_BUTTERWORTH_F64),
            IirDesign::Notch { center_hz, q } => (Type::Notch, center_hz, q),
        };

        if !(sample_rate > 0.0 && f0 > 0.0 && q > 0.0) {
            warn!(design = ?self, sample_rate, "rejected filter design with non-positive parameters");
            return None;
        }

        // biquad expects f0 relative to Nyquist, not to twice the sample rate
        let normalized_f0 = 2.0 * f0 / sample_rate;
        match Coefficients::<f64>::from_normalized_params(kind, normalized_f0, q) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(design = ?self, sample_rate, error = ?e, "filter design rejected, stage skipped");
                None
            }
        }
    }
}

/// Run one section forward over `signal`
///
/// The first sample is subtracted before filtering (and restored for sections that pass DC)
/// so a large DC offset does not ring through the filter's zero initial state.
fn run_section(signal: &[f64], coeffs: &Coefficients<f64>, passes_dc: bool) -> Vec<f64> {
    let Some(&x0) = signal.first() else {
        return Vec::new();
    };
    let mut section = DirectForm2Transposed::<f64>::new(coeffs.clone());
    let restore = if passes_dc { x0 } else { 0.0 };
    signal
        .iter()
        .map(|&x| section.run(x - x0) + restore)
        .collect()
}

/// Causal single-pass filtering
pub fn filter(signal: &[f64], sample_rate: f64, design: IirDesign) -> Vec<f64> {
    match design.coefficients(sample_rate) {
        Some(c) => run_section(signal, &c, design.passes_dc()),
        None => signal.to_vec(),
    }
}

/// Zero-phase filtering: forward pass, then a second pass over the reversed output
///
/// Squares the magnitude response and cancels the phase delay, so landmarks stay put.
pub fn filtfilt(signal: &[f64], sample_rate: f64, design: IirDesign) -> Vec<f64> {
    let Some(c) = design.coefficients(sample_rate) else {
        return signal.to_vec();
    };
    let forward = run_section(signal, &c, design.passes_dc());
    let reversed: Vec<f64> = forward.into_iter().rev().collect();
    let mut backward = run_section(&reversed, &c, design.passes_dc());
    backward.reverse();
    backward
}

pub fn lowpass(signal: &[f64], sample_rate: f64, cutoff_hz: f64) -> Vec<f64> {
    filtfilt(signal, sample_rate, IirDesign::LowPass { cutoff_hz })
}

pub fn highpass(signal: &[f64], sample_rate: f64, cutoff_hz: f64) -> Vec<f64> {
    filtfilt(signal, sample_rate, IirDesign::HighPass { cutoff_hz })
}

/// Low-pass at `high_hz` followed by high-pass at `low_hz`, both zero-phase
pub fn bandpass(signal: &[f64], sample_rate: f64, low_hz: f64, high_hz: f64) -> Vec<f64> {
    let low_passed = lowpass(signal, sample_rate, high_hz);
    highpass(&low_passed, sample_rate, low_hz)
}

pub fn notch(signal: &[f64], sample_rate: f64, center_hz: f64, q: f64) -> Vec<f64> {
    filtfilt(signal, sample_rate, IirDesign::Notch { center_hz, q })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::PI;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    fn rms(v: &[f64]) -> f64 {
        (v.iter().map(|x| x * x).sum::<f64>() / v.len() as f64).sqrt()
    }

    #[test]
    fn test_lowpass_attenuates_high_frequency() {
        let fs = 500.0;
        let slow = lowpass(&sine(2.0, fs, 2000), fs, 15.0);
        let fast = lowpass(&sine(100.0, fs, 2000), fs, 15.0);
        assert!(rms(&slow[200..1800]) > 0.6);
        assert!(rms(&fast[200..1800]) < 0.05);
    }

    #[test]
    fn test_highpass_removes_dc_offset() {
        let fs = 500.0;
        let offset: Vec<f64> = sine(10.0, fs, 2000).iter().map(|x| x + 500.0).collect();
        let out = highpass(&offset, fs, 0.5);
        let mean: f64 = out[500..1500].iter().sum::<f64>() / 1000.0;
        assert!(mean.abs() < 1.0, "residual DC {mean}");
    }

    #[test]
    fn test_notch_suppresses_tone() {
        let fs = 500.0;
        let out = notch(&sine(50.0, fs, 4000), fs, 50.0, 5.0);
        assert!(rms(&out[500..3500]) < 0.1);
    }

    #[test]
    fn test_design_above_nyquist_is_passthrough() {
        let input = sine(5.0, 100.0, 100);
        let out = lowpass(&input, 100.0, 80.0);
        assert_eq!(out, input);
    }

    #[test]
    fn test_lowpass_gain_around_cutoff() {
        // Butterworth section applied twice: -6 dB at the cutoff
        let fs = 500.0;
        let gain = |f: f64| {
            let out = lowpass(&sine(f, fs, 5000), fs, 15.0);
            rms(&out[1000..4000]) * 2f64.sqrt()
        };
        assert!(gain(7.5) > 0.9, "octave below {}", gain(7.5));
        assert!((gain(15.0) - 0.5).abs() < 0.05, "at cutoff {}", gain(15.0));
        assert!(gain(30.0) < 0.1, "octave above {}", gain(30.0));
    }

    #[test]
    fn test_highpass_gain_around_cutoff() {
        let fs = 500.0;
        let gain = |f: f64| {
            let out = highpass(&sine(f, fs, 5000), fs, 5.0);
            rms(&out[1000..4000]) * 2f64.sqrt()
        };
        assert!(gain(2.5) < 0.1, "octave below {}", gain(2.5));
        assert!((gain(5.0) - 0.5).abs() < 0.05, "at cutoff {}", gain(5.0));
        assert!(gain(10.0) > 0.9, "octave above {}", gain(10.0));
    }

    #[test]
    fn test_bandpass_keeps_qrs_band() {
        let fs = 500.0;
        let inside = bandpass(&sine(10.0, fs, 5000), fs, 5.0, 15.0);
        let below = bandpass(&sine(1.0, fs, 5000), fs, 5.0, 15.0);
        assert!(rms(&inside[1000..4000]) > 0.45);
        assert!(rms(&below[1000..4000]) < 0.01);
    }

    #[test]
    fn test_empty_signal() {
        assert!(filter(&[], 500.0, IirDesign::LowPass { cutoff_hz: 10.0 }).is_empty());
        assert!(filtfilt(&[], 500.0, IirDesign::HighPass { cutoff_hz: 1.0 }).is_empty());
    }
}
