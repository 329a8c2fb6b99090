//! Signal reconstruction: pixel traces to a calibrated, time-aligned multi-lead signal
//!
//! **Module Organization**:
//! - `columns` - column time origins and pixel to (s, µV) conversion
//! - `resample` - linear and windowed-sinc resampling onto a uniform grid
//!
//! **Per-lead chain**:
//! 1. Concatenate the lead's traces against its column origin, dropping masked points. A lead
//!    with a rhythm strip is taken from the strip alone, against the column 0 origin
//! 2. Resample to the target rate
//! 3. Median DC removal
//! 4. Mains notch when a 50/60 Hz tone carries more than 5 % of the energy
//! 5. Adaptive three-scale denoise followed by 7-point Savitzky-Golay
//! 6. Pad to the longest lead by repeating the last sample
//!
//! Leads are independent once the column origins are known and run in parallel.

pub mod columns;
pub mod resample;

pub use columns::{column_min_x, lead_series, rhythm_strip_flags, strip_origin, LeadSeries};
pub use resample::{output_len, resample, Interpolation};

use std::collections::BTreeMap;

use rayon::prelude::*;
use snafu::ensure;
use tracing::{debug, instrument, warn};

use crate::calibration::{simple_heart_rate, ResolvedCalibration};
use crate::error::{InvalidCalibrationSnafu, InvalidSampleRateSnafu, Result};
use crate::filter::{
    adaptive_denoise, detect_powerline, notch, remove_dc_offset, savitzky_golay,
    DEFAULT_DENOISE_SCALES_MS,
};
use crate::lead::Lead;
use crate::signal::{EcgSignal, SignalPlausibility};
use crate::trace::RawTrace;

/// Energy fraction above which a mains tone is notched out
pub const POWERLINE_MIN_FRACTION: f64 = 0.05;

/// Quality factor of the mains notch
pub const POWERLINE_NOTCH_Q: f64 = 30.0;

/// Half window of the final Savitzky-Golay pass (7 points)
pub const SMOOTHING_HALF_WINDOW: usize = 3;

/// Heart-rate range, bpm, the reconstructed reference lead should fall in
pub const PLAUSIBLE_HEART_RATE: (f64, f64) = (20.0, 300.0);

/// Configuration for signal reconstruction
#[derive(Debug, Clone)]
pub struct ReconstructionConfig {
    /// Output sample rate (Hz)
    pub target_sample_rate: f64,
    pub interpolation: Interpolation,
    /// Subtract the per-lead median
    pub remove_dc: bool,
    /// Adaptive denoise plus Savitzky-Golay smoothing
    pub enhanced_filtering: bool,
    /// Notch out a dominant 50/60 Hz tone
    pub powerline_notch: bool,
    /// Points with lower extraction confidence are dropped
    pub min_point_confidence: f64,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 500.0,
            interpolation: Interpolation::Linear,
            remove_dc: true,
            enhanced_filtering: true,
            powerline_notch: true,
            min_point_confidence: 0.0,
        }
    }
}

/// Resample and condition one lead
fn reconstruct_lead(
    lead: Lead,
    traces: &[&RawTrace],
    column_origin: f64,
    calibration: &ResolvedCalibration,
    config: &ReconstructionConfig,
) -> Vec<f64> {
    let fs = config.target_sample_rate;
    let series = lead_series(traces, column_origin, calibration, config.min_point_confidence);
    if series.masked > 0 {
        debug!(%lead, masked = series.masked, "dropped masked points");
    }

    let mut samples = resample(&series.times, &series.values, fs, config.interpolation);
    if samples.is_empty() {
        warn!(%lead, "lead has no usable points");
        return samples;
    }

    if config.remove_dc {
        samples = remove_dc_offset(&samples);
    }

    if config.powerline_notch {
        if let Some(mains_hz) = detect_powerline(&samples, fs, POWERLINE_MIN_FRACTION) {
            debug!(%lead, mains_hz, "notching mains interference");
            samples = notch(&samples, fs, mains_hz, POWERLINE_NOTCH_Q);
        }
    }

    if config.enhanced_filtering {
        samples = adaptive_denoise(&samples, fs, &DEFAULT_DENOISE_SCALES_MS);
        samples = savitzky_golay(&samples, SMOOTHING_HALF_WINDOW);
    }
    samples
}

/// Estimate heart rate on the reference lead (II, else the first) and flag implausible results
pub fn check_plausibility(leads: &BTreeMap<Lead, Vec<f64>>, sample_rate: f64) -> SignalPlausibility {
    let reference = leads.get(&Lead::II).or_else(|| leads.values().next());
    let Some(values) = reference else {
        return SignalPlausibility::default();
    };

    let times: Vec<f64> = (0..values.len()).map(|i| i as f64 / sample_rate).collect();
    let estimated_heart_rate = simple_heart_rate(&times, values);
    let (lo, hi) = PLAUSIBLE_HEART_RATE;
    let plausible = estimated_heart_rate.is_some_and(|hr| (lo..=hi).contains(&hr));
    if !plausible {
        warn!(estimated_hr = ?estimated_heart_rate, "reconstructed signal has implausible heart rate");
    }
    SignalPlausibility {
        estimated_heart_rate,
        plausible,
    }
}

/// Reconstruct a calibrated multi-lead signal
///
/// # Arguments
/// * `traces` - All digitized panels; a lead may appear several times
/// * `calibration` - Resolved pixel density, paper speed and gain
/// * `config` - Target rate and filter chain options
///
/// # Returns
/// Every lead padded to one length; `round(duration * sample_rate)` equals that length.
/// Fails only on structurally invalid traces or non-positive calibration/sample rate.
#[instrument(skip(traces, calibration, config), fields(num_traces = traces.len(), fs = config.target_sample_rate))]
pub fn reconstruct(
    traces: &[RawTrace],
    calibration: &ResolvedCalibration,
    config: &ReconstructionConfig,
) -> Result<EcgSignal> {
    let fs = config.target_sample_rate;
    ensure!(fs.is_finite() && fs > 0.0, InvalidSampleRateSnafu { sample_rate: fs });

    let positive = |v: f64| v.is_finite() && v > 0.0;
    ensure!(
        positive(calibration.px_per_mm)
            && positive(calibration.paper_speed)
            && positive(calibration.gain_mm_per_mv),
        InvalidCalibrationSnafu {
            px_per_mm: calibration.px_per_mm,
            paper_speed: calibration.paper_speed,
            gain: calibration.gain_mm_per_mv,
        }
    );

    for trace in traces {
        trace.validate()?;
    }

    let origins = column_min_x(traces);
    let rhythm_origin = strip_origin(traces, &origins).unwrap_or(0.0);

    // (panels, rhythm strips) per lead
    let mut by_lead: BTreeMap<Lead, (Vec<&RawTrace>, Vec<&RawTrace>)> = BTreeMap::new();
    for (trace, strip) in traces.iter().zip(rhythm_strip_flags(traces)) {
        let entry = by_lead.entry(trace.lead).or_default();
        if strip {
            entry.1.push(trace);
        } else {
            entry.0.push(trace);
        }
    }

    let groups: Vec<(Lead, Vec<&RawTrace>, f64)> = by_lead
        .into_iter()
        .map(|(lead, (panels, strips))| {
            if strips.is_empty() {
                (lead, panels, origins[lead.column()].unwrap_or(0.0))
            } else {
                debug!(%lead, num_panels = panels.len(), "rhythm strip supersedes panel traces");
                (lead, strips, rhythm_origin)
            }
        })
        .collect();
    let reconstructed: Vec<(Lead, Vec<f64>)> = groups
        .par_iter()
        .map(|(lead, lead_traces, origin)| {
            (*lead, reconstruct_lead(*lead, lead_traces, *origin, calibration, config))
        })
        .collect();

    let max_len = reconstructed.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    let leads: BTreeMap<Lead, Vec<f64>> = reconstructed
        .into_iter()
        .map(|(lead, mut samples)| {
            let fill = samples.last().copied().unwrap_or(0.0);
            samples.resize(max_len, fill);
            (lead, samples)
        })
        .collect();

    let plausibility = check_plausibility(&leads, fs);
    debug!(
        num_leads = leads.len(),
        num_samples = max_len,
        estimated_hr = ?plausibility.estimated_heart_rate,
        "signal reconstructed"
    );

    Ok(EcgSignal {
        sample_rate: fs,
        duration: max_len as f64 / fs,
        leads,
        plausibility,
    })
}
