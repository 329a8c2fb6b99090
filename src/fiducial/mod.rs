//! Fiducial point detection across all leads
//!
//! **Module Organization**:
//! - `types` - annotation and result types
//! - `statistics` - heart rate and detection-rate summary
//!
//! **Detection**:
//! 1. Pick the reference lead by preference order (II, V5, I, V2, aVF, else the first lead)
//! 2. Detect R peaks once on the reference lead; these are the global beats
//! 3. Per lead, move each global R peak to the lead's main deflection within ±50 ms
//! 4. Delineate QRS for every beat, then P (bounded by the previous T offset), T (bounded by
//!    the next QRS onset) and optionally U
//! 5. Derive RR, PR, QT and QTc intervals and a per-beat quality
//!
//! Leads share nothing once the global peaks are known and are delineated in parallel.

pub mod statistics;
pub mod types;

pub use statistics::compute_statistics;
pub use types::{
    BeatAnnotation, DetectionStatistics, FiducialDetectionResult, FiducialPoint, PWaveAnnotation, PWaveMorphology,
    QrsAnnotation, QrsMorphology, TWaveAnnotation, TWaveMorphology, UWaveAnnotation,
};

use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use snafu::ensure;
use tracing::{debug, instrument, warn};

use crate::delineate::{delineate_p, delineate_qrs, delineate_t, delineate_u, LeadContext};
use crate::error::{InvalidSampleRateSnafu, MismatchedLeadLengthsSnafu, Result};
use crate::lead::Lead;
use crate::qrs::{QrsConfig, QrsDetector};
use crate::signal::EcgSignal;

/// Beats needed before anything is delineated
pub const MIN_BEATS: usize = 2;

/// Quality contribution of a P or T wave that was not found
pub const MISSING_WAVE_QUALITY: f64 = 0.3;

/// Configuration for the fiducial detector
#[derive(Debug, Clone)]
pub struct FiducialConfig {
    /// Leads tried in order for global R-peak detection
    pub reference_preference: Vec<Lead>,
    /// Half width of the per-lead R refinement window
    pub refine_window_ms: f64,
    pub detect_u_wave: bool,
}

impl Default for FiducialConfig {
    fn default() -> Self {
        Self {
            reference_preference: vec![Lead::II, Lead::V5, Lead::I, Lead::V2, Lead::AVF],
            refine_window_ms: 50.0,
            detect_u_wave: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FiducialDetector {
    config: FiducialConfig,
    qrs: QrsConfig,
}

impl FiducialDetector {
    pub fn new(config: FiducialConfig, qrs: QrsConfig) -> Self {
        Self { config, qrs }
    }

    pub fn config(&self) -> &FiducialConfig {
        &self.config
    }

    /// First preferred lead present in `leads`, else the first lead
    pub fn reference_lead<T>(&self, leads: &BTreeMap<Lead, T>) -> Option<Lead> {
        self.config
            .reference_preference
            .iter()
            .copied()
            .find(|lead| leads.contains_key(lead))
            .or_else(|| leads.keys().next().copied())
    }

    /// Annotate every lead of a reconstructed signal
    pub fn detect(&self, signal: &EcgSignal) -> Result<FiducialDetectionResult> {
        self.detect_leads(&signal.leads, signal.sample_rate)
    }

    /// Annotate every lead of an equal-length lead map
    ///
    /// # Arguments
    /// * `leads` - Samples per lead in µV, all of one length
    /// * `sample_rate` - Samples per second
    ///
    /// # Returns
    /// Per-lead beat annotations keyed by lead. With fewer than two R peaks every lead gets
    /// an empty beat list and the statistics are zeroed. Fails only on a non-positive sample
    /// rate or leads of differing lengths.
    #[instrument(skip(self, leads), fields(num_leads = leads.len(), fs = sample_rate))]
    pub fn detect_leads(&self, leads: &BTreeMap<Lead, Vec<f64>>, sample_rate: f64) -> Result<FiducialDetectionResult> {
        let started = Instant::now();
        ensure!(sample_rate.is_finite() && sample_rate > 0.0, InvalidSampleRateSnafu { sample_rate });

        let expected = leads.values().next().map_or(0, Vec::len);
        if let Some((lead, samples)) = leads.iter().find(|(_, v)| v.len() != expected) {
            return MismatchedLeadLengthsSnafu {
                lead: *lead,
                len: samples.len(),
                expected,
            }
            .fail();
        }

        let reference_lead = self.reference_lead(leads);
        let global_r_peaks = reference_lead
            .and_then(|lead| leads.get(&lead))
            .map(|samples| QrsDetector::new(sample_rate, self.qrs.clone()).detect(samples))
            .unwrap_or_default();
        debug!(reference = ?reference_lead, num_peaks = global_r_peaks.len(), "global R peaks");

        let (annotations, statistics) = if global_r_peaks.len() < MIN_BEATS {
            warn!(num_peaks = global_r_peaks.len(), "too few beats to delineate");
            let empty = leads.keys().map(|lead| (*lead, Vec::new())).collect();
            (empty, DetectionStatistics::default())
        } else {
            let annotations: BTreeMap<Lead, Vec<BeatAnnotation>> = leads
                .par_iter()
                .map(|(lead, samples)| (*lead, self.annotate_lead(samples, sample_rate, &global_r_peaks)))
                .collect();
            let statistics = compute_statistics(&global_r_peaks, sample_rate, &annotations);
            (annotations, statistics)
        };

        debug!(
            beats = statistics.total_beats,
            mean_hr = statistics.mean_heart_rate,
            p_rate = statistics.p_wave_detection_rate,
            t_rate = statistics.t_wave_detection_rate,
            "fiducial detection complete"
        );

        Ok(FiducialDetectionResult {
            sample_rate,
            duration: expected as f64 / sample_rate,
            reference_lead,
            leads: annotations,
            global_r_peaks,
            statistics,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }

    fn annotate_lead(&self, signal: &[f64], sample_rate: f64, global_r_peaks: &[usize]) -> Vec<BeatAnnotation> {
        let ctx = LeadContext::new(signal, sample_rate);
        if ctx.is_empty() {
            return Vec::new();
        }
        let half_window = ctx.samples(self.config.refine_window_ms);

        let complexes: Vec<QrsAnnotation> = global_r_peaks
            .iter()
            .map(|&peak| delineate_qrs(&ctx, refine_to_main_deflection(&ctx, peak, half_window)))
            .collect();

        let rr_ms = |k: usize| ctx.ms_between(global_r_peaks[k - 1], global_r_peaks[k]);
        let mut previous_t_offset = None;
        let mut beats = Vec::with_capacity(complexes.len());
        for (k, qrs) in complexes.iter().enumerate() {
            let next_onset = complexes.get(k + 1).map(|next| next.onset.index);
            let p_wave = delineate_p(&ctx, qrs.onset.index, previous_t_offset);
            let t_wave = delineate_t(&ctx, qrs.j_point.index, next_onset);
            let u_wave = self.config.detect_u_wave.then(|| delineate_u(&ctx, &t_wave, next_onset));
            previous_t_offset = t_wave.offset.map(|p| p.index);

            let rr_interval = (k > 0).then(|| rr_ms(k));
            let rr_interval_next = (k + 1 < global_r_peaks.len()).then(|| rr_ms(k + 1));
            let pr_interval = p_wave.onset.map(|p| ctx.ms_between(p.index, qrs.onset.index));
            let qt_interval = t_wave.offset.map(|t| ctx.ms_between(qrs.onset.index, t.index));
            let qtc_interval = qt_interval
                .zip(rr_interval)
                .filter(|&(_, rr)| rr > 0.0)
                .map(|(qt, rr)| qt / (rr / 1000.0).sqrt());

            let wave_quality = |present: bool, confidence: f64| if present { confidence } else { MISSING_WAVE_QUALITY };
            let quality = (qrs.confidence
                + wave_quality(p_wave.present, p_wave.confidence)
                + wave_quality(t_wave.present, t_wave.confidence))
                / 3.0;

            beats.push(BeatAnnotation {
                beat_index: k,
                p_wave,
                qrs: *qrs,
                t_wave,
                u_wave,
                rr_interval,
                rr_interval_next,
                pr_interval,
                qrs_duration: qrs.duration_ms,
                qt_interval,
                qtc_interval,
                quality,
            });
        }
        beats
    }
}

/// Sample within ±`half_window` of `peak` furthest from the lead's isoelectric level
///
/// Leads whose main deflection is negative lock onto its trough.
pub fn refine_to_main_deflection(ctx: &LeadContext, peak: usize, half_window: usize) -> usize {
    if ctx.is_empty() {
        return peak;
    }
    let start = peak.saturating_sub(half_window).min(ctx.len() - 1);
    let end = (peak + half_window + 1).min(ctx.len());
    (start..end).fold(start, |best, i| {
        if ctx.deviation(i).abs() > ctx.deviation(best).abs() {
            i
        } else {
            best
        }
    })
}
