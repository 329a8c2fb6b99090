///! Adaptive-threshold detector state
///!
///! All running estimates live in one `DetectorState` value. `step` consumes the state and
///! one candidate peak and returns the next state, so the detector is a fold over the
///! integrated signal's local maxima and every transition can be tested in isolation.
///!
///! **Phases**:
///! - `Learning` - thresholds not yet initialized; the first step seeds them from the
///!   learning window
///! - `Detecting` - steady adaptive classification
///! - `SearchBack` - entered while rescanning a gap longer than `rr_missed` with the lower
///!   thresholds, left before the step returns

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::features::QrsFeatures;
use crate::stats;

/// RR intervals kept for the running averages
pub const RR_HISTORY: usize = 8;

/// `rr_low = 0.92 · rr_average2`
pub const RR_LOW_FACTOR: f64 = 0.92;
/// `rr_high = 1.16 · rr_average2`
pub const RR_HIGH_FACTOR: f64 = 1.16;
/// `rr_missed = 1.66 · rr_average2`
pub const RR_MISSED_FACTOR: f64 = 1.66;

/// Estimate update weight for a regular detection
const WEIGHT_DETECT: f64 = 0.125;
/// Estimate update weight for a search-back recovery
const WEIGHT_SEARCH_BACK: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorPhase {
    Learning,
    Detecting,
    SearchBack,
}

/// A local maximum of the integrated signal with its supporting measurements
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCandidate {
    pub index: usize,
    /// Integrated signal value at `index`
    pub integrated: f64,
    /// Largest |bandpassed| around `index`
    pub filtered: f64,
    /// Largest |derivative| around `index`
    pub slope: f64,
}

impl PeakCandidate {
    pub fn from_features(features: &QrsFeatures, index: usize) -> Self {
        let (filtered, slope) = features.local_maxima_around(index);
        Self {
            index,
            integrated: features.integrated[index],
            filtered,
            slope,
        }
    }
}

/// Timing parameters in samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    /// Minimum spacing between accepted peaks
    pub refractory: usize,
    /// Length of the threshold learning window
    pub learning: usize,
    /// Window after an R peak in which a low-slope candidate counts as a T wave
    pub t_wave_window: usize,
    pub t_wave_discrimination: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorState {
    pub params: DetectorParams,
    pub phase: DetectorPhase,

    pub spk_i: f64,
    pub npk_i: f64,
    pub threshold_i1: f64,
    pub threshold_i2: f64,

    pub spk_f: f64,
    pub npk_f: f64,
    pub threshold_f1: f64,
    pub threshold_f2: f64,

    /// Last 8 RR intervals (samples)
    pub recent_rr: VecDeque<f64>,
    /// Last 8 RR intervals that fell within [rr_low, rr_high]
    pub recent_normal_rr: VecDeque<f64>,
    pub rr_average1: f64,
    pub rr_average2: f64,
    pub rr_low: f64,
    pub rr_high: f64,
    /// Gap after which search-back fires; 0 until an RR interval is known
    pub rr_missed: f64,
    /// Whether the newest RR interval also entered `recent_normal_rr`
    pub last_rr_normal: bool,

    pub last_r: Option<usize>,
    /// Integrated value of the last accepted peak
    pub last_integrated: f64,
    /// Steepest derivative of the last accepted QRS
    pub last_slope: f64,
    pub r_peaks: Vec<usize>,
    /// Candidates classified as noise since the last accepted peak
    pub pending: Vec<PeakCandidate>,
}

fn push_bounded(history: &mut VecDeque<f64>, value: f64) {
    if history.len() == RR_HISTORY {
        history.pop_front();
    }
    history.push_back(value);
}

fn mean_of(history: &VecDeque<f64>) -> f64 {
    if history.is_empty() {
        0.0
    } else {
        history.iter().sum::<f64>() / history.len() as f64
    }
}

impl DetectorState {
    pub fn new(params: DetectorParams) -> Self {
        Self {
            params,
            phase: DetectorPhase::Learning,
            spk_i: 0.0,
            npk_i: 0.0,
            threshold_i1: 0.0,
            threshold_i2: 0.0,
            spk_f: 0.0,
            npk_f: 0.0,
            threshold_f1: 0.0,
            threshold_f2: 0.0,
            recent_rr: VecDeque::with_capacity(RR_HISTORY),
            recent_normal_rr: VecDeque::with_capacity(RR_HISTORY),
            rr_average1: 0.0,
            rr_average2: 0.0,
            rr_low: 0.0,
            rr_high: 0.0,
            rr_missed: 0.0,
            last_rr_normal: false,
            last_r: None,
            last_integrated: 0.0,
            last_slope: 0.0,
            r_peaks: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Seed signal/noise estimates from the learning window and switch to `Detecting`
    ///
    /// `spk = 0.25 · max`, `npk = 0.5 · mean`, for both the integrated and the |bandpassed|
    /// signal.
    pub fn learn(mut self, features: &QrsFeatures) -> Self {
        let end = self.params.learning.min(features.len());
        let integrated = &features.integrated[..end];
        let filtered: Vec<f64> = features.filtered[..end].iter().map(|x| x.abs()).collect();

        self.spk_i = 0.25 * integrated.iter().fold(0.0_f64, |m, &x| m.max(x));
        self.npk_i = 0.5 * stats::mean(integrated);
        self.spk_f = 0.25 * filtered.iter().fold(0.0_f64, |m, &x| m.max(x));
        self.npk_f = 0.5 * stats::mean(&filtered);
        self.update_thresholds();
        self.phase = DetectorPhase::Detecting;
        debug!(
            spk_i = self.spk_i,
            npk_i = self.npk_i,
            spk_f = self.spk_f,
            npk_f = self.npk_f,
            "detector thresholds learned"
        );
        self
    }

    fn update_thresholds(&mut self) {
        self.threshold_i1 = self.npk_i + 0.25 * (self.spk_i - self.npk_i);
        self.threshold_i2 = 0.5 * self.threshold_i1;
        self.threshold_f1 = self.npk_f + 0.25 * (self.spk_f - self.npk_f);
        self.threshold_f2 = 0.5 * self.threshold_f1;
    }

    fn record_rr(&mut self, rr: f64) {
        push_bounded(&mut self.recent_rr, rr);
        self.rr_average1 = mean_of(&self.recent_rr);

        let normal = self.recent_normal_rr.is_empty() || (rr >= self.rr_low && rr <= self.rr_high);
        if normal {
            push_bounded(&mut self.recent_normal_rr, rr);
            self.rr_average2 = mean_of(&self.recent_normal_rr);
        }
        self.last_rr_normal = normal;
        self.update_rr_bounds();
    }

    /// Overwrite the newest RR interval after its closing peak moved
    fn amend_last_rr(&mut self, rr: f64) {
        let Some(back) = self.recent_rr.back_mut() else {
            return;
        };
        *back = rr;
        self.rr_average1 = mean_of(&self.recent_rr);
        if self.last_rr_normal {
            if let Some(back) = self.recent_normal_rr.back_mut() {
                *back = rr;
            }
            self.rr_average2 = mean_of(&self.recent_normal_rr);
        }
        self.update_rr_bounds();
    }

    fn update_rr_bounds(&mut self) {
        self.rr_low = RR_LOW_FACTOR * self.rr_average2;
        self.rr_high = RR_HIGH_FACTOR * self.rr_average2;
        self.rr_missed = RR_MISSED_FACTOR * self.rr_average2;
    }

    fn accept(&mut self, c: &PeakCandidate, weight: f64) {
        self.spk_i = weight * c.integrated + (1.0 - weight) * self.spk_i;
        self.spk_f = weight * c.filtered + (1.0 - weight) * self.spk_f;
        if let Some(last) = self.last_r {
            self.record_rr(c.index.saturating_sub(last) as f64);
        }
        self.last_r = Some(c.index);
        self.last_integrated = c.integrated;
        self.last_slope = c.slope;
        self.r_peaks.push(c.index);
        let horizon = c.index + self.params.refractory;
        self.pending.retain(|p| p.index > horizon);
        self.update_thresholds();
    }

    fn reject(&mut self, c: &PeakCandidate) {
        self.npk_i = WEIGHT_DETECT * c.integrated + (1.0 - WEIGHT_DETECT) * self.npk_i;
        self.npk_f = WEIGHT_DETECT * c.filtered + (1.0 - WEIGHT_DETECT) * self.npk_f;
        self.pending.push(*c);
        self.update_thresholds();
    }

    /// Gap between the last accepted peak and `index` calls for a search-back
    fn missed_beat(&self, index: usize) -> bool {
        match self.last_r {
            Some(last) => self.rr_missed > 0.0 && (index.saturating_sub(last) as f64) > self.rr_missed,
            None => false,
        }
    }

    /// Rescan pending candidates before `index` with the secondary thresholds
    ///
    /// Recovers at most one beat per missed interval, repeating while the remaining gap is
    /// still too long.
    pub fn search_back(mut self, index: usize) -> Self {
        while self.missed_beat(index) {
            self.phase = DetectorPhase::SearchBack;
            let Some(last) = self.last_r else { break };
            let refractory = self.params.refractory;
            let best = self
                .pending
                .iter()
                .filter(|p| {
                    p.index < index
                        && p.index >= last + refractory
                        && p.integrated > self.threshold_i2
                        && p.filtered > self.threshold_f2
                })
                .fold(None, |best: Option<PeakCandidate>, p| match best {
                    Some(b) if b.integrated >= p.integrated => Some(b),
                    _ => Some(*p),
                });

            match best {
                Some(c) => {
                    debug!(index = c.index, integrated = c.integrated, "search-back recovered beat");
                    self.accept(&c, WEIGHT_SEARCH_BACK);
                }
                None => break,
            }
        }
        self.r_peaks.sort_unstable();
        self.phase = DetectorPhase::Detecting;
        self
    }

    /// Classify one candidate
    pub fn step(self, features: &QrsFeatures, c: PeakCandidate) -> Self {
        let mut state = match self.phase {
            DetectorPhase::Learning => self.learn(features),
            _ => self,
        };
        state = state.search_back(c.index);

        // Inside the refractory period only a larger peak of the same complex counts
        if let Some(last) = state.last_r {
            if c.index < last + state.params.refractory {
                if c.integrated > state.last_integrated && c.filtered > state.threshold_f1 {
                    trace!(from = last, to = c.index, "larger peak replaces refractory detection");
                    state.r_peaks.pop();
                    if let Some(&previous) = state.r_peaks.last() {
                        state.amend_last_rr(c.index.saturating_sub(previous) as f64);
                    }
                    state.r_peaks.push(c.index);
                    state.last_r = Some(c.index);
                    state.last_integrated = c.integrated;
                    state.last_slope = state.last_slope.max(c.slope);
                } else {
                    trace!(index = c.index, "candidate inside refractory period");
                }
                return state;
            }
        }

        if c.integrated > state.threshold_i1 && c.filtered > state.threshold_f1 {
            let t_wave = state.params.t_wave_discrimination
                && state
                    .last_r
                    .is_some_and(|last| c.index - last < state.params.t_wave_window)
                && c.slope < 0.5 * state.last_slope;
            if t_wave {
                trace!(index = c.index, slope = c.slope, "candidate classified as T wave");
                state.reject(&c);
            } else {
                trace!(index = c.index, integrated = c.integrated, "QRS accepted");
                state.accept(&c, WEIGHT_DETECT);
            }
        } else {
            trace!(index = c.index, integrated = c.integrated, "candidate classified as noise");
            state.reject(&c);
        }
        state
    }

    /// Terminal search-back over the gap up to the end of the signal
    pub fn finish(self, signal_len: usize) -> Self {
        self.search_back(signal_len)
    }
}
