//! Pan-Tompkins QRS detection
//!
//! **Module Organization**:
//! - `features` - bandpass, derivative, squaring and moving-window integration
//! - `state` - adaptive dual-threshold state machine with search-back
//! - `short` - IQR peak picker for signals shorter than the learning window
//!
//! **Detection**:
//! 1. Extract features from the raw lead
//! 2. Fold `DetectorState::step` over the local maxima of the integrated signal
//! 3. Terminal search-back up to the end of the signal
//! 4. Refine each peak to the raw maximum within ±50 ms, sort and deduplicate
//!
//! The fold is sequential by nature; independent leads can run concurrently on separate
//! detectors.

pub mod features;
pub mod short;
pub mod state;

pub use features::{extract, five_point_derivative, ms_to_samples, QrsFeatures};
pub use short::short_signal_peaks;
pub use state::{DetectorParams, DetectorPhase, DetectorState, PeakCandidate};

use tracing::{debug, instrument};

use crate::stats;

/// Window after an R peak in which a low-slope detection is checked for being a T wave, ms
pub const T_WAVE_WINDOW_MS: f64 = 360.0;

/// Configuration for the QRS detector
#[derive(Debug, Clone)]
pub struct QrsConfig {
    /// Bandpass upper edge (Hz)
    pub low_pass_hz: f64,
    /// Bandpass lower edge (Hz)
    pub high_pass_hz: f64,
    pub integration_window_ms: f64,
    pub refractory_ms: f64,
    /// Threshold learning window; shorter signals use the IQR picker
    pub learning_secs: f64,
    /// Half width of the raw-maximum refinement window
    pub refine_window_ms: f64,
    pub t_wave_discrimination: bool,
}

impl Default for QrsConfig {
    fn default() -> Self {
        Self {
            low_pass_hz: 15.0,
            high_pass_hz: 5.0,
            integration_window_ms: 150.0,
            refractory_ms: 200.0,
            learning_secs: 2.0,
            refine_window_ms: 50.0,
            t_wave_discrimination: true,
        }
    }
}

/// R-peak detector for one sample rate
#[derive(Debug, Clone)]
pub struct QrsDetector {
    sample_rate: f64,
    config: QrsConfig,
}

impl QrsDetector {
    pub fn new(sample_rate: f64, config: QrsConfig) -> Self {
        Self { sample_rate, config }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn params(&self) -> DetectorParams {
        DetectorParams {
            refractory: ms_to_samples(self.config.refractory_ms, self.sample_rate),
            learning: (self.config.learning_secs * self.sample_rate).round() as usize,
            t_wave_window: ms_to_samples(T_WAVE_WINDOW_MS, self.sample_rate),
            t_wave_discrimination: self.config.t_wave_discrimination,
        }
    }

    /// Run the adaptive-threshold fold over a feature set
    pub fn run_state_machine(&self, features: &QrsFeatures) -> DetectorState {
        features
            .integrated_peaks()
            .into_iter()
            .map(|i| PeakCandidate::from_features(features, i))
            .fold(DetectorState::new(self.params()), |state, candidate| {
                state.step(features, candidate)
            })
            .finish(features.len())
    }

    /// R-peak sample indices in ascending order
    #[instrument(skip(self, signal), fields(signal_len = signal.len(), fs = self.sample_rate))]
    pub fn detect(&self, signal: &[f64]) -> Vec<usize> {
        if signal.len() < 3 || !(self.sample_rate > 0.0) {
            return Vec::new();
        }

        let learning = (self.config.learning_secs * self.sample_rate).round() as usize;
        let peaks = if signal.len() < learning {
            debug!("signal shorter than learning window, using IQR picker");
            short_signal_peaks(signal, self.sample_rate)
        } else {
            let features = extract(
                signal,
                self.sample_rate,
                self.config.low_pass_hz,
                self.config.high_pass_hz,
                self.config.integration_window_ms,
            );
            self.run_state_machine(&features).r_peaks
        };

        let half_window = ms_to_samples(self.config.refine_window_ms, self.sample_rate);
        let refined = refine_to_raw_maximum(signal, &peaks, half_window);
        debug!(num_peaks = refined.len(), "R peaks detected");
        refined
    }
}

/// Move each peak to the raw maximum within ±`half_window` samples, then sort and dedup
pub fn refine_to_raw_maximum(signal: &[f64], peaks: &[usize], half_window: usize) -> Vec<usize> {
    let mut refined: Vec<usize> = peaks
        .iter()
        .filter_map(|&p| stats::argmax_in(signal, p.saturating_sub(half_window)..p + half_window + 1))
        .collect();
    refined.sort_unstable();
    refined.dedup();
    refined
}
