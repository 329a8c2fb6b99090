//! Fiducial annotation types
//!
//! Plain data handed to downstream consumers. Times are seconds from the start of the
//! signal, amplitudes are µV relative to the lead's isoelectric level, intervals and
//! durations are milliseconds. `confidence` and `quality` are soft signals in [0, 1].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lead::Lead;

/// One located landmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiducialPoint {
    pub index: usize,
    pub time: f64,
    /// Raw sample value at `index`
    pub amplitude: f64,
    pub confidence: f64,
}

impl FiducialPoint {
    /// Landmark at `index`, reading its amplitude from `signal`
    pub fn at(signal: &[f64], index: usize, sample_rate: f64, confidence: f64) -> Self {
        Self {
            index,
            time: index as f64 / sample_rate,
            amplitude: signal.get(index).copied().unwrap_or(0.0),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PWaveMorphology {
    Normal,
    /// Notched, two humps (P mitrale)
    Bifid,
    Inverted,
    /// Tall (P pulmonale)
    Peaked,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PWaveAnnotation {
    pub present: bool,
    pub onset: Option<FiducialPoint>,
    pub peak: Option<FiducialPoint>,
    pub offset: Option<FiducialPoint>,
    pub amplitude: f64,
    pub duration_ms: f64,
    pub morphology: PWaveMorphology,
    pub confidence: f64,
}

impl PWaveAnnotation {
    pub fn absent(confidence: f64) -> Self {
        Self {
            present: false,
            onset: None,
            peak: None,
            offset: None,
            amplitude: 0.0,
            duration_ms: 0.0,
            morphology: PWaveMorphology::Absent,
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrsMorphology {
    Normal,
    /// Longer than 120 ms
    Wide,
    /// Secondary R wave after S
    RsRPrime,
    /// No positive deflection
    Qs,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QrsAnnotation {
    pub onset: FiducialPoint,
    pub q: Option<FiducialPoint>,
    pub r: FiducialPoint,
    pub r_prime: Option<FiducialPoint>,
    pub s: Option<FiducialPoint>,
    pub s_prime: Option<FiducialPoint>,
    /// QRS offset
    pub j_point: FiducialPoint,
    pub duration_ms: f64,
    /// R amplitude relative to the isoelectric level
    pub amplitude: f64,
    pub morphology: QrsMorphology,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TWaveMorphology {
    Normal,
    Inverted,
    Biphasic,
    /// Tall and narrow-based
    Peaked,
    /// Tall and broad-based
    Hyperacute,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TWaveAnnotation {
    pub present: bool,
    pub onset: Option<FiducialPoint>,
    pub peak: Option<FiducialPoint>,
    /// Tangent-refined end of the T wave
    pub offset: Option<FiducialPoint>,
    pub amplitude: f64,
    pub duration_ms: f64,
    pub morphology: TWaveMorphology,
    pub confidence: f64,
}

impl TWaveAnnotation {
    pub fn absent(confidence: f64) -> Self {
        Self {
            present: false,
            onset: None,
            peak: None,
            offset: None,
            amplitude: 0.0,
            duration_ms: 0.0,
            morphology: TWaveMorphology::Absent,
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UWaveAnnotation {
    pub present: bool,
    pub peak: Option<FiducialPoint>,
    pub amplitude: f64,
    pub confidence: f64,
}

impl UWaveAnnotation {
    pub fn absent(confidence: f64) -> Self {
        Self {
            present: false,
            peak: None,
            amplitude: 0.0,
            confidence,
        }
    }
}

/// All landmarks of one beat on one lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatAnnotation {
    /// Position in `global_r_peaks`
    pub beat_index: usize,
    pub p_wave: PWaveAnnotation,
    pub qrs: QrsAnnotation,
    pub t_wave: TWaveAnnotation,
    /// `None` when U-wave detection is disabled
    pub u_wave: Option<UWaveAnnotation>,
    /// From the previous R peak, ms
    pub rr_interval: Option<f64>,
    /// To the next R peak, ms
    pub rr_interval_next: Option<f64>,
    /// P onset to QRS onset, ms
    pub pr_interval: Option<f64>,
    pub qrs_duration: f64,
    /// QRS onset to T offset, ms
    pub qt_interval: Option<f64>,
    /// Bazett-corrected QT, ms
    pub qtc_interval: Option<f64>,
    /// `mean(qrs confidence, P confidence or 0.3, T confidence or 0.3)`
    pub quality: f64,
}

/// Summary over all annotated beats
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionStatistics {
    pub total_beats: usize,
    /// bpm, from RR intervals within [200, 3000] ms
    pub mean_heart_rate: f64,
    pub min_heart_rate: f64,
    pub max_heart_rate: f64,
    /// Fraction of beat annotations with a P wave
    pub p_wave_detection_rate: f64,
    /// Fraction of beat annotations with a T wave
    pub t_wave_detection_rate: f64,
    /// Mean beat quality
    pub mean_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiducialDetectionResult {
    pub sample_rate: f64,
    pub duration: f64,
    /// Lead the global R peaks were detected on
    pub reference_lead: Option<Lead>,
    pub leads: BTreeMap<Lead, Vec<BeatAnnotation>>,
    pub global_r_peaks: Vec<usize>,
    pub statistics: DetectionStatistics,
    /// Wall-clock time spent detecting
    pub processing_time_ms: f64,
}
