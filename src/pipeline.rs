//! End-to-end digitization: pixel traces to calibrated signal and fiducial annotations
//!
//! Chains the three stages with one configuration:
//! 1. `calibration::resolve` - pixel density and paper speed
//! 2. `reconstruct::reconstruct` - uniform multi-lead signal in µV
//! 3. `FiducialDetector::detect` - R peaks and per-lead P/QRS/T/U landmarks

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::calibration::{self, ResolvedCalibration};
use crate::error::Result;
use crate::fiducial::{FiducialConfig, FiducialDetectionResult, FiducialDetector};
use crate::qrs::QrsConfig;
use crate::reconstruct::{self, ReconstructionConfig};
use crate::signal::EcgSignal;
use crate::trace::{CalibrationAnalysis, GridAnalysis, RawTrace};

/// Configuration for every stage
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub reconstruction: ReconstructionConfig,
    pub qrs: QrsConfig,
    pub fiducial: FiducialConfig,
}

/// Output of a full digitization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digitization {
    pub calibration: ResolvedCalibration,
    pub signal: EcgSignal,
    pub fiducials: FiducialDetectionResult,
}

/// Digitize one tracing
///
/// # Arguments
/// * `traces` - Pixel traces from the image analysis stage
/// * `grid` - Grid measurements, used for calibration candidates
/// * `hint` - Gain and paper speed read from the image
/// * `config` - Per-stage configuration
///
/// # Returns
/// Calibration, reconstructed signal and annotations. Fails only when a trace is malformed.
#[instrument(skip_all, fields(num_traces = traces.len()))]
pub fn digitize(
    traces: &[RawTrace],
    grid: &GridAnalysis,
    hint: &CalibrationAnalysis,
    config: &PipelineConfig,
) -> Result<Digitization> {
    let calibration = calibration::resolve(traces, grid, hint);
    let signal = reconstruct::reconstruct(traces, &calibration, &config.reconstruction)?;
    let fiducials = FiducialDetector::new(config.fiducial.clone(), config.qrs.clone()).detect(&signal)?;

    debug!(
        method = calibration.method.as_str(),
        duration = signal.duration,
        beats = fiducials.statistics.total_beats,
        "digitization complete"
    );

    Ok(Digitization {
        calibration,
        signal,
        fiducials,
    })
}
