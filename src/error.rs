use snafu::Snafu;

use crate::lead::Lead;
use crate::trace::InvalidTraceError;

/// Unrecoverable input errors
///
/// Degraded input (short traces, missing beats, odd calibration) is represented as data with
/// a confidence score instead.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Malformed pixel trace
    #[snafu(display("invalid trace: {source}"), context(false))]
    InvalidTrace { source: InvalidTraceError },

    /// Sample rate must be positive and finite
    #[snafu(display("sample rate must be positive, got {sample_rate}"))]
    InvalidSampleRate { sample_rate: f64 },

    /// Calibration factors must be positive and finite
    #[snafu(display(
        "invalid calibration: {px_per_mm} px/mm, {paper_speed} mm/s, {gain} mm/mV"
    ))]
    InvalidCalibration {
        px_per_mm: f64,
        paper_speed: f64,
        gain: f64,
    },

    /// Leads handed to the fiducial detector must share one length
    #[snafu(display("lead {lead} has {len} samples, expected {expected}"))]
    MismatchedLeadLengths {
        lead: Lead,
        len: usize,
        expected: usize,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
