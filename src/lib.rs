
pub mod lead;
pub mod trace;
pub mod signal;
pub mod stats;
pub mod filter;
pub mod calibration;
pub mod reconstruct;
pub mod qrs;
pub mod delineate;
pub mod fiducial;
pub mod pipeline;
pub mod error;
pub mod tracing_init;

pub use lead::Lead;
pub use trace::{CalibrationAnalysis, GridAnalysis, RawTrace, TraceGap};
pub use signal::{EcgSignal, SignalPlausibility};
pub use calibration::{resolve, CalibrationMethod, ResolvedCalibration};
pub use reconstruct::{reconstruct, Interpolation, ReconstructionConfig};
pub use qrs::{QrsConfig, QrsDetector};
pub use fiducial::{BeatAnnotation, FiducialConfig, FiducialDetectionResult, FiducialDetector};
pub use pipeline::{digitize, Digitization, PipelineConfig};
pub use error::{Error, Result};
