//! Pixel-space inputs from the upstream image analysis stage
//!
//! A `RawTrace` is one digitized panel: a polyline of pixel coordinates for a single lead,
//! the pixel row of its isoelectric baseline, and per-point confidences. A lead can own
//! several traces when a rhythm strip continues it.
//!
//! `CalibrationAnalysis` and `GridAnalysis` are hints read off the image. They are
//! frequently wrong, so the calibration resolver treats them as candidate sources rather
//! than ground truth.

use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::lead::Lead;

/// Standard ECG gain in mm/mV
pub const DEFAULT_GAIN_MM_PER_MV: f64 = 10.0;

/// Standard paper speed in mm/s
pub const DEFAULT_PAPER_SPEED_MM_PER_S: f64 = 25.0;

/// Horizontal pixel range where the trace could not be followed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceGap {
    pub start_x: f64,
    pub end_x: f64,
}

impl TraceGap {
    pub fn contains(&self, x: f64) -> bool {
        x >= self.start_x && x <= self.end_x
    }
}

/// One digitized panel for one lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrace {
    pub lead: Lead,
    /// Pixel columns, left to right
    pub x_pixels: Vec<f64>,
    /// Pixel rows (image coordinates, y grows downward)
    pub y_pixels: Vec<f64>,
    /// Per-point extraction confidence; empty means "all fully trusted"
    pub confidence: Vec<f64>,
    /// Pixel row of the isoelectric line
    pub baseline_y: f64,
    pub gaps: Vec<TraceGap>,
    /// Name of the extraction method that produced this trace
    pub method: String,
}

#[derive(Debug, Snafu)]
pub enum InvalidTraceError {
    /// Trace has no points
    #[snafu(display("trace for lead {lead} is empty"))]
    Empty { lead: Lead },

    /// X and Y arrays must be parallel
    #[snafu(display("trace for lead {lead} has {x_len} x pixels but {y_len} y pixels"))]
    MismatchedLengths { lead: Lead, x_len: usize, y_len: usize },

    /// Confidence must be empty or parallel to the pixel arrays
    #[snafu(display("trace for lead {lead} has {confidence_len} confidences for {len} points"))]
    MismatchedConfidence {
        lead: Lead,
        confidence_len: usize,
        len: usize,
    },

    /// NaN or infinite pixel coordinate
    #[snafu(display("trace for lead {lead} has a non-finite coordinate at point {index}"))]
    NonFiniteCoordinate { lead: Lead, index: usize },
}

impl RawTrace {
    pub fn new(lead: Lead, x_pixels: Vec<f64>, y_pixels: Vec<f64>, baseline_y: f64) -> Self {
        Self {
            lead,
            x_pixels,
            y_pixels,
            confidence: Vec::new(),
            baseline_y,
            gaps: Vec::new(),
            method: String::from("unknown"),
        }
    }

    pub fn len(&self) -> usize {
        self.x_pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_pixels.is_empty()
    }

    /// Check structural consistency
    ///
    /// This is the only input condition the pipeline refuses to degrade around.
    pub fn validate(&self) -> Result<(), InvalidTraceError> {
        if self.x_pixels.len() != self.y_pixels.len() {
            return Err(InvalidTraceError::MismatchedLengths {
                lead: self.lead,
                x_len: self.x_pixels.len(),
                y_len: self.y_pixels.len(),
            });
        }
        if self.is_empty() {
            return Err(InvalidTraceError::Empty { lead: self.lead });
        }
        if !self.confidence.is_empty() && self.confidence.len() != self.len() {
            return Err(InvalidTraceError::MismatchedConfidence {
                lead: self.lead,
                confidence_len: self.confidence.len(),
                len: self.len(),
            });
        }
        let non_finite = self
            .x_pixels
            .iter()
            .zip(self.y_pixels.iter())
            .position(|(x, y)| !x.is_finite() || !y.is_finite());
        if let Some(index) = non_finite {
            return Err(InvalidTraceError::NonFiniteCoordinate {
                lead: self.lead,
                index,
            });
        }
        if !self.baseline_y.is_finite() {
            return Err(InvalidTraceError::NonFiniteCoordinate {
                lead: self.lead,
                index: self.len(),
            });
        }
        Ok(())
    }

    pub fn min_x(&self) -> f64 {
        self.x_pixels.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_x(&self) -> f64 {
        self.x_pixels.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Horizontal pixel span
    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_x() - self.min_x()
        }
    }

    /// Confidence of point `i` (1.0 when no confidences were supplied)
    pub fn confidence_at(&self, i: usize) -> f64 {
        self.confidence.get(i).copied().unwrap_or(1.0)
    }

    pub fn in_gap(&self, x: f64) -> bool {
        self.gaps.iter().any(|g| g.contains(x))
    }
}

/// Where a calibration value was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationSource {
    /// Read from the calibration pulse printed on the paper
    Pulse,
    /// Read from printed text ("25 mm/s, 10 mm/mV")
    Text,
    /// Standard value assumed
    Assumed,
}

/// Gain and paper speed hint from the image analysis stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationAnalysis {
    pub gain_mm_per_mv: f64,
    pub paper_speed_mm_per_s: f64,
    pub found: bool,
    pub gain_source: CalibrationSource,
    pub speed_source: CalibrationSource,
    pub confidence: f64,
}

impl Default for CalibrationAnalysis {
    fn default() -> Self {
        Self {
            gain_mm_per_mv: DEFAULT_GAIN_MM_PER_MV,
            paper_speed_mm_per_s: DEFAULT_PAPER_SPEED_MM_PER_S,
            found: false,
            gain_source: CalibrationSource::Assumed,
            speed_source: CalibrationSource::Assumed,
            confidence: 0.0,
        }
    }
}

impl CalibrationAnalysis {
    /// Gain to use for voltage conversion, replacing nonsense with the standard 10 mm/mV
    pub fn effective_gain(&self) -> f64 {
        if self.gain_mm_per_mv.is_finite() && self.gain_mm_per_mv > 0.0 {
            self.gain_mm_per_mv
        } else {
            DEFAULT_GAIN_MM_PER_MV
        }
    }
}

/// Grid measurements from the image analysis stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridAnalysis {
    /// Direct estimate of pixels per millimetre
    pub px_per_mm: Option<f64>,
    /// Number of large (5 mm) boxes spanning one panel horizontally
    pub large_boxes_per_panel: Option<f64>,
    /// Free-text visual heart-rate estimate, e.g. "approximately 70-80 bpm"
    pub visual_heart_rate_estimate: Option<String>,
    pub grid_detected: bool,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(x: Vec<f64>, y: Vec<f64>) -> RawTrace {
        RawTrace::new(Lead::II, x, y, 100.0)
    }

    #[test]
    fn test_validate_accepts_parallel_arrays() {
        let t = trace(vec![0.0, 1.0, 2.0], vec![100.0, 90.0, 100.0]);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_mismatched_lengths() {
        let t = trace(vec![0.0, 1.0, 2.0], vec![100.0, 90.0]);
        assert!(matches!(
            t.validate(),
            Err(InvalidTraceError::MismatchedLengths { x_len: 3, y_len: 2, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_partial_confidence() {
        let mut t = trace(vec![0.0, 1.0], vec![100.0, 90.0]);
        t.confidence = vec![1.0];
        assert!(matches!(
            t.validate(),
            Err(InvalidTraceError::MismatchedConfidence { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let t = trace(vec![0.0, f64::NAN], vec![100.0, 90.0]);
        assert!(matches!(
            t.validate(),
            Err(InvalidTraceError::NonFiniteCoordinate { index: 1, .. })
        ));
    }

    #[test]
    fn test_width_and_gaps() {
        let mut t = trace(vec![10.0, 20.0, 60.0], vec![0.0; 3]);
        t.gaps.push(TraceGap {
            start_x: 15.0,
            end_x: 25.0,
        });
        assert_eq!(t.width(), 50.0);
        assert!(t.in_gap(20.0));
        assert!(!t.in_gap(60.0));
    }

    #[test]
    fn test_effective_gain_falls_back() {
        let hint = CalibrationAnalysis {
            gain_mm_per_mv: 0.0,
            ..CalibrationAnalysis::default()
        };
        assert_eq!(hint.effective_gain(), DEFAULT_GAIN_MM_PER_MV);
    }
}
