///! Calibration candidate generation
///!
///! Each strategy proposes (pixels-per-mm, paper-speed) pairs from a different source of
///! evidence. None of them is trusted on its own; the scorer decides.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stats;
use crate::trace::{CalibrationAnalysis, GridAnalysis, RawTrace};

/// Paper speeds tried by every strategy, mm/s
pub const CANONICAL_PAPER_SPEEDS: [f64; 2] = [25.0, 50.0];

/// Millimetres per large grid box
pub const MM_PER_LARGE_BOX: f64 = 5.0;

/// Seconds spanned by one panel on a standard 4-column layout
pub const ASSUMED_PANEL_SECONDS: f64 = 2.5;

/// Accepted pixel density range for grid-box counting (exclusive)
pub const GRID_PX_PER_MM_MIN: f64 = 1.0;
pub const GRID_PX_PER_MM_MAX: f64 = 30.0;

/// Traces wider than this multiple of the median width are rhythm strips
pub const RHYTHM_STRIP_WIDTH_RATIO: f64 = 1.5;

/// How a calibration was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMethod {
    /// Panel width divided by the counted large boxes
    GridBoxCount,
    /// Pixel density estimated directly by the image analysis stage
    AiDirect,
    /// Panel assumed to span 2.5 s
    PanelDuration,
    /// No candidate survived; standard constants assumed
    Fallback,
}

impl CalibrationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationMethod::GridBoxCount => "grid_box_count",
            CalibrationMethod::AiDirect => "ai_direct",
            CalibrationMethod::PanelDuration => "panel_duration",
            CalibrationMethod::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationCandidate {
    pub px_per_mm: f64,
    /// mm/s
    pub paper_speed: f64,
    pub method: CalibrationMethod,
}

impl CalibrationCandidate {
    /// Positive and finite in both factors
    pub fn is_sane(&self) -> bool {
        self.px_per_mm.is_finite()
            && self.px_per_mm > 0.0
            && self.paper_speed.is_finite()
            && self.paper_speed > 0.0
    }
}

/// Horizontal extent statistics of the panel traces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelWidths {
    pub median_px: f64,
    /// Mean width of traces that are not rhythm strips
    pub mean_panel_px: f64,
}

impl PanelWidths {
    pub fn is_rhythm_strip(&self, width_px: f64) -> bool {
        width_px > RHYTHM_STRIP_WIDTH_RATIO * self.median_px
    }
}

/// Measure panel widths, ignoring rhythm strips wider than 1.5x the median
pub fn panel_widths(traces: &[RawTrace]) -> Option<PanelWidths> {
    let widths: Vec<f64> = traces
        .iter()
        .map(RawTrace::width)
        .filter(|w| w.is_finite() && *w > 0.0)
        .collect();
    if widths.is_empty() {
        return None;
    }

    let median_px = stats::median(&widths);
    let mut result = PanelWidths {
        median_px,
        mean_panel_px: 0.0,
    };
    let panels: Vec<f64> = widths.iter().copied().filter(|&w| !result.is_rhythm_strip(w)).collect();
    result.mean_panel_px = stats::mean(&panels);
    Some(result)
}

fn alternate_speed(speed: f64) -> f64 {
    if (speed - CANONICAL_PAPER_SPEEDS[0]).abs() < f64::EPSILON {
        CANONICAL_PAPER_SPEEDS[1]
    } else {
        CANONICAL_PAPER_SPEEDS[0]
    }
}

/// Propose candidates from grid-box counting, the direct estimate, and the panel duration
///
/// Order is fixed (grid, direct, panel) so ties resolve deterministically.
pub fn generate_candidates(
    traces: &[RawTrace],
    grid: &GridAnalysis,
    hint: &CalibrationAnalysis,
) -> Vec<CalibrationCandidate> {
    let mut candidates = Vec::new();
    let widths = panel_widths(traces);

    // 1. Grid-box counting
    if let (Some(w), Some(boxes)) = (widths, grid.large_boxes_per_panel) {
        if boxes > 0.0 {
            let px_per_mm = w.mean_panel_px / (boxes * MM_PER_LARGE_BOX);
            if px_per_mm > GRID_PX_PER_MM_MIN && px_per_mm < GRID_PX_PER_MM_MAX {
                for &paper_speed in &CANONICAL_PAPER_SPEEDS {
                    candidates.push(CalibrationCandidate {
                        px_per_mm,
                        paper_speed,
                        method: CalibrationMethod::GridBoxCount,
                    });
                }
            } else {
                debug!(px_per_mm, boxes, "grid box count outside plausible density");
            }
        }
    }

    // 2. Direct estimate, at the hinted speed and the alternate one
    if let Some(px_per_mm) = grid.px_per_mm {
        let hinted_speed = if hint.paper_speed_mm_per_s.is_finite() && hint.paper_speed_mm_per_s > 0.0 {
            hint.paper_speed_mm_per_s
        } else {
            CANONICAL_PAPER_SPEEDS[0]
        };
        for paper_speed in [hinted_speed, alternate_speed(hinted_speed)] {
            candidates.push(CalibrationCandidate {
                px_per_mm,
                paper_speed,
                method: CalibrationMethod::AiDirect,
            });
        }
    }

    // 3. Panel duration assumption
    if let Some(w) = widths {
        for &paper_speed in &CANONICAL_PAPER_SPEEDS {
            candidates.push(CalibrationCandidate {
                px_per_mm: w.mean_panel_px / (ASSUMED_PANEL_SECONDS * paper_speed),
                paper_speed,
                method: CalibrationMethod::PanelDuration,
            });
        }
    }

    candidates.retain(CalibrationCandidate::is_sane);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::Lead;

    fn flat_trace(lead: Lead, width: usize) -> RawTrace {
        let x: Vec<f64> = (0..=width).map(|i| i as f64).collect();
        let y = vec![100.0; x.len()];
        RawTrace::new(lead, x, y, 100.0)
    }

    #[test]
    fn test_panel_widths_ignore_rhythm_strip() {
        let traces = vec![
            flat_trace(Lead::I, 250),
            flat_trace(Lead::AVR, 250),
            flat_trace(Lead::V1, 250),
            flat_trace(Lead::II, 1000),
        ];
        let w = panel_widths(&traces).unwrap();
        assert_eq!(w.median_px, 250.0);
        assert_eq!(w.mean_panel_px, 250.0);
    }

    #[test]
    fn test_generate_all_strategies() {
        let traces = vec![flat_trace(Lead::II, 250), flat_trace(Lead::V1, 250)];
        let grid = GridAnalysis {
            px_per_mm: Some(8.0),
            large_boxes_per_panel: Some(5.0),
            ..GridAnalysis::default()
        };
        let hint = CalibrationAnalysis::default();

        let candidates = generate_candidates(&traces, &grid, &hint);
        let methods: Vec<CalibrationMethod> = candidates.iter().map(|c| c.method).collect();
        assert_eq!(
            methods,
            vec![
                CalibrationMethod::GridBoxCount,
                CalibrationMethod::GridBoxCount,
                CalibrationMethod::AiDirect,
                CalibrationMethod::AiDirect,
                CalibrationMethod::PanelDuration,
                CalibrationMethod::PanelDuration,
            ]
        );
        // 250 px / (5 boxes * 5 mm)
        assert_eq!(candidates[0].px_per_mm, 10.0);
        assert_eq!(candidates[2].paper_speed, 25.0);
        assert_eq!(candidates[3].paper_speed, 50.0);
        // 250 px / (2.5 s * 25 mm/s)
        assert_eq!(candidates[4].px_per_mm, 4.0);
    }

    #[test]
    fn test_grid_count_outside_bounds_is_dropped() {
        let traces = vec![flat_trace(Lead::II, 250)];
        let grid = GridAnalysis {
            large_boxes_per_panel: Some(100.0),
            ..GridAnalysis::default()
        };
        let candidates = generate_candidates(&traces, &grid, &CalibrationAnalysis::default());
        assert!(candidates
            .iter()
            .all(|c| c.method != CalibrationMethod::GridBoxCount));
    }

    #[test]
    fn test_insane_direct_estimate_is_dropped() {
        let grid = GridAnalysis {
            px_per_mm: Some(-3.0),
            ..GridAnalysis::default()
        };
        assert!(generate_candidates(&[], &grid, &CalibrationAnalysis::default()).is_empty());
    }
}
