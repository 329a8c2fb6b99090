//! Calibration resolver
//!
//! Infers the pixel density and paper speed of a scanned tracing. Upstream hints are often
//! wrong, so each is only a candidate and the candidate implying the most physiologically
//! plausible heart rate wins.
//!
//! **Module Organization**:
//! - `candidate` - candidate generation from grid counting, direct estimate, panel duration
//! - `score` - heart-rate plausibility scoring of a single candidate
//!
//! **Resolution**:
//! 1. Measure panel widths, ignoring rhythm strips
//! 2. Generate candidates at both canonical paper speeds
//! 3. Score every candidate in parallel on the reference lead
//! 4. Keep the highest score; earlier candidates win ties
//! 5. Fall back to 4 px/mm at 25 mm/s when nothing was generated

pub mod candidate;
pub mod score;

pub use candidate::{
    generate_candidates, panel_widths, CalibrationCandidate, CalibrationMethod, PanelWidths,
};
pub use score::{
    coarse_series, parse_visual_heart_rate, pick_peaks_by_time, reference_trace, score_candidate,
    score_heart_rate, simple_heart_rate, ScoredCandidate,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::trace::{CalibrationAnalysis, GridAnalysis, RawTrace};

/// Pixel density assumed when no candidate exists
pub const FALLBACK_PX_PER_MM: f64 = 4.0;

/// Paper speed assumed when no candidate exists, mm/s
pub const FALLBACK_PAPER_SPEED: f64 = 25.0;

/// Winning calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCalibration {
    pub px_per_mm: f64,
    /// mm/s
    pub paper_speed: f64,
    /// mm/mV, taken from the hint (or the 10 mm/mV standard)
    pub gain_mm_per_mv: f64,
    pub method: CalibrationMethod,
    /// Plausibility score of the winning candidate
    pub score: f64,
    /// Heart rate the winning candidate implies on the reference lead
    pub implied_heart_rate: Option<f64>,
}

impl ResolvedCalibration {
    /// Deterministic fallback constants
    pub fn fallback(gain_mm_per_mv: f64) -> Self {
        Self {
            px_per_mm: FALLBACK_PX_PER_MM,
            paper_speed: FALLBACK_PAPER_SPEED,
            gain_mm_per_mv,
            method: CalibrationMethod::Fallback,
            score: 0.0,
            implied_heart_rate: None,
        }
    }

    /// Pixels per second along the time axis
    pub fn px_per_second(&self) -> f64 {
        self.px_per_mm * self.paper_speed
    }

    /// Pixels per millivolt along the voltage axis
    pub fn px_per_millivolt(&self) -> f64 {
        self.px_per_mm * self.gain_mm_per_mv
    }
}

/// Highest-scoring candidate; the first one wins ties
pub fn select_best(scored: &[ScoredCandidate]) -> Option<ScoredCandidate> {
    scored.iter().fold(None, |best: Option<ScoredCandidate>, s| match best {
        Some(b) if b.score >= s.score => Some(b),
        _ => Some(*s),
    })
}

/// Resolve the calibration of a tracing
///
/// Structurally invalid traces are skipped here; `reconstruct` rejects them.
#[instrument(skip(traces, grid, hint), fields(num_traces = traces.len()))]
pub fn resolve(
    traces: &[RawTrace],
    grid: &GridAnalysis,
    hint: &CalibrationAnalysis,
) -> ResolvedCalibration {
    let valid: Vec<RawTrace> = traces
        .iter()
        .filter(|t| match t.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "skipping invalid trace during calibration");
                false
            }
        })
        .cloned()
        .collect();

    let gain = hint.effective_gain();
    let visual = grid
        .visual_heart_rate_estimate
        .as_deref()
        .and_then(parse_visual_heart_rate);

    let candidates = generate_candidates(&valid, grid, hint);
    let reference = reference_trace(&valid);

    // Candidates are independent; collect preserves generation order for tie breaking
    let scored: Vec<ScoredCandidate> = candidates
        .par_iter()
        .map(|c| score_candidate(c, reference, gain, visual))
        .collect();

    for s in &scored {
        debug!(
            method = s.candidate.method.as_str(),
            px_per_mm = s.candidate.px_per_mm,
            paper_speed = s.candidate.paper_speed,
            implied_hr = ?s.implied_heart_rate,
            score = s.score,
            "scored calibration candidate"
        );
    }

    match select_best(&scored) {
        Some(best) => {
            debug!(
                method = best.candidate.method.as_str(),
                px_per_mm = best.candidate.px_per_mm,
                paper_speed = best.candidate.paper_speed,
                score = best.score,
                "calibration resolved"
            );
            ResolvedCalibration {
                px_per_mm: best.candidate.px_per_mm,
                paper_speed: best.candidate.paper_speed,
                gain_mm_per_mv: gain,
                method: best.candidate.method,
                score: best.score,
                implied_heart_rate: best.implied_heart_rate,
            }
        }
        None => {
            warn!(
                px_per_mm = FALLBACK_PX_PER_MM,
                paper_speed = FALLBACK_PAPER_SPEED,
                "no calibration candidate, using fallback"
            );
            ResolvedCalibration::fallback(gain)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::Lead;
    use crate::tracing_init::init_test_tracing;

    /// 625 px panel with 3 px spikes every `period_px`, 10 px tall
    fn spiky_trace(lead: Lead, period_px: usize) -> RawTrace {
        let x: Vec<f64> = (0..=625).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..=625)
            .map(|i| {
                let phase = (i + period_px / 2) % period_px;
                match phase {
                    0 => 100.0 - 10.0,
                    1 => 100.0 - 5.0,
                    p if p == period_px - 1 => 100.0 - 5.0,
                    _ => 100.0,
                }
            })
            .collect();
        RawTrace::new(lead, x, y, 100.0)
    }

    fn scored(method: CalibrationMethod, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: CalibrationCandidate {
                px_per_mm: 10.0,
                paper_speed: 25.0,
                method,
            },
            implied_heart_rate: None,
            score,
        }
    }

    #[test]
    fn test_select_best_first_wins_ties() {
        let all = [
            scored(CalibrationMethod::GridBoxCount, 10.0),
            scored(CalibrationMethod::AiDirect, 60.0),
            scored(CalibrationMethod::PanelDuration, 60.0),
        ];
        let best = select_best(&all).unwrap();
        assert_eq!(best.candidate.method, CalibrationMethod::AiDirect);
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_resolve_prefers_plausible_rate() {
        init_test_tracing();
        // Spikes every 200 px: 0.8 s (75 bpm) at 10 px/mm and 25 mm/s
        let traces = vec![spiky_trace(Lead::II, 200), spiky_trace(Lead::V1, 200)];
        let grid = GridAnalysis {
            px_per_mm: Some(10.0),
            ..GridAnalysis::default()
        };
        let resolved = resolve(&traces, &grid, &CalibrationAnalysis::default());
        assert_eq!(resolved.method, CalibrationMethod::AiDirect);
        assert_eq!(resolved.px_per_mm, 10.0);
        assert_eq!(resolved.paper_speed, 25.0);
        let hr = resolved.implied_heart_rate.unwrap();
        assert!((hr - 75.0).abs() < 1.0, "implied {hr}");
    }

    #[test]
    fn test_resolve_without_candidates_falls_back() {
        init_test_tracing();
        let resolved = resolve(&[], &GridAnalysis::default(), &CalibrationAnalysis::default());
        assert_eq!(resolved.method, CalibrationMethod::Fallback);
        assert_eq!(resolved.px_per_mm, FALLBACK_PX_PER_MM);
        assert_eq!(resolved.paper_speed, FALLBACK_PAPER_SPEED);
        assert_eq!(resolved.gain_mm_per_mv, 10.0);
    }

    #[test]
    fn test_resolve_skips_invalid_traces() {
        init_test_tracing();
        let broken = RawTrace::new(Lead::II, vec![0.0, 1.0], vec![100.0], 100.0);
        let resolved = resolve(&[broken], &GridAnalysis::default(), &CalibrationAnalysis::default());
        assert_eq!(resolved.method, CalibrationMethod::Fallback);
    }
}
