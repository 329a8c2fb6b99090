///! Pixel to physical unit conversion with column time alignment
///!
///! Leads printed in the same panel column were recorded simultaneously, so their time axes
///! share one origin: the smallest x pixel of any panel trace in that column. Converting each
///! trace against its own left edge would shift simultaneous events apart by however much the
///! digitizer clipped each panel. Rhythm strips span the page and are left out of the column
///! minimum; they start at the column 0 origin instead.

use std::cmp::Ordering;

use crate::calibration::{panel_widths, ResolvedCalibration};
use crate::lead::NUM_COLUMNS;
use crate::trace::RawTrace;

/// Flags the traces wider than the rhythm-strip ratio of the median width
pub fn rhythm_strip_flags(traces: &[RawTrace]) -> Vec<bool> {
    match panel_widths(traces) {
        Some(widths) => traces
            .iter()
            .map(|t| !t.is_empty() && widths.is_rhythm_strip(t.width()))
            .collect(),
        None => vec![false; traces.len()],
    }
}

/// Smallest x pixel of any panel trace per column (`None` for empty columns)
pub fn column_min_x(traces: &[RawTrace]) -> [Option<f64>; NUM_COLUMNS] {
    let strips = rhythm_strip_flags(traces);
    let mut mins = [None; NUM_COLUMNS];
    for (trace, _) in traces
        .iter()
        .zip(strips.iter())
        .filter(|(t, strip)| !**strip && !t.is_empty())
    {
        let col = trace.lead.column();
        let x = trace.min_x();
        mins[col] = Some(match mins[col] {
            Some(m) if m <= x => m,
            _ => x,
        });
    }
    mins
}

/// Time origin of the rhythm strips: the column 0 origin, else the leftmost strip
pub fn strip_origin(traces: &[RawTrace], column_origins: &[Option<f64>; NUM_COLUMNS]) -> Option<f64> {
    column_origins[0].or_else(|| {
        traces
            .iter()
            .zip(rhythm_strip_flags(traces))
            .filter(|(t, strip)| *strip && !t.is_empty())
            .map(|(t, _)| t.min_x())
            .reduce(f64::min)
    })
}

/// Irregular (time s, voltage µV) series of one lead
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadSeries {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
    /// Points dropped for falling in a gap or under the confidence floor
    pub masked: usize,
}

/// Convert all traces of one lead into a single time series
///
/// Traces are concatenated left to right. The first starts at the column origin; each later
/// segment (a rhythm-strip continuation) starts one pixel period after the previous
/// segment's last sample.
///
/// # Arguments
/// * `traces` - Traces of a single lead, in any order
/// * `column_origin` - Shared minimum x of the lead's column
/// * `calibration` - Resolved pixel density, paper speed and gain
/// * `min_confidence` - Points below this confidence are dropped
pub fn lead_series(
    traces: &[&RawTrace],
    column_origin: f64,
    calibration: &ResolvedCalibration,
    min_confidence: f64,
) -> LeadSeries {
    let px_per_s = calibration.px_per_second();
    let px_per_mv = calibration.px_per_millivolt();
    let pixel_period = 1.0 / px_per_s;

    let mut ordered: Vec<&RawTrace> = traces.iter().copied().filter(|t| !t.is_empty()).collect();
    ordered.sort_by(|a, b| a.min_x().partial_cmp(&b.min_x()).unwrap_or(Ordering::Equal));

    let mut series = LeadSeries::default();
    let mut segment_start_time = 0.0;
    for (k, trace) in ordered.iter().enumerate() {
        let origin = if k == 0 { column_origin } else { trace.min_x() };

        let mut points: Vec<(f64, f64)> = Vec::with_capacity(trace.len());
        for (i, (&x, &y)) in trace.x_pixels.iter().zip(trace.y_pixels.iter()).enumerate() {
            if trace.in_gap(x) || trace.confidence_at(i) < min_confidence {
                series.masked += 1;
                continue;
            }
            let t = segment_start_time + (x - origin) / px_per_s;
            let uv = (trace.baseline_y - y) * 1000.0 / px_per_mv;
            points.push((t, uv));
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        segment_start_time = segment_start_time + (trace.max_x() - origin) / px_per_s + pixel_period;
        for (t, v) in points {
            series.times.push(t);
            series.values.push(v);
        }
    }
    series
}
