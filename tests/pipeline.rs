//! End-to-end tests: pixel traces in, calibrated signal and annotations out


use rustyecg::{digitize, CalibrationMethod, Error, Lead, PipelineConfig, RawTrace};
use test_utils::{
    beat_times, ecg_value, grid_with_density, peaks_match, pixel_trace, r_peak_indices, standard_hint, TraceLayout,
};

/// Leads I, II and III drawn as 10 s strips at 10 px/mm, 25 mm/s, 10 mm/mV
fn limb_lead_strips() -> Vec<RawTrace> {
    let r_times = beat_times(10.0, 0.4, 0.8);
    [(Lead::I, 0.6, 150.0), (Lead::II, 1.0, 400.0), (Lead::III, 0.4, 650.0)]
        .into_iter()
        .map(|(lead, scale, baseline_y)| {
            let layout = TraceLayout {
                baseline_y,
                ..TraceLayout::default()
            };
            pixel_trace(lead, 2500, layout, |t| ecg_value(t, &r_times, scale))
        })
        .collect()
}

#[test]
fn test_digitize_limb_leads() {
    let traces = limb_lead_strips();
    let result = digitize(&traces, &grid_with_density(10.0), &standard_hint(), &PipelineConfig::default()).unwrap();

    let calibration = result.calibration;
    assert_eq!(calibration.method, CalibrationMethod::AiDirect);
    assert_eq!(calibration.px_per_mm, 10.0);
    assert_eq!(calibration.paper_speed, 25.0);
    assert_eq!(calibration.gain_mm_per_mv, 10.0);

    let signal = &result.signal;
    assert_eq!(signal.sample_rate, 500.0);
    assert_eq!(signal.leads.len(), 3);
    assert!(signal.is_aligned());
    assert!((signal.duration - 10.0).abs() < 0.01, "duration {}", signal.duration);
    assert!(signal.plausibility.plausible);

    let fiducials = &result.fiducials;
    assert_eq!(fiducials.reference_lead, Some(Lead::II));
    let expected = r_peak_indices(&beat_times(10.0, 0.4, 0.8), 500.0);
    assert!(
        peaks_match(&fiducials.global_r_peaks, &expected, 3),
        "peaks {:?}",
        fiducials.global_r_peaks
    );
    assert!((fiducials.statistics.mean_heart_rate - 75.0).abs() < 1.5);

    let lead_ii = &fiducials.leads[&Lead::II];
    assert_eq!(lead_ii.len(), expected.len());
    let middle = &lead_ii[5];
    assert!(middle.p_wave.present && middle.t_wave.present);
    assert!(fiducials.statistics.t_wave_detection_rate > 0.5);
}

#[test]
fn test_digitize_rejects_malformed_trace() {
    let mut traces = limb_lead_strips();
    traces[1].y_pixels.pop();

    let err = digitize(&traces, &grid_with_density(10.0), &standard_hint(), &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidTrace { .. }), "unexpected error {err}");
}

#[test]
fn test_digitization_serializes() {
    let traces = limb_lead_strips();
    let result = digitize(&traces, &grid_with_density(10.0), &standard_hint(), &PipelineConfig::default()).unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["calibration"]["method"], "ai_direct");
    assert_eq!(json["signal"]["leads"]["II"].as_array().unwrap().len(), result.signal.num_samples());
    assert_eq!(
        json["fiducials"]["global_r_peaks"].as_array().unwrap().len(),
        result.fiducials.global_r_peaks.len()
    );
}
