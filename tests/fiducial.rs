//! Integration tests for multi-lead fiducial detection


use std::collections::BTreeMap;

use rustyecg::fiducial::{QrsMorphology, TWaveMorphology};
use rustyecg::{EcgSignal, FiducialDetectionResult, FiducialDetector, Lead, SignalPlausibility};
use test_utils::{beat_times, peaks_match, r_peak_indices, synthetic_ecg};

const FS: f64 = 500.0;

fn signal_of(leads: &[(Lead, f64)]) -> EcgSignal {
    let r_times = beat_times(10.0, 0.4, 0.8);
    let leads: BTreeMap<Lead, Vec<f64>> = leads
        .iter()
        .map(|&(lead, scale)| (lead, synthetic_ecg(FS, 5000, &r_times, scale)))
        .collect();
    EcgSignal {
        sample_rate: FS,
        duration: 10.0,
        leads,
        plausibility: SignalPlausibility::default(),
    }
}

#[test]
fn test_detects_beats_on_preferred_reference() {
    let signal = signal_of(&[(Lead::V1, -0.5), (Lead::V5, 1.0)]);
    let result = FiducialDetector::default().detect(&signal).unwrap();

    assert_eq!(result.reference_lead, Some(Lead::V5));
    let expected = r_peak_indices(&beat_times(10.0, 0.4, 0.8), FS);
    assert!(peaks_match(&result.global_r_peaks, &expected, 2), "peaks {:?}", result.global_r_peaks);
    assert_eq!(result.duration, 10.0);
    assert_eq!(result.statistics.total_beats, 12);
    assert!((result.statistics.mean_heart_rate - 75.0).abs() < 1.0);

    // Every lead gets one annotation per global beat
    for beats in result.leads.values() {
        assert_eq!(beats.len(), 12);
        for (k, beat) in beats.iter().enumerate() {
            assert_eq!(beat.beat_index, k);
        }
    }

    let v5 = &result.leads[&Lead::V5];
    for beat in &v5[1..11] {
        assert!(beat.p_wave.present, "beat {} lost its P wave", beat.beat_index);
        assert!(beat.t_wave.present, "beat {} lost its T wave", beat.beat_index);
        assert_eq!(beat.t_wave.morphology, TWaveMorphology::Normal);
        assert!(beat.p_wave.offset.unwrap().index < beat.qrs.onset.index);
        assert!(beat.qrs.j_point.index < beat.t_wave.onset.unwrap().index);
        assert!((beat.qrs.r.index as i64 - expected[beat.beat_index] as i64).abs() <= 2);
    }

    // The negative lead locks onto its main deflection
    let v1 = &result.leads[&Lead::V1];
    assert_eq!(v1[5].qrs.morphology, QrsMorphology::Qs);
    assert!(v1[5].qrs.r.amplitude < 0.0);
}

#[test]
fn test_intervals_of_regular_rhythm() {
    let result = FiducialDetector::default().detect(&signal_of(&[(Lead::II, 1.0)])).unwrap();
    let beats = &result.leads[&Lead::II];

    assert_eq!(beats[0].rr_interval, None);
    assert_eq!(beats[0].rr_interval_next, Some(800.0));
    assert_eq!(beats[11].rr_interval_next, None);

    let middle = &beats[6];
    assert_eq!(middle.rr_interval, Some(800.0));
    let qt = middle.qt_interval.unwrap();
    let qtc = middle.qtc_interval.unwrap();
    assert!((qtc - qt / 0.8f64.sqrt()).abs() < 1e-9);
    assert!(middle.qrs_duration > 20.0 && middle.qrs_duration < 120.0);
    assert!(middle.quality > 0.5 && middle.quality <= 1.0);
}

#[test]
fn test_flat_recording_has_no_beats() {
    let signal = signal_of(&[(Lead::II, 0.0), (Lead::V2, 0.0)]);
    let result = FiducialDetector::default().detect(&signal).unwrap();

    assert!(result.global_r_peaks.is_empty());
    assert_eq!(result.leads.len(), 2);
    assert!(result.leads.values().all(Vec::is_empty));
    assert_eq!(result.statistics.total_beats, 0);
}

#[test]
fn test_detection_is_deterministic_and_serializable() {
    let signal = signal_of(&[(Lead::II, 1.0), (Lead::AVR, -0.5)]);
    let detector = FiducialDetector::default();
    let mut first = detector.detect(&signal).unwrap();
    let mut second = detector.detect(&signal).unwrap();
    first.processing_time_ms = 0.0;
    second.processing_time_ms = 0.0;
    assert_eq!(first, second);

    let json = serde_json::to_string(&first).unwrap();
    assert!(json.contains("\"aVR\""));
    let parsed: FiducialDetectionResult = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.global_r_peaks, first.global_r_peaks);
    assert_eq!(parsed.reference_lead, Some(Lead::II));
    for (lead, beats) in &first.leads {
        let restored = &parsed.leads[lead];
        assert_eq!(restored.len(), beats.len());
        for (a, b) in restored.iter().zip(beats.iter()) {
            assert_eq!(a.qrs.r.index, b.qrs.r.index);
            assert_eq!(a.qrs.morphology, b.qrs.morphology);
            assert_eq!(a.t_wave.offset.map(|p| p.index), b.t_wave.offset.map(|p| p.index));
        }
    }
}
