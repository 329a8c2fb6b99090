//! Calibrated multi-lead ECG signal
//!
//! Every lead holds the same number of samples and sample `i` of every lead refers to the
//! same physical instant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lead::Lead;

/// Result of the post-reconstruction heart-rate sanity check
///
/// Implausible results are flagged, never rejected; downstream consumers decide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalPlausibility {
    /// Heart rate estimated from the reference lead, if at least two beats were seen
    pub estimated_heart_rate: Option<f64>,
    pub plausible: bool,
}

impl Default for SignalPlausibility {
    fn default() -> Self {
        Self {
            estimated_heart_rate: None,
            plausible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgSignal {
    /// Samples per second
    pub sample_rate: f64,
    /// Seconds; `round(duration * sample_rate)` equals every lead's length
    pub duration: f64,
    /// Microvolts per lead
    pub leads: BTreeMap<Lead, Vec<f64>>,
    pub plausibility: SignalPlausibility,
}

impl EcgSignal {
    /// Samples per lead
    pub fn num_samples(&self) -> usize {
        self.leads.values().next().map_or(0, |v| v.len())
    }

    pub fn lead(&self, lead: Lead) -> Option<&[f64]> {
        self.leads.get(&lead).map(|v| v.as_slice())
    }

    /// Time in seconds of sample `index`
    pub fn time_of(&self, index: usize) -> f64 {
        index as f64 / self.sample_rate
    }

    /// Whether all leads share one length matching the duration
    pub fn is_aligned(&self) -> bool {
        let expected = (self.duration * self.sample_rate).round() as usize;
        self.leads.values().all(|v| v.len() == expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_check() {
        let mut leads = BTreeMap::new();
        leads.insert(Lead::I, vec![0.0; 500]);
        leads.insert(Lead::II, vec![0.0; 500]);
        let mut signal = EcgSignal {
            sample_rate: 500.0,
            duration: 1.0,
            leads,
            plausibility: SignalPlausibility::default(),
        };
        assert!(signal.is_aligned());
        assert_eq!(signal.num_samples(), 500);
        assert_eq!(signal.time_of(250), 0.5);

        signal.leads.insert(Lead::III, vec![0.0; 499]);
        assert!(!signal.is_aligned());
    }
}
