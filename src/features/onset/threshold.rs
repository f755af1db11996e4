//! Peak-height threshold policy for onset detection
//!
//! The minimum accepted envelope height is the largest of:
//! - a fraction of the raw waveform's own peak (scales with recording level),
//! - a fixed absolute floor (rejects background noise in very quiet takes),
//! - optionally, an adaptive noise floor `median + k * MAD` of the envelope.
//!
//! The median + MAD (Median Absolute Deviation) estimate follows McFee &
//! Ellis (2014); it is robust to the events themselves because they occupy
//! only a small share of the envelope.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// How the minimum peak height is chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    /// Fraction of the waveform's absolute peak, in [0, 1)
    pub relative_to_peak: f32,

    /// Absolute minimum height, >= 0
    pub absolute_floor: f32,

    /// When set, also require `median + k * MAD` of the smoothed envelope
    pub mad_multiplier: Option<f32>,
}

impl ThresholdPolicy {
    /// Check the policy values
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(0.0..1.0).contains(&self.relative_to_peak) {
            return Err(AnalysisError::InvalidInput(format!(
                "Relative threshold must be in [0, 1), got {}",
                self.relative_to_peak
            )));
        }
        if !(self.absolute_floor >= 0.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "Absolute threshold floor must be >= 0, got {}",
                self.absolute_floor
            )));
        }
        if self.relative_to_peak == 0.0
            && self.absolute_floor == 0.0
            && self.mad_multiplier.is_none()
        {
            return Err(AnalysisError::InvalidInput(
                "Threshold policy accepts everything; set a floor or a relative level".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the policy to an absolute envelope height
    ///
    /// # Arguments
    ///
    /// * `envelope` - Smoothed envelope the peaks will be picked from
    /// * `waveform_peak` - Absolute peak of the (down-mixed) input waveform
    pub fn resolve(&self, envelope: &[f32], waveform_peak: f32) -> Result<f32, AnalysisError> {
        let mut threshold = self.absolute_floor.max(self.relative_to_peak * waveform_peak);
        if let Some(k) = self.mad_multiplier {
            if !envelope.is_empty() {
                threshold = threshold.max(adaptive_threshold_median_mad(envelope, k)?);
            }
        }
        Ok(threshold)
    }
}

fn median_of_sorted(sorted: &[f32]) -> f32 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) * 0.5
    } else {
        sorted[mid]
    }
}

/// Compute adaptive threshold using median + MAD (Median Absolute Deviation)
///
/// Computes `threshold = median(values) + k * MAD(values)` where
/// `MAD = median(|values - median(values)|)`.
///
/// # Reference
///
/// McFee, B., & Ellis, D. P. W. (2014). Better Beat Tracking Through Robust Onset Aggregation.
/// *Proceedings of the International Society for Music Information Retrieval Conference*.
///
/// # Errors
///
/// Returns `AnalysisError` if values are empty or `k` is negative
pub fn adaptive_threshold_median_mad(values: &[f32], k: f32) -> Result<f32, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty values for threshold calculation".to_string(),
        ));
    }

    if k < 0.0 {
        return Err(AnalysisError::InvalidInput(
            "MAD multiplier k must be non-negative".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = median_of_sorted(&sorted);

    let mut deviations: Vec<f32> = values.iter().map(|&v| (v - median).abs()).collect();
    deviations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mad = median_of_sorted(&deviations);

    Ok(median + k * mad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adaptive_threshold_median_mad_basic() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 100.0]; // Outlier at 100
        let threshold = adaptive_threshold_median_mad(&values, 2.5).unwrap();

        // Median is 3.5, MAD is 1.5
        assert!((threshold - 7.25).abs() < 1e-6);
    }

    #[test]
    fn test_adaptive_threshold_median_mad_empty() {
        assert!(adaptive_threshold_median_mad(&[], 2.5).is_err());
        assert!(adaptive_threshold_median_mad(&[1.0], -1.0).is_err());
    }

    #[test]
    fn test_adaptive_threshold_median_mad_single_value() {
        let threshold = adaptive_threshold_median_mad(&[5.0], 2.5).unwrap();
        assert_eq!(threshold, 5.0); // MAD of single value is 0
    }

    #[test]
    fn test_resolve_takes_largest_component() {
        let policy = ThresholdPolicy {
            relative_to_peak: 0.1,
            absolute_floor: 0.02,
            mad_multiplier: None,
        };
        assert!((policy.resolve(&[], 0.9).unwrap() - 0.09).abs() < 1e-6);
        // quiet recording: floor wins
        assert!((policy.resolve(&[], 0.05).unwrap() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_resolve_with_noise_floor() {
        let policy = ThresholdPolicy {
            relative_to_peak: 0.0,
            absolute_floor: 0.001,
            mad_multiplier: Some(3.0),
        };
        let envelope = [0.1, 0.1, 0.2, 0.1, 0.1];
        // median 0.1, MAD 0.0
        assert!((policy.resolve(&envelope, 1.0).unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_validate_rejects_open_policy() {
        let policy = ThresholdPolicy {
            relative_to_peak: 0.0,
            absolute_floor: 0.0,
            mad_multiplier: None,
        };
        assert!(policy.validate().is_err());

        let policy = ThresholdPolicy {
            relative_to_peak: 1.5,
            absolute_floor: 0.0,
            mad_multiplier: None,
        };
        assert!(policy.validate().is_err());
    }
}
