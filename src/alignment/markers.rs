//! Marker-beat alignment
//!
//! Finds the known marker pattern among the onsets detected in a recording
//! and derives the mapping from rhythm time to recording time.
//!
//! # Algorithm
//!
//! 1. Hypothesise that leading marker `j` is detected onset `c`, for every
//!    leading marker and each of the first `search_candidates` detections
//!    (the recording should start close to a marker), then the same for the
//!    trailing markers against the last `search_candidates` detections
//! 2. Shift the whole expected pattern by `d[c] - e[j]` and count how many
//!    markers find a detected onset within `tolerance_ms` (one-to-one)
//! 3. Keep the hypothesis with the most matches; the earliest wins ties
//! 4. Offset = first matched detected marker - its expected time; with two
//!    or more matches spanning the rhythm, the slope between the first and
//!    last matched markers gives the clock ratio
//!
//! Leading and trailing markers share the same spacing, so a match confined
//! to one group fits equally well with the groups swapped. When the pattern
//! repeats like this, a hypothesis is only accepted if it matches markers
//! from both groups.

use serde::{Deserialize, Serialize};

use super::matcher::match_onsets;
use crate::config::MarkerConfig;
use crate::error::AnalysisError;

/// Recording-clock reference derived from the markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerAlignment {
    /// Recording time of rhythm time 0, in ms
    pub offset_ms: f64,

    /// Recording/playback clock ratio applied by [`to_recording_time`](Self::to_recording_time)
    /// (1.0 unless drift compensation is enabled)
    pub clock_ratio: f64,

    /// Estimated clock drift in parts per million (0.0 if it cannot be
    /// estimated from fewer than two markers)
    pub drift_ppm: f64,

    /// Detected time of each expected marker, `None` where not found
    pub matched_ms: Vec<Option<f64>>,

    /// Markers expected
    pub expected: usize,

    /// Markers found
    pub found: usize,

    /// Fraction of expected markers found (0.0-1.0)
    pub status: f64,

    /// Largest |detected - mapped expected| among found markers, in ms
    pub max_difference_ms: f64,
}

impl MarkerAlignment {
    /// Map a rhythm-time value to recording time
    pub fn to_recording_time(&self, rhythm_ms: f64) -> f64 {
        self.offset_ms + rhythm_ms * self.clock_ratio
    }

    /// Detected onsets not claimed as markers, in their original order
    pub fn unclaimed(&self, detected_ms: &[f64]) -> Vec<f64> {
        detected_ms
            .iter()
            .copied()
            .filter(|&t| !self.matched_ms.contains(&Some(t)))
            .collect()
    }
}

/// Locate the marker pattern in a list of detected onsets
///
/// # Arguments
///
/// * `detected_ms` - Detected onset times in recording time, in time order
/// * `expected_ms` - Expected marker times in rhythm time, leading markers first
/// * `config` - Marker count, tolerance and search parameters
///
/// # Errors
///
/// Returns `AnalysisError::MarkersNotDetected` if fewer than
/// `config.min_detected` markers are found; the trial should be treated as
/// failed rather than aligned with an unreliable offset.
pub fn locate_markers(
    detected_ms: &[f64],
    expected_ms: &[f64],
    config: &MarkerConfig,
) -> Result<MarkerAlignment, AnalysisError> {
    if expected_ms.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Marker pattern is empty".to_string(),
        ));
    }

    log::debug!(
        "Locating {} markers among {} detected onsets (tolerance {:.1} ms)",
        expected_ms.len(),
        detected_ms.len(),
        config.tolerance_ms
    );

    let anchors = config.count.clamp(1, expected_ms.len());
    let candidates = config.search_candidates.min(detected_ms.len());
    let (leading, trailing) = expected_ms.split_at(anchors);
    let repeated = is_repeated(leading, trailing);

    let hypotheses = leading
        .iter()
        .flat_map(move |&anchor| detected_ms[..candidates].iter().map(move |&d| d - anchor))
        .chain(trailing.iter().flat_map(move |&anchor| {
            detected_ms[detected_ms.len() - candidates..]
                .iter()
                .map(move |&d| d - anchor)
        }));

    let mut best: Option<(usize, Vec<Option<usize>>)> = None;
    let mut one_sided = 0;
    for shift in hypotheses {
        let shifted: Vec<f64> = expected_ms.iter().map(|&e| e + shift).collect();
        let pairs = match_onsets(&shifted, detected_ms, config.tolerance_ms);
        let found = pairs.iter().filter(|p| p.is_some()).count();
        if repeated && !spans_both_groups(&pairs, anchors) {
            one_sided = one_sided.max(found);
            continue;
        }
        if best.as_ref().map_or(true, |(best_found, _)| found > *best_found) {
            best = Some((found, pairs));
            if found == expected_ms.len() {
                break;
            }
        }
    }

    let (found, pairs) = best.unwrap_or((0, vec![None; expected_ms.len()]));
    if one_sided > found {
        log::warn!(
            "{} markers matched within one marker group only; their position is ambiguous",
            one_sided
        );
    }
    if found == 0 || found < config.min_detected {
        log::warn!(
            "Markers not detected: found {} of {} (at least {} required)",
            found,
            expected_ms.len(),
            config.min_detected
        );
        return Err(AnalysisError::MarkersNotDetected {
            detected: found,
            expected: expected_ms.len(),
            required: config.min_detected,
        });
    }

    let matched: Vec<(f64, f64)> = pairs
        .iter()
        .zip(expected_ms)
        .filter_map(|(pair, &e)| pair.map(|j| (e, detected_ms[j])))
        .collect();
    let (first_expected, first_detected) = matched[0];
    let (last_expected, last_detected) = matched[found - 1];

    let measured_ratio = if matched.len() >= 2 && last_expected > first_expected {
        (last_detected - first_detected) / (last_expected - first_expected)
    } else {
        1.0
    };
    let drift_ppm = (measured_ratio - 1.0) * 1e6;
    let clock_ratio = if config.compensate_drift {
        measured_ratio
    } else {
        1.0
    };
    let offset_ms = first_detected - first_expected * clock_ratio;

    let mut alignment = MarkerAlignment {
        offset_ms,
        clock_ratio,
        drift_ppm,
        matched_ms: pairs.iter().map(|p| p.map(|j| detected_ms[j])).collect(),
        expected: expected_ms.len(),
        found,
        status: found as f64 / expected_ms.len() as f64,
        max_difference_ms: 0.0,
    };
    alignment.max_difference_ms = matched
        .iter()
        .map(|&(e, d)| (d - alignment.to_recording_time(e)).abs())
        .fold(0.0, f64::max);

    log::debug!(
        "Markers: {}/{} found, offset {:.3} ms, drift {:.1} ppm, max difference {:.3} ms",
        alignment.found,
        alignment.expected,
        alignment.offset_ms,
        alignment.drift_ppm,
        alignment.max_difference_ms
    );

    Ok(alignment)
}

/// Whether the trailing group repeats the leading group's spacing
fn is_repeated(leading: &[f64], trailing: &[f64]) -> bool {
    leading.len() == trailing.len()
        && !leading.is_empty()
        && leading
            .iter()
            .zip(trailing)
            .all(|(&l, &t)| ((t - trailing[0]) - (l - leading[0])).abs() < 1e-6)
}

fn spans_both_groups(pairs: &[Option<usize>], split: usize) -> bool {
    let (leading, trailing) = pairs.split_at(split);
    leading.iter().any(Option::is_some) && trailing.iter().any(Option::is_some)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATTERN: [f64; 6] = [-1560.0, -1280.0, -1000.0, 2000.0, 2280.0, 2560.0];

    fn shifted(offset: f64) -> Vec<f64> {
        PATTERN.iter().map(|&e| e + offset).collect()
    }

    #[test]
    fn test_exact_pattern() {
        let detected = shifted(2060.0);
        let alignment = locate_markers(&detected, &PATTERN, &MarkerConfig::default()).unwrap();
        assert!((alignment.offset_ms - 2060.0).abs() < 1e-9);
        assert_eq!(alignment.found, 6);
        assert_eq!(alignment.status, 1.0);
        assert!(alignment.max_difference_ms < 1e-9);
        assert!(alignment.drift_ppm.abs() < 1e-6);
    }

    #[test]
    fn test_extra_onsets_before_markers() {
        // a click and a tone-like blip before the markers start
        let mut detected = vec![120.0, 300.0];
        detected.extend(shifted(2060.0));
        detected.insert(5, 2060.0); // a beat between the marker groups
        detected.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let alignment = locate_markers(&detected, &PATTERN, &MarkerConfig::default()).unwrap();
        assert!((alignment.offset_ms - 2060.0).abs() < 1e-9);
        assert_eq!(alignment.found, 6);
    }

    #[test]
    fn test_missing_first_marker() {
        let detected: Vec<f64> = shifted(1500.0).into_iter().skip(1).collect();
        let alignment = locate_markers(&detected, &PATTERN, &MarkerConfig::default()).unwrap();
        assert_eq!(alignment.found, 5);
        assert!((alignment.status - 5.0 / 6.0).abs() < 1e-12);
        assert_eq!(alignment.matched_ms[0], None);
        // offset is taken from the first matched marker
        assert!((alignment.offset_ms - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_jitter_within_tolerance() {
        let mut detected = shifted(2000.0);
        detected[1] += 4.0;
        detected[4] -= 6.0;
        let alignment = locate_markers(&detected, &PATTERN, &MarkerConfig::default()).unwrap();
        assert_eq!(alignment.found, 6);
        assert!((alignment.max_difference_ms - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_markers_fails() {
        let detected = vec![500.0, 4000.0];
        let err = locate_markers(&detected, &PATTERN, &MarkerConfig::default()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MarkersNotDetected {
                detected: 0,
                expected: 6,
                required: 3
            }
        );
        assert_eq!(err.reason(), "markers_not_detected");
    }

    #[test]
    fn test_no_onsets_fails() {
        let err = locate_markers(&[], &PATTERN, &MarkerConfig::default()).unwrap_err();
        assert_eq!(err.reason(), "markers_not_detected");
    }

    #[test]
    fn test_drift_estimate_and_compensation() {
        // recording clock runs 100 ppm fast
        let ratio = 1.0001;
        let detected: Vec<f64> = PATTERN.iter().map(|&e| 2060.0 + e * ratio).collect();

        let alignment = locate_markers(&detected, &PATTERN, &MarkerConfig::default()).unwrap();
        assert!((alignment.drift_ppm - 100.0).abs() < 1e-3);
        assert_eq!(alignment.clock_ratio, 1.0);

        let config = MarkerConfig {
            compensate_drift: true,
            ..MarkerConfig::default()
        };
        let alignment = locate_markers(&detected, &PATTERN, &config).unwrap();
        assert!((alignment.clock_ratio - ratio).abs() < 1e-9);
        assert!((alignment.to_recording_time(1000.0) - (2060.0 + 1000.0 * ratio)).abs() < 1e-6);
        assert!(alignment.max_difference_ms < 1e-6);
    }

    #[test]
    fn test_single_group_is_ambiguous() {
        // Leading markers lost: the trailing group alone fits the leading
        // positions just as well, so no offset can be trusted
        let detected: Vec<f64> = shifted(2060.0).into_iter().skip(3).collect();
        let err = locate_markers(&detected, &PATTERN, &MarkerConfig::default()).unwrap_err();
        assert_eq!(err.reason(), "markers_not_detected");

        let detected: Vec<f64> = shifted(2060.0).into_iter().take(3).collect();
        let err = locate_markers(&detected, &PATTERN, &MarkerConfig::default()).unwrap_err();
        assert_eq!(err.reason(), "markers_not_detected");
    }

    #[test]
    fn test_one_marker_per_group_is_enough_to_anchor() {
        let all = shifted(2060.0);
        let detected = vec![all[0], all[1], all[5]];
        let alignment = locate_markers(&detected, &PATTERN, &MarkerConfig::default()).unwrap();
        assert_eq!(alignment.found, 3);
        assert!((alignment.offset_ms - 2060.0).abs() < 1e-9);
    }

    #[test]
    fn test_trailing_markers_anchor_after_early_noise() {
        // more spurious onsets than search candidates before the markers
        let mut detected = vec![10.0, 40.0, 70.0, 100.0, 130.0, 160.0];
        detected.extend(shifted(3000.0));
        let alignment = locate_markers(&detected, &PATTERN, &MarkerConfig::default()).unwrap();
        assert_eq!(alignment.found, 6);
        assert!((alignment.offset_ms - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_minimum_without_matches_fails() {
        let config = MarkerConfig {
            min_detected: 0,
            ..MarkerConfig::default()
        };
        let err = locate_markers(&[], &[-1000.0, 0.0, 280.0], &config).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MarkersNotDetected {
                detected: 0,
                expected: 3,
                required: 0
            }
        );
    }

    #[test]
    fn test_unclaimed_excludes_matched_markers() {
        let mut detected = shifted(2060.0);
        detected.insert(3, 2060.0);
        detected.insert(4, 2560.0);
        let alignment = locate_markers(&detected, &PATTERN, &MarkerConfig::default()).unwrap();
        assert_eq!(alignment.unclaimed(&detected), vec![2060.0, 2560.0]);
    }
}
