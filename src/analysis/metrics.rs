//! Per-trial synchronization metrics
//!
//! Asynchrony = response - stimulus (negative = anticipation). Statistics
//! only consider matched pairs; unmatched stimuli are missing data, not
//! zero asynchrony.

use super::result::{AlignmentRecord, AnalysisResult};
use super::statistics::{consecutive_diffs, nan_mean, nan_std, percent};
use crate::stimulus::Onset;

/// Summarize an alignment record
///
/// # Arguments
///
/// * `record` - Stimulus/response correspondence of the trial
/// * `stim_onsets` - Expected stimulus onsets (used for counts and stimulus IOI)
/// * `played_mask` - Played flag per stimulus onset; the record's own flag is
///   used for entries the mask does not cover
///
/// Never fails; undefined statistics are NaN.
pub fn summarize(record: &AlignmentRecord, stim_onsets: &[Onset], played_mask: &[bool]) -> AnalysisResult {
    if played_mask.len() != record.stimuli.len() {
        log::warn!(
            "Played mask has {} entries for {} stimuli",
            played_mask.len(),
            record.stimuli.len()
        );
    }

    let mut all = Vec::with_capacity(record.stimuli.len());
    let mut played = Vec::new();
    let mut not_played = Vec::new();
    let mut response_times = Vec::with_capacity(record.stimuli.len());

    for (i, stimulus) in record.stimuli.iter().enumerate() {
        let asynchrony = stimulus.asynchrony_ms().unwrap_or(f64::NAN);
        all.push(asynchrony);
        if played_mask.get(i).copied().unwrap_or(stimulus.is_played) {
            played.push(asynchrony);
        } else {
            not_played.push(asynchrony);
        }
        response_times.push(stimulus.response_ms.unwrap_or(f64::NAN));
    }

    let count_matched = |values: &[f64]| values.iter().filter(|v| v.is_finite()).count();
    let aligned_responses = count_matched(&all);
    let total_stimuli = stim_onsets.len();
    let total_responses = record.responses.len();

    let stim_times: Vec<f64> = stim_onsets.iter().map(|o| o.time_ms).collect();

    let (num_markers, markers_detected, marker_status, max_marker_error_ms) = match &record.markers {
        Some(m) => (m.expected, m.found, m.status, m.max_difference_ms),
        None => (0, 0, f64::NAN, f64::NAN),
    };

    let result = AnalysisResult {
        total_stimuli,
        detected_stimuli: record.detected_stimulus_count(),
        total_responses,
        aligned_responses,
        mean_asynchrony_ms: nan_mean(&all),
        sd_asynchrony_ms: nan_std(&all),
        mean_asynchrony_played_ms: nan_mean(&played),
        sd_asynchrony_played_ms: nan_std(&played),
        mean_asynchrony_not_played_ms: nan_mean(&not_played),
        sd_asynchrony_not_played_ms: nan_std(&not_played),
        percent_responses: percent(total_responses, total_stimuli),
        percent_responses_aligned: percent(aligned_responses, total_stimuli),
        percent_responses_aligned_played: percent(count_matched(&played), played.len()),
        percent_responses_aligned_not_played: percent(count_matched(&not_played), not_played.len()),
        percent_bad_taps: percent(record.bad_response_count(), total_responses),
        mean_stimulus_ioi_ms: nan_mean(&consecutive_diffs(&stim_times)),
        mean_response_ioi_ms: nan_mean(&consecutive_diffs(&response_times)),
        num_markers,
        markers_detected,
        marker_status,
        max_marker_error_ms,
    };

    log::debug!(
        "Summary: {}/{} aligned, mean asynchrony {:.2} ms (sd {:.2}), {:.1}% bad taps",
        result.aligned_responses,
        result.total_stimuli,
        result.mean_asynchrony_ms,
        result.sd_asynchrony_ms,
        result.percent_bad_taps
    );

    result
}
