//! Stimulus/response matching
//!
//! Greedy, one-to-one, nearest-first: expected onsets are visited in time
//! order and each claims the closest still-unclaimed detected onset if it is
//! within tolerance. Equal distances go to the earlier detected onset.
//!
//! This is not a globally optimal assignment. With a tolerance that is
//! narrow relative to the inter-onset spacing the two agree; when taps
//! drift by half an interval or more, an early stimulus can claim a tap an
//! optimal matcher would have given to its neighbour.

use crate::analysis::result::{AlignmentRecord, ResponseOutcome, ResponseStatus, StimulusOutcome};
use crate::stimulus::Onset;

/// Pair expected onsets with detected onsets
///
/// # Arguments
///
/// * `expected` - Expected times in ms, in time order
/// * `detected` - Detected times in ms, in time order
/// * `tolerance_ms` - Maximum |detected - expected| of a pair
///
/// # Returns
///
/// For each expected onset, the index of its detected onset (or `None`).
/// No detected index appears twice.
pub fn match_onsets(expected: &[f64], detected: &[f64], tolerance_ms: f64) -> Vec<Option<usize>> {
    let mut claimed = vec![false; detected.len()];

    expected
        .iter()
        .map(|&e| {
            let mut best: Option<(usize, f64)> = None;
            for (j, &d) in detected.iter().enumerate() {
                if claimed[j] || !d.is_finite() {
                    continue;
                }
                let diff = (d - e).abs();
                let better = match best {
                    None => true,
                    Some((k, best_diff)) => {
                        diff < best_diff || (diff == best_diff && d < detected[k])
                    }
                };
                if better {
                    best = Some((j, diff));
                }
            }
            match best {
                Some((j, diff)) if diff <= tolerance_ms => {
                    claimed[j] = true;
                    Some(j)
                }
                _ => None,
            }
        })
        .collect()
}

/// Build the alignment record of one trial
///
/// # Arguments
///
/// * `stim_onsets` - Expected stimulus onsets, already in the responses' clock
/// * `responses` - Detected response times in ms, in time order
/// * `tolerance_ms` - Maximum |response - stimulus| of a matched pair
///
/// Unmatched responses within `[first stimulus - tolerance, last stimulus +
/// tolerance]` are [`ResponseStatus::OutOfTolerance`]; the rest are
/// [`ResponseStatus::Spurious`]. No responses simply leaves every stimulus
/// unmatched.
pub fn match_responses(stim_onsets: &[Onset], responses: &[f64], tolerance_ms: f64) -> AlignmentRecord {
    let expected: Vec<f64> = stim_onsets.iter().map(|o| o.time_ms).collect();
    let pairs = match_onsets(&expected, responses, tolerance_ms);

    let mut paired_with: Vec<Option<usize>> = vec![None; responses.len()];
    let stimuli: Vec<StimulusOutcome> = stim_onsets
        .iter()
        .zip(&pairs)
        .enumerate()
        .map(|(i, (onset, pair))| {
            if let Some(j) = *pair {
                paired_with[j] = Some(i);
            }
            StimulusOutcome {
                index: onset.index,
                expected_ms: onset.time_ms,
                is_played: onset.is_played,
                response_ms: pair.map(|j| responses[j]),
                response_index: *pair,
                detected_ms: None,
            }
        })
        .collect();

    let span = match (expected.first(), expected.last()) {
        (Some(&first), Some(&last)) => Some((first - tolerance_ms, last + tolerance_ms)),
        _ => None,
    };
    let responses: Vec<ResponseOutcome> = responses
        .iter()
        .zip(&paired_with)
        .enumerate()
        .map(|(index, (&time_ms, paired))| {
            let status = match (paired, span) {
                (Some(i), _) => ResponseStatus::Aligned {
                    stimulus_index: stim_onsets[*i].index,
                },
                (None, Some((start, end))) if time_ms >= start && time_ms <= end => {
                    ResponseStatus::OutOfTolerance
                }
                (None, _) => ResponseStatus::Spurious,
            };
            ResponseOutcome {
                index,
                time_ms,
                status,
            }
        })
        .collect();

    let record = AlignmentRecord {
        stimuli,
        responses,
        tolerance_ms,
        markers: None,
    };

    log::debug!(
        "Matched {} of {} stimuli with {} responses ({} bad) at tolerance {:.1} ms",
        record.matched_count(),
        record.stimuli.len(),
        record.responses.len(),
        record.bad_response_count(),
        tolerance_ms
    );

    record
}

/// Attach detected beat-tone times to the stimuli of a record
///
/// Returns the number of stimuli that received a detected time.
pub fn attach_detected_stimuli(record: &mut AlignmentRecord, detected_ms: &[f64], tolerance_ms: f64) -> usize {
    let expected: Vec<f64> = record.stimuli.iter().map(|s| s.expected_ms).collect();
    let pairs = match_onsets(&expected, detected_ms, tolerance_ms);
    let mut attached = 0;
    for (stimulus, pair) in record.stimuli.iter_mut().zip(pairs) {
        stimulus.detected_ms = pair.map(|j| detected_ms[j]);
        if pair.is_some() {
            attached += 1;
        }
    }
    attached
}
