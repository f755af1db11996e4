//! Headphone ear-check evaluation
//!
//! The participant hears the calibration tone in one ear and taps once if it
//! came from the expected side. The recording is judged with the same onset
//! detector as a trial, using a lenient profile (see
//! [`DetectionProfile::ear_check`](crate::config::DetectionProfile::ear_check)).

use super::detector::detect;
use crate::config::DetectionProfile;
use crate::error::AnalysisError;
use crate::io::Waveform;

/// True when at least one tap is found in the calibration recording
///
/// # Errors
///
/// Returns `AnalysisError` if the recording is empty or the profile is
/// invalid for the recording's sample rate
pub fn tap_detected(recording: &Waveform, profile: &DetectionProfile) -> Result<bool, AnalysisError> {
    let result = detect(recording, profile)?;
    log::debug!("Ear check: {} taps detected", result.len());
    Ok(!result.is_empty())
}
