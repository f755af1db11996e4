//! Error types for the tapping analysis engine

use std::fmt;

/// Errors that can occur during stimulus generation or trial analysis
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid input parameters (empty waveform, bad configuration, ...)
    InvalidInput(String),

    /// Malformed inter-onset-interval sequence
    InvalidSequence(String),

    /// Too few marker beats were found in the recording to trust the offset
    MarkersNotDetected {
        /// Markers matched in the recording
        detected: usize,
        /// Markers present in the stimulus
        expected: usize,
        /// Minimum the configuration requires
        required: usize,
    },

    /// Audio decoding error
    DecodingError(String),

    /// Processing error during analysis
    ProcessingError(String),

    /// Numerical error (overflow, non-finite values, etc.)
    NumericalError(String),
}

impl AnalysisError {
    /// Stable snake-case reason code, suitable for failure reports
    ///
    /// # Example
    ///
    /// ```
    /// use tapsync_dsp::AnalysisError;
    ///
    /// let err = AnalysisError::MarkersNotDetected { detected: 0, expected: 6, required: 3 };
    /// assert_eq!(err.reason(), "markers_not_detected");
    /// ```
    pub fn reason(&self) -> &'static str {
        match self {
            AnalysisError::InvalidInput(_) => "invalid_input",
            AnalysisError::InvalidSequence(_) => "invalid_sequence",
            AnalysisError::MarkersNotDetected { .. } => "markers_not_detected",
            AnalysisError::DecodingError(_) => "decoding_error",
            AnalysisError::ProcessingError(_) => "processing_error",
            AnalysisError::NumericalError(_) => "numerical_error",
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::InvalidSequence(msg) => write!(f, "Invalid IOI sequence: {}", msg),
            AnalysisError::MarkersNotDetected {
                detected,
                expected,
                required,
            } => write!(
                f,
                "Markers not detected: found {} of {} (at least {} required)",
                detected, expected, required
            ),
            AnalysisError::DecodingError(msg) => write!(f, "Decoding error: {}", msg),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            AnalysisError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<hound::Error> for AnalysisError {
    fn from(err: hound::Error) -> Self {
        AnalysisError::DecodingError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_are_stable() {
        assert_eq!(
            AnalysisError::InvalidSequence("empty".to_string()).reason(),
            "invalid_sequence"
        );
        assert_eq!(
            AnalysisError::NumericalError("nan".to_string()).reason(),
            "numerical_error"
        );
    }

    #[test]
    fn test_display_markers_not_detected() {
        let err = AnalysisError::MarkersNotDetected {
            detected: 1,
            expected: 6,
            required: 3,
        };
        assert_eq!(
            err.to_string(),
            "Markers not detected: found 1 of 6 (at least 3 required)"
        );
    }
}
