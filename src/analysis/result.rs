//! Analysis result types

use serde::{Deserialize, Serialize};

use super::metadata::AnalysisMetadata;
use crate::alignment::markers::MarkerAlignment;
use crate::error::AnalysisError;
use crate::features::onset::DetectionResult;

/// Outcome of one expected stimulus onset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusOutcome {
    /// Index within the rhythm
    pub index: usize,

    /// Expected onset time in ms (recording time once re-based)
    pub expected_ms: f64,

    /// Whether the beat was audible
    pub is_played: bool,

    /// Matched response time in ms, `None` if no tap was close enough
    pub response_ms: Option<f64>,

    /// Index of the matched response
    pub response_index: Option<usize>,

    /// Time the beat tone was actually detected in the recording, in ms
    pub detected_ms: Option<f64>,
}

impl StimulusOutcome {
    /// Signed asynchrony `response - expected` in ms (negative = anticipation)
    pub fn asynchrony_ms(&self) -> Option<f64> {
        self.response_ms.map(|r| r - self.expected_ms)
    }
}

/// Classification of a detected response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    /// Paired with exactly one stimulus onset
    Aligned {
        /// Index of the stimulus onset
        stimulus_index: usize,
    },
    /// Unpaired, but within the span of the rhythm (± tolerance)
    OutOfTolerance,
    /// Unpaired and outside the span of the rhythm
    Spurious,
}

impl ResponseStatus {
    /// Out-of-tolerance and spurious taps both count as bad taps
    pub fn is_bad(&self) -> bool {
        !matches!(self, ResponseStatus::Aligned { .. })
    }
}

/// Outcome of one detected response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseOutcome {
    /// Index within the detected responses
    pub index: usize,

    /// Response time in ms (recording time)
    pub time_ms: f64,

    /// Classification
    pub status: ResponseStatus,
}

/// Per-trial correspondence between expected stimuli and detected taps
///
/// Every matched pair satisfies `|response - expected| <= tolerance_ms`, and
/// the pairing is one-to-one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    /// One entry per expected stimulus onset, in rhythm order
    pub stimuli: Vec<StimulusOutcome>,

    /// One entry per detected response, in time order
    pub responses: Vec<ResponseOutcome>,

    /// Matching tolerance used, in ms
    pub tolerance_ms: f64,

    /// Marker alignment that re-based the expectations, if any
    pub markers: Option<MarkerAlignment>,
}

impl AlignmentRecord {
    /// Number of stimulus onsets with a matched response
    pub fn matched_count(&self) -> usize {
        self.stimuli.iter().filter(|s| s.response_ms.is_some()).count()
    }

    /// Number of responses that are out of tolerance or spurious
    pub fn bad_response_count(&self) -> usize {
        self.responses.iter().filter(|r| r.status.is_bad()).count()
    }

    /// Number of stimulus tones found in the recording
    pub fn detected_stimulus_count(&self) -> usize {
        self.stimuli.iter().filter(|s| s.detected_ms.is_some()).count()
    }

    /// Marker offset applied, in ms (0 when no marker alignment was used)
    pub fn offset_ms(&self) -> f64 {
        self.markers.as_ref().map_or(0.0, |m| m.offset_ms)
    }
}

/// Quality flags raised during analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisFlag {
    /// No taps were detected at all
    NoResponses,
    /// Some markers were not found (alignment still usable)
    MarkersIncomplete,
    /// Some played beat tones were not found in the recording
    StimuliMissing,
    /// Marker spread suggests a playback/recording clock mismatch
    ClockDrift,
}

/// Summary statistics of one trial
///
/// Times are in ms. Undefined statistics (mean of nothing, SD of fewer
/// than two values, percentages over zero counts) are NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Expected stimulus onsets
    pub total_stimuli: usize,

    /// Stimulus tones found in the recording
    pub detected_stimuli: usize,

    /// Detected responses
    pub total_responses: usize,

    /// Responses paired with a stimulus onset
    pub aligned_responses: usize,

    /// Mean asynchrony over all matched pairs
    pub mean_asynchrony_ms: f64,

    /// Sample SD of asynchrony over all matched pairs
    pub sd_asynchrony_ms: f64,

    /// Mean asynchrony over played onsets
    pub mean_asynchrony_played_ms: f64,

    /// Sample SD of asynchrony over played onsets
    pub sd_asynchrony_played_ms: f64,

    /// Mean asynchrony over silent onsets
    pub mean_asynchrony_not_played_ms: f64,

    /// Sample SD of asynchrony over silent onsets
    pub sd_asynchrony_not_played_ms: f64,

    /// Responses / stimuli × 100
    pub percent_responses: f64,

    /// Matched / stimuli × 100
    pub percent_responses_aligned: f64,

    /// Matched / played stimuli × 100
    pub percent_responses_aligned_played: f64,

    /// Matched / silent stimuli × 100
    pub percent_responses_aligned_not_played: f64,

    /// (out of tolerance + spurious) / responses × 100
    pub percent_bad_taps: f64,

    /// Mean interval between consecutive stimulus onsets
    pub mean_stimulus_ioi_ms: f64,

    /// Mean interval between consecutive matched responses
    pub mean_response_ioi_ms: f64,

    /// Expected markers
    pub num_markers: usize,

    /// Markers found
    pub markers_detected: usize,

    /// Markers found / expected (0.0-1.0)
    pub marker_status: f64,

    /// Largest deviation of a found marker from its expected position
    pub max_marker_error_ms: f64,
}

/// Everything produced by analyzing one trial recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialAnalysis {
    /// Tone detector output (markers and beats)
    pub tones: DetectionResult,

    /// Tap detector output
    pub taps: DetectionResult,

    /// Stimulus/response correspondence, including the marker alignment
    pub record: AlignmentRecord,

    /// Summary statistics
    pub result: AnalysisResult,

    /// Processing metadata
    pub metadata: AnalysisMetadata,
}

/// Trial-boundary outcome: analysis either completes or fails with a reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrialOutcome {
    /// Analysis finished
    Completed(Box<TrialAnalysis>),
    /// Analysis failed; the caller decides whether to re-record
    Failed {
        /// Stable reason code, e.g. `"markers_not_detected"`
        reason: String,
        /// Human-readable description
        message: String,
    },
}

impl TrialOutcome {
    /// True for [`TrialOutcome::Failed`]
    pub fn is_failed(&self) -> bool {
        matches!(self, TrialOutcome::Failed { .. })
    }

    /// The analysis, if the trial completed
    pub fn analysis(&self) -> Option<&TrialAnalysis> {
        match self {
            TrialOutcome::Completed(analysis) => Some(analysis.as_ref()),
            TrialOutcome::Failed { .. } => None,
        }
    }

    /// Failure reason code, if the trial failed
    pub fn reason(&self) -> Option<&str> {
        match self {
            TrialOutcome::Completed(_) => None,
            TrialOutcome::Failed { reason, .. } => Some(reason),
        }
    }
}

impl From<Result<TrialAnalysis, AnalysisError>> for TrialOutcome {
    fn from(result: Result<TrialAnalysis, AnalysisError>) -> Self {
        match result {
            Ok(analysis) => TrialOutcome::Completed(Box::new(analysis)),
            Err(err) => TrialOutcome::Failed {
                reason: err.reason().to_string(),
                message: err.to_string(),
            },
        }
    }
}
