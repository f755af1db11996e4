//! Stimulus construction
//!
//! A trial stimulus is a rhythm (one tone per IOI entry) framed by marker
//! beats before and after it. All onset times here are in **rhythm time**:
//! milliseconds relative to the first rhythm beat, so the first stimulus
//! onset is always 0 and leading markers are negative. The offset between
//! rhythm time and waveform time is [`StimulusInfo::rhythm_start_ms`].

pub mod ear_check;
pub mod generator;
pub mod tone;

pub use crate::preprocessing::channel_mixer::Ear;
pub use generator::{build, build_with_mask};

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::io::Waveform;

/// What produced an onset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnsetRole {
    /// Reference beat before or after the rhythm
    Marker,
    /// Rhythm beat
    Stimulus,
    /// Participant tap
    Response,
}

/// A tagged point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Onset {
    /// Time in ms
    pub time_ms: f64,
    /// Role of the event
    pub role: OnsetRole,
    /// Position within its own sequence (markers: leading then trailing)
    pub index: usize,
    /// False for rhythm positions that were intentionally left silent
    pub is_played: bool,
}

/// Validated inter-onset-interval sequence in ms
///
/// The first interval is 0 (it defines the start of the rhythm); every later
/// interval is finite and strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct IoiSequence(Vec<f64>);

impl IoiSequence {
    /// Validate an IOI sequence
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidSequence` if the sequence is empty,
    /// does not start at 0, or holds non-finite, negative or zero intervals
    /// after the first
    pub fn new(intervals: Vec<f64>) -> Result<Self, AnalysisError> {
        let first = match intervals.first() {
            Some(&first) => first,
            None => {
                return Err(AnalysisError::InvalidSequence(
                    "IOI sequence is empty".to_string(),
                ))
            }
        };
        if first != 0.0 {
            return Err(AnalysisError::InvalidSequence(format!(
                "First IOI must be 0, got {}",
                first
            )));
        }
        if let Some((i, &ioi)) = intervals
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, &ioi)| !(ioi.is_finite() && ioi > 0.0))
        {
            return Err(AnalysisError::InvalidSequence(format!(
                "IOI {} must be finite and > 0 ms, got {}",
                i, ioi
            )));
        }
        Ok(Self(intervals))
    }

    /// Intervals in ms
    pub fn intervals(&self) -> &[f64] {
        &self.0
    }

    /// Number of rhythm onsets
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a valid sequence has at least one onset
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cumulative onset times in rhythm time (first is 0)
    pub fn onset_times_ms(&self) -> Vec<f64> {
        self.0
            .iter()
            .scan(0.0, |acc, &ioi| {
                *acc += ioi;
                Some(*acc)
            })
            .collect()
    }
}

impl TryFrom<Vec<f64>> for IoiSequence {
    type Error = AnalysisError;

    fn try_from(intervals: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(intervals)
    }
}

impl From<IoiSequence> for Vec<f64> {
    fn from(sequence: IoiSequence) -> Self {
        sequence.0
    }
}

/// Known timing of a generated stimulus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusInfo {
    /// Sample rate the stimulus was generated at
    pub sample_rate: u32,
    /// Rhythm onsets in rhythm time, strictly increasing, first at 0
    pub stim_onsets: Vec<Onset>,
    /// Leading then trailing markers in rhythm time
    pub markers: Vec<Onset>,
    /// Waveform time of rhythm time 0, in ms
    pub rhythm_start_ms: f64,
    /// Total stimulus duration in ms
    pub duration_ms: f64,
}

impl StimulusInfo {
    /// Rhythm onset times in ms
    pub fn stim_times_ms(&self) -> Vec<f64> {
        self.stim_onsets.iter().map(|o| o.time_ms).collect()
    }

    /// Marker times in ms (rhythm time)
    pub fn marker_times_ms(&self) -> Vec<f64> {
        self.markers.iter().map(|o| o.time_ms).collect()
    }

    /// Played flag of each rhythm onset
    pub fn played_mask(&self) -> Vec<bool> {
        self.stim_onsets.iter().map(|o| o.is_played).collect()
    }
}

/// Generated stimulus audio plus its known timing
#[derive(Debug, Clone)]
pub struct Stimulus {
    /// Mono stimulus audio
    pub waveform: Waveform,
    /// Onset times of every beat and marker
    pub info: StimulusInfo,
}
