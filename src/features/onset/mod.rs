//! Onset detection modules
//!
//! One configurable detector locates discrete acoustic events (taps, beat
//! tones, markers) in a waveform:
//! - Zero-phase Butterworth band limiting
//! - Hilbert envelope + moving-average smoothing
//! - Threshold policy
//! - Peak picking with a refractory period
//! - Ear-check calibration built on the same detector

pub mod detector;
pub mod ear_check;
pub mod envelope;
pub mod peak_picking;
pub mod threshold;

use serde::{Deserialize, Serialize};

/// One detected acoustic event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedOnset {
    /// Onset time in ms from the start of the waveform
    pub time_ms: f64,

    /// Smoothed envelope height at the peak that produced this onset
    pub amplitude: f32,
}

/// Output of the onset detector
///
/// Onset times are strictly increasing and no two are closer than the
/// refractory period of the profile that produced them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Detected onsets in time order
    pub onsets: Vec<DetectedOnset>,

    /// Absolute envelope height that peaks had to reach
    pub threshold: f32,
}

impl DetectionResult {
    /// Onset times in ms
    pub fn times_ms(&self) -> Vec<f64> {
        self.onsets.iter().map(|o| o.time_ms).collect()
    }

    /// Number of detected onsets
    pub fn len(&self) -> usize {
        self.onsets.len()
    }

    /// True when nothing crossed the threshold
    pub fn is_empty(&self) -> bool {
        self.onsets.is_empty()
    }
}
