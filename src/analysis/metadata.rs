//! Analysis metadata structures

use serde::{Deserialize, Serialize};

use super::result::AnalysisFlag;

/// Processing metadata of one trial analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Recording duration in ms
    pub duration_ms: f64,

    /// Recording sample rate in Hz
    pub sample_rate: u32,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Onsets found by the tone detector (markers and beats)
    pub tone_onsets_detected: usize,

    /// Onsets found by the tap detector
    pub tap_onsets_detected: usize,

    /// Analysis flags
    pub flags: Vec<AnalysisFlag>,

    /// Human-readable quality warnings
    pub warnings: Vec<String>,
}

impl Default for AnalysisMetadata {
    fn default() -> Self {
        Self {
            duration_ms: 0.0,
            sample_rate: 0,
            processing_time_ms: 0.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            tone_onsets_detected: 0,
            tap_onsets_detected: 0,
            flags: vec![],
            warnings: vec![],
        }
    }
}

impl AnalysisMetadata {
    /// Raise a flag together with its warning text
    pub fn flag(&mut self, flag: AnalysisFlag, warning: impl Into<String>) {
        let warning = warning.into();
        log::warn!("{}", warning);
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self.warnings.push(warning);
    }
}
