//! Configuration parameters for stimulus generation and trial analysis
//!
//! Every tunable the pipeline uses lives here and is passed explicitly to the
//! stage that needs it. Marker topology in particular is shared between the
//! stimulus generator and the marker aligner through [`MarkerConfig`], so both
//! always agree on how many markers there are and how they are spaced.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::features::onset::threshold::ThresholdPolicy;

/// Number of marker beats placed before and after the rhythm (default: 3)
pub const DEFAULT_MARKER_COUNT: usize = 3;

/// Tone synthesis parameters for the rhythm beats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusConfig {
    /// Carrier frequency of each beat tone in Hz (default: 1000.0)
    pub tone_frequency_hz: f32,

    /// Duration of each beat tone in ms (default: 50.0)
    pub tone_duration_ms: f64,

    /// Peak amplitude of each beat tone (default: 0.8)
    pub tone_amplitude: f32,

    /// Raised-cosine on/off ramp length in ms (default: 5.0)
    ///
    /// Tones are placed so the midpoint of the attack ramp (half amplitude)
    /// falls exactly on the nominal onset time.
    pub ramp_ms: f64,

    /// Silence before the first leading marker in ms (default: 500.0)
    pub lead_in_ms: f64,

    /// Silence after the last trailing marker tone ends in ms (default: 500.0)
    pub tail_ms: f64,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            tone_frequency_hz: 1000.0,
            tone_duration_ms: 50.0,
            tone_amplitude: 0.8,
            ramp_ms: 5.0,
            lead_in_ms: 500.0,
            tail_ms: 500.0,
        }
    }
}

/// Marker topology and marker search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Markers before the rhythm, and again after it (default: 3)
    pub count: usize,

    /// Onset-to-onset spacing between consecutive markers in ms (default: 280.0)
    pub spacing_ms: f64,

    /// Gap between the last leading marker and the first beat, and between
    /// the last beat and the first trailing marker, in ms (default: 1000.0)
    pub gap_ms: f64,

    /// Marker tone frequency in Hz (default: 1000.0)
    pub frequency_hz: f32,

    /// Marker tone duration in ms (default: 50.0)
    pub duration_ms: f64,

    /// Marker tone amplitude (default: 0.8)
    pub amplitude: f32,

    /// Maximum deviation of a detected marker from its expected position in ms (default: 20.0)
    pub tolerance_ms: f64,

    /// Minimum number of markers that must be found for the trial to be usable (default: 3)
    pub min_detected: usize,

    /// How many of the earliest detected onsets are tried as the first marker (default: 5)
    pub search_candidates: usize,

    /// Apply the estimated playback/recording clock ratio when re-basing
    /// stimulus expectations (default: false)
    pub compensate_drift: bool,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_MARKER_COUNT,
            spacing_ms: 280.0,
            gap_ms: 1000.0,
            frequency_hz: 1000.0,
            duration_ms: 50.0,
            amplitude: 0.8,
            tolerance_ms: 20.0,
            min_detected: 3,
            search_candidates: 5,
            compensate_drift: false,
        }
    }
}

/// Stimulus/response matching tolerances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Maximum |response - stimulus| for a tap to count as aligned, in ms (default: 100.0)
    pub response_tolerance_ms: f64,

    /// Maximum |detected tone - expected tone| after marker alignment, in ms (default: 20.0)
    pub stimulus_tolerance_ms: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            response_tolerance_ms: 100.0,
            stimulus_tolerance_ms: 20.0,
        }
    }
}

/// Which point of an envelope peak is reported as the onset time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OnsetTiming {
    /// The envelope maximum itself
    EnvelopePeak,
    /// The point on the rising flank where the smoothed envelope first reaches
    /// `fraction` of the peak value (sub-sample interpolated)
    RisingEdge {
        /// Fraction of the peak height, in (0, 1)
        fraction: f32,
    },
}

/// Parameters of one onset-detection use case
///
/// The same detector serves tap detection, tone/marker detection and the
/// ear-check calibration; only the profile differs.
///
/// The smoothing window trades robustness for resolution: a wider window
/// merges ripples and bounces into one peak (fewer false onsets) but blurs
/// the rising flank, so timing becomes coarser and closely spaced events can
/// merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionProfile {
    /// High-pass cutoff in Hz
    pub highpass_hz: f32,

    /// Optional low-pass cutoff in Hz (band-limits the detector)
    pub lowpass_hz: Option<f32>,

    /// Butterworth order of each filter; must be even
    pub filter_order: usize,

    /// Moving-average window applied to the envelope, in ms
    pub smoothing_ms: f64,

    /// Minimum peak height policy
    pub threshold: ThresholdPolicy,

    /// Minimum time between two accepted onsets, in ms
    pub refractory_ms: f64,

    /// Onset time estimate
    pub timing: OnsetTiming,

    /// Only accept onsets strictly inside this (start, end) window in ms
    pub window_ms: Option<(f64, f64)>,
}

impl DetectionProfile {
    /// Profile for beat and marker tones
    ///
    /// High-passed well above typical tap energy so finger taps do not register.
    pub fn tones() -> Self {
        Self {
            highpass_hz: 500.0,
            lowpass_hz: None,
            filter_order: 4,
            smoothing_ms: 10.0,
            threshold: ThresholdPolicy {
                relative_to_peak: 0.25,
                absolute_floor: 0.005,
                mad_multiplier: None,
            },
            refractory_ms: 80.0,
            timing: OnsetTiming::RisingEdge { fraction: 0.5 },
            window_ms: None,
        }
    }

    /// Profile for taps during a trial
    ///
    /// Band-limited to 30-400 Hz, which keeps the low-frequency thump of a
    /// tap and rejects the beat tones mixed into the recording. The relative
    /// threshold is taken from the raw waveform's peak, so a broadband click
    /// of a sample or two (most of its energy above the band) is rejected.
    pub fn trial_taps() -> Self {
        Self {
            highpass_hz: 30.0,
            lowpass_hz: Some(400.0),
            filter_order: 4,
            smoothing_ms: 5.0,
            threshold: ThresholdPolicy {
                relative_to_peak: 0.05,
                absolute_floor: 0.005,
                mad_multiplier: None,
            },
            refractory_ms: 100.0,
            timing: OnsetTiming::RisingEdge { fraction: 0.5 },
            window_ms: None,
        }
    }

    /// Lenient profile used by the headphone ear check
    pub fn ear_check() -> Self {
        Self {
            highpass_hz: 30.0,
            lowpass_hz: None,
            filter_order: 4,
            smoothing_ms: 50.0,
            threshold: ThresholdPolicy {
                relative_to_peak: 0.0,
                absolute_floor: 0.01,
                mad_multiplier: None,
            },
            refractory_ms: 50.0,
            timing: OnsetTiming::EnvelopePeak,
            window_ms: Some((0.0, 1000.0)),
        }
    }

    /// Check the profile against a sample rate
    pub fn validate(&self, sample_rate: u32) -> Result<(), AnalysisError> {
        let nyquist = sample_rate as f32 / 2.0;
        if !(self.highpass_hz > 0.0 && self.highpass_hz < nyquist) {
            return Err(AnalysisError::InvalidInput(format!(
                "High-pass cutoff must be in (0, {}) Hz, got {}",
                nyquist, self.highpass_hz
            )));
        }
        if let Some(lowpass) = self.lowpass_hz {
            if !(lowpass > self.highpass_hz && lowpass < nyquist) {
                return Err(AnalysisError::InvalidInput(format!(
                    "Low-pass cutoff must be in ({}, {}) Hz, got {}",
                    self.highpass_hz, nyquist, lowpass
                )));
            }
        }
        if self.filter_order == 0 || self.filter_order % 2 != 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Filter order must be even and > 0, got {}",
                self.filter_order
            )));
        }
        if !(self.smoothing_ms > 0.0) {
            return Err(AnalysisError::InvalidInput(
                "Smoothing window must be > 0 ms".to_string(),
            ));
        }
        if !(self.refractory_ms > 0.0) {
            return Err(AnalysisError::InvalidInput(
                "Refractory period must be > 0 ms".to_string(),
            ));
        }
        if let OnsetTiming::RisingEdge { fraction } = self.timing {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(AnalysisError::InvalidInput(format!(
                    "Rising-edge fraction must be in (0, 1), got {}",
                    fraction
                )));
            }
        }
        if let Some((start, end)) = self.window_ms {
            if !(end > start) {
                return Err(AnalysisError::InvalidInput(format!(
                    "Detection window end ({}) must be after start ({})",
                    end, start
                )));
            }
        }
        self.threshold.validate()
    }
}

/// Headphone ear-check calibration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarCheckConfig {
    /// Calibration tone frequency in Hz (default: 440.0)
    pub tone_frequency_hz: f32,

    /// Calibration tone duration in ms (default: 1500.0)
    pub tone_duration_ms: f64,

    /// Silence before and after the tone in ms (default: 750.0)
    pub silence_ms: f64,

    /// Tone amplitude (default: 1.0)
    pub amplitude: f32,

    /// Detector profile used on the calibration recording
    pub detection: DetectionProfile,
}

impl Default for EarCheckConfig {
    fn default() -> Self {
        Self {
            tone_frequency_hz: 440.0,
            tone_duration_ms: 1500.0,
            silence_ms: 750.0,
            amplitude: 1.0,
            detection: DetectionProfile::ear_check(),
        }
    }
}

/// Complete per-trial configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Sample rate in Hz for generated stimuli (default: 44100)
    pub sample_rate: u32,

    /// Beat tone synthesis
    pub stimulus: StimulusConfig,

    /// Marker topology and search
    pub markers: MarkerConfig,

    /// Matching tolerances
    pub matching: MatchingConfig,

    /// Detector profile for beat and marker tones
    pub tone_detection: DetectionProfile,

    /// Detector profile for taps
    pub tap_detection: DetectionProfile,

    /// Ear-check calibration
    pub ear_check: EarCheckConfig,

    /// Peak level used when combining tapping and stimulus recordings (default: 0.9)
    pub mix_target_peak: f32,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            stimulus: StimulusConfig::default(),
            markers: MarkerConfig::default(),
            matching: MatchingConfig::default(),
            tone_detection: DetectionProfile::tones(),
            tap_detection: DetectionProfile::trial_taps(),
            ear_check: EarCheckConfig::default(),
            mix_target_peak: 0.9,
        }
    }
}

impl TrialConfig {
    /// Reject configurations the pipeline cannot run with
    ///
    /// Detection profiles are checked against `sample_rate`; recordings at a
    /// different rate are re-checked when they are analyzed.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate".to_string(),
            ));
        }

        let stim = &self.stimulus;
        if !(stim.tone_duration_ms > 0.0) || !(stim.ramp_ms >= 0.0) {
            return Err(AnalysisError::InvalidInput(
                "Tone duration must be > 0 ms and ramp >= 0 ms".to_string(),
            ));
        }
        if stim.ramp_ms * 2.0 > stim.tone_duration_ms {
            return Err(AnalysisError::InvalidInput(format!(
                "On/off ramps ({} ms each) do not fit in a {} ms tone",
                stim.ramp_ms, stim.tone_duration_ms
            )));
        }
        if stim.lead_in_ms < stim.ramp_ms || stim.tail_ms < 0.0 {
            return Err(AnalysisError::InvalidInput(
                "Lead-in must cover the attack ramp and tail must be >= 0 ms".to_string(),
            ));
        }

        let markers = &self.markers;
        if markers.count == 0 {
            return Err(AnalysisError::InvalidInput(
                "Marker count must be > 0".to_string(),
            ));
        }
        if !(markers.spacing_ms > 0.0) || !(markers.gap_ms > 0.0) || !(markers.duration_ms > 0.0)
        {
            return Err(AnalysisError::InvalidInput(
                "Marker spacing, gap and duration must be > 0 ms".to_string(),
            ));
        }
        if !(markers.tolerance_ms > 0.0) {
            return Err(AnalysisError::InvalidInput(
                "Marker tolerance must be > 0 ms".to_string(),
            ));
        }
        if markers.min_detected == 0 || markers.min_detected > 2 * markers.count {
            return Err(AnalysisError::InvalidInput(format!(
                "Minimum detected markers must be in [1, {}], got {}",
                2 * markers.count,
                markers.min_detected
            )));
        }
        if markers.search_candidates == 0 {
            return Err(AnalysisError::InvalidInput(
                "Marker search needs at least one candidate".to_string(),
            ));
        }

        if !(self.matching.response_tolerance_ms > 0.0)
            || !(self.matching.stimulus_tolerance_ms > 0.0)
        {
            return Err(AnalysisError::InvalidInput(
                "Matching tolerances must be > 0 ms".to_string(),
            ));
        }
        if !(self.mix_target_peak > 0.0) {
            return Err(AnalysisError::InvalidInput(
                "Mix target peak must be > 0".to_string(),
            ));
        }

        self.tone_detection.validate(self.sample_rate)?;
        self.tap_detection.validate(self.sample_rate)?;
        self.ear_check.detection.validate(self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrialConfig::default().validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        for profile in [
            DetectionProfile::tones(),
            DetectionProfile::trial_taps(),
            DetectionProfile::ear_check(),
        ] {
            assert!(profile.validate(44100).is_ok(), "{:?}", profile);
        }
    }

    #[test]
    fn test_odd_filter_order_rejected() {
        let mut profile = DetectionProfile::trial_taps();
        profile.filter_order = 3;
        assert!(profile.validate(44100).is_err());
    }

    #[test]
    fn test_cutoff_above_nyquist_rejected() {
        let mut profile = DetectionProfile::tones();
        profile.highpass_hz = 30000.0;
        assert!(profile.validate(44100).is_err());
    }

    #[test]
    fn test_min_detected_bounds() {
        let mut config = TrialConfig::default();
        config.markers.min_detected = 0;
        assert!(config.validate().is_err());
        config.markers.min_detected = 7;
        assert!(config.validate().is_err());
        config.markers.min_detected = 6;
        assert!(config.validate().is_ok());
    }
}
