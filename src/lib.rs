//! # Tapsync DSP
//!
//! Onset detection and stimulus/response alignment for sensorimotor
//! synchronization (tapping) experiments. A participant hears a rhythm and
//! taps along; this crate builds the rhythm, then analyzes the recording to
//! recover when each beat sounded, when each tap happened, which tap belongs
//! to which beat, and how well the taps were synchronized.
//!
//! ## Features
//!
//! - **Stimulus generation**: rhythm from an IOI sequence, framed by marker beats
//! - **Onset detection**: zero-phase band limiting, Hilbert envelope, peak picking
//!   with a refractory period, one detector with per-use-case profiles
//! - **Marker alignment**: recovers the recording offset (and clock drift)
//!   from the marker pattern
//! - **Matching and metrics**: greedy one-to-one matching, NaN-aware
//!   asynchrony statistics, played/not-played splits
//!
//! ## Quick Start
//!
//! ```no_run
//! use tapsync_dsp::{analyze, generate, IoiSequence, TrialConfig};
//!
//! let config = TrialConfig::default();
//! let ioi = IoiSequence::new(vec![0.0, 500.0, 500.0, 500.0])?;
//! let stimulus = generate(&ioi, &config)?;
//!
//! // ... play `stimulus.waveform` while recording the participant ...
//! let recording = stimulus.waveform.clone();
//!
//! let analysis = analyze(&recording, &stimulus.info, &config)?;
//! println!(
//!     "Aligned: {:.1}%, mean asynchrony {:.1} ms",
//!     analysis.result.percent_responses_aligned,
//!     analysis.result.mean_asynchrony_ms
//! );
//! # Ok::<(), tapsync_dsp::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! IOI sequence → Stimulus generator → (play + record) → Onset detector
//!   → Marker aligner → Stimulus/response matcher → Metrics
//! ```
//!
//! All times are milliseconds (`f64`). Stimulus onsets are expressed in
//! rhythm time (first beat at 0); the marker aligner maps them into the
//! recording's clock.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alignment;
pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;
pub mod stimulus;

// Re-export main types
pub use analysis::result::{
    AlignmentRecord, AnalysisFlag, AnalysisResult, ResponseStatus, TrialAnalysis, TrialOutcome,
};
pub use config::{DetectionProfile, MarkerConfig, TrialConfig};
pub use error::AnalysisError;
pub use features::onset::DetectionResult;
pub use io::Waveform;
pub use stimulus::{Ear, IoiSequence, Onset, OnsetRole, Stimulus, StimulusInfo};

use alignment::markers::locate_markers;
use alignment::matcher::{attach_detected_stimuli, match_responses};
use analysis::metadata::AnalysisMetadata;
use analysis::metrics::summarize;
use features::onset::detector::detect;

/// Marker drift (in ppm) above which a trial is flagged
const CLOCK_DRIFT_WARN_PPM: f64 = 500.0;

/// Build the stimulus for one trial
///
/// # Errors
///
/// Returns `AnalysisError` if the configuration is invalid
///
/// # Example
///
/// ```
/// use tapsync_dsp::{generate, IoiSequence, TrialConfig};
///
/// let ioi = IoiSequence::new(vec![0.0, 500.0, 500.0])?;
/// let stimulus = generate(&ioi, &TrialConfig::default())?;
/// assert_eq!(stimulus.info.stim_times_ms(), vec![0.0, 500.0, 1000.0]);
/// assert_eq!(stimulus.info.markers.len(), 6);
/// # Ok::<(), tapsync_dsp::AnalysisError>(())
/// ```
pub fn generate(ioi: &IoiSequence, config: &TrialConfig) -> Result<Stimulus, AnalysisError> {
    config.validate()?;
    stimulus::build(ioi, config.sample_rate, &config.stimulus, &config.markers)
}

/// Build a stimulus in which some beats are silent
///
/// # Errors
///
/// Returns `AnalysisError` if the configuration is invalid or the mask
/// length differs from the IOI count
pub fn generate_with_mask(
    ioi: &IoiSequence,
    played: &[bool],
    config: &TrialConfig,
) -> Result<Stimulus, AnalysisError> {
    config.validate()?;
    stimulus::build_with_mask(ioi, played, config.sample_rate, &config.stimulus, &config.markers)
}

/// Analyze one trial recording
///
/// Detects tones and taps, locates the markers to re-base the expected
/// stimulus onsets into the recording's clock, matches taps to beats and
/// summarizes the result.
///
/// # Arguments
///
/// * `recording` - Complete trial recording (taps mixed with the stimulus)
/// * `info` - Timing of the stimulus that was played
/// * `config` - Trial configuration
///
/// # Returns
///
/// `TrialAnalysis` with both detector outputs, the alignment record, the
/// summary statistics and metadata. No taps is a valid outcome.
///
/// # Errors
///
/// Returns `AnalysisError::MarkersNotDetected` when too few markers are
/// found to trust the alignment, and `AnalysisError::InvalidInput` for an
/// empty recording or invalid configuration
pub fn analyze(
    recording: &Waveform,
    info: &StimulusInfo,
    config: &TrialConfig,
) -> Result<TrialAnalysis, AnalysisError> {
    use std::time::Instant;
    let start_time = Instant::now();

    log::debug!(
        "Starting trial analysis: {} frames at {} Hz, {} stimuli, {} markers",
        recording.frames(),
        recording.sample_rate(),
        info.stim_onsets.len(),
        info.markers.len()
    );

    if recording.is_empty() {
        return Err(AnalysisError::InvalidInput("Empty recording".to_string()));
    }
    config.validate()?;
    if recording.sample_rate() != info.sample_rate {
        log::debug!(
            "Recording at {} Hz, stimulus generated at {} Hz",
            recording.sample_rate(),
            info.sample_rate
        );
    }

    // Step 1: tones and markers
    let tones = detect(recording, &config.tone_detection)?;
    let tone_times = tones.times_ms();
    let markers = locate_markers(&tone_times, &info.marker_times_ms(), &config.markers)?;

    // Step 2: expectations in the recording's clock
    let expected: Vec<Onset> = info
        .stim_onsets
        .iter()
        .map(|onset| Onset {
            time_ms: markers.to_recording_time(onset.time_ms),
            ..*onset
        })
        .collect();

    // Step 3: taps and matching
    let taps = detect(recording, &config.tap_detection)?;
    let mut record = match_responses(
        &expected,
        &taps.times_ms(),
        config.matching.response_tolerance_ms,
    );
    attach_detected_stimuli(
        &mut record,
        &markers.unclaimed(&tone_times),
        config.matching.stimulus_tolerance_ms,
    );
    record.markers = Some(markers);

    // Step 4: metrics
    let result = summarize(&record, &expected, &info.played_mask());

    let mut metadata = AnalysisMetadata {
        duration_ms: recording.duration_ms(),
        sample_rate: recording.sample_rate(),
        tone_onsets_detected: tones.len(),
        tap_onsets_detected: taps.len(),
        ..AnalysisMetadata::default()
    };
    flag_quality(&record, &mut metadata);
    metadata.processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

    Ok(TrialAnalysis {
        tones,
        taps,
        record,
        result,
        metadata,
    })
}

fn flag_quality(record: &AlignmentRecord, metadata: &mut AnalysisMetadata) {
    if record.responses.is_empty() {
        metadata.flag(AnalysisFlag::NoResponses, "No taps detected in the recording");
    }
    if let Some(markers) = &record.markers {
        if markers.found < markers.expected {
            metadata.flag(
                AnalysisFlag::MarkersIncomplete,
                format!("Only {} of {} markers detected", markers.found, markers.expected),
            );
        }
        if markers.drift_ppm.abs() > CLOCK_DRIFT_WARN_PPM {
            metadata.flag(
                AnalysisFlag::ClockDrift,
                format!("Marker spacing implies {:.0} ppm clock drift", markers.drift_ppm),
            );
        }
    }
    let played = record.stimuli.iter().filter(|s| s.is_played).count();
    let heard = record
        .stimuli
        .iter()
        .filter(|s| s.is_played && s.detected_ms.is_some())
        .count();
    if heard < played {
        metadata.flag(
            AnalysisFlag::StimuliMissing,
            format!("{} of {} played beats not found in the recording", played - heard, played),
        );
    }
}

/// Analyze a trial at the trial boundary
///
/// Failures are logged with their context and returned as
/// [`TrialOutcome::Failed`] instead of an error, so a session can carry on
/// and let the caller decide whether to re-record.
pub fn run_trial(recording: &Waveform, info: &StimulusInfo, config: &TrialConfig) -> TrialOutcome {
    let result = analyze(recording, info, config);
    if let Err(err) = &result {
        log::error!(
            "Trial failed ({}): {} [{} frames at {} Hz, {} stimuli]",
            err.reason(),
            err,
            recording.frames(),
            recording.sample_rate(),
            info.stim_onsets.len()
        );
    }
    TrialOutcome::from(result)
}
