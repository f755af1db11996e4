//! Rhythm stimulus generator
//!
//! Layout of a generated stimulus (waveform time, left to right):
//!
//! ```text
//! | lead-in | M M M | gap | beat beat ... beat | gap | M M M | tail |
//! ```
//!
//! Markers are spaced `spacing_ms` apart; the gap is measured onset to
//! onset from the last leading marker to the first beat, and from the last
//! beat to the first trailing marker. The marker layout is read from
//! [`MarkerConfig`], the same value the marker aligner consumes.

use super::tone::{mix_into, synthesize_tone, Tone};
use super::{IoiSequence, Onset, OnsetRole, Stimulus, StimulusInfo};
use crate::config::{MarkerConfig, StimulusConfig};
use crate::error::AnalysisError;
use crate::io::waveform::ms_to_samples;
use crate::io::Waveform;

/// Build a stimulus in which every rhythm onset is played
///
/// # Arguments
///
/// * `ioi` - Rhythm intervals in ms
/// * `sample_rate` - Output sample rate in Hz
/// * `stimulus` - Beat tone parameters
/// * `markers` - Marker topology
///
/// # Returns
///
/// The mono waveform and onset times; `info.stim_onsets` has one entry per
/// IOI, strictly increasing, with the first at 0
///
/// # Errors
///
/// Returns `AnalysisError` if the sample rate is zero or the configuration
/// cannot be laid out
pub fn build(
    ioi: &IoiSequence,
    sample_rate: u32,
    stimulus: &StimulusConfig,
    markers: &MarkerConfig,
) -> Result<Stimulus, AnalysisError> {
    let played = vec![true; ioi.len()];
    build_with_mask(ioi, &played, sample_rate, stimulus, markers)
}

/// Build a stimulus where `played[i] == false` leaves beat `i` silent
///
/// Silent beats keep their onset time and index so analysis can still
/// compare taps against them.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the mask length differs from
/// the IOI count, plus every error [`build`] can return
pub fn build_with_mask(
    ioi: &IoiSequence,
    played: &[bool],
    sample_rate: u32,
    stimulus: &StimulusConfig,
    markers: &MarkerConfig,
) -> Result<Stimulus, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Invalid sample rate".to_string(),
        ));
    }
    if played.len() != ioi.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "Played mask has {} entries for {} onsets",
            played.len(),
            ioi.len()
        )));
    }
    if markers.count == 0 || !(markers.spacing_ms > 0.0) || !(markers.gap_ms > 0.0) {
        return Err(AnalysisError::InvalidInput(
            "Marker count, spacing and gap must be > 0".to_string(),
        ));
    }

    let stim_times = ioi.onset_times_ms();
    let last_beat = stim_times[stim_times.len() - 1];
    let marker_times = marker_layout(markers, last_beat);

    let rhythm_start_ms =
        stimulus.lead_in_ms + markers.gap_ms + (markers.count - 1) as f64 * markers.spacing_ms;
    let last_marker = marker_times[marker_times.len() - 1];
    let duration_ms = rhythm_start_ms + last_marker + markers.duration_ms + stimulus.tail_ms;

    log::debug!(
        "Building stimulus: {} beats ({} played), {} markers, rhythm starts at {:.1} ms, duration {:.1} ms",
        stim_times.len(),
        played.iter().filter(|&&p| p).count(),
        marker_times.len(),
        rhythm_start_ms,
        duration_ms
    );

    let beat_tone = Tone {
        frequency_hz: stimulus.tone_frequency_hz,
        duration_ms: stimulus.tone_duration_ms,
        amplitude: stimulus.tone_amplitude,
        ramp_ms: stimulus.ramp_ms,
    };
    let marker_tone = Tone {
        frequency_hz: markers.frequency_hz,
        duration_ms: markers.duration_ms,
        amplitude: markers.amplitude,
        ramp_ms: stimulus.ramp_ms,
    };
    let beat_samples = synthesize_tone(&beat_tone, sample_rate);
    let marker_samples = synthesize_tone(&marker_tone, sample_rate);

    let mut samples = vec![0.0f32; ms_to_samples(duration_ms, sample_rate).ceil() as usize];

    let mut place = |tone: &Tone, audio: &[f32], rhythm_ms: f64| -> Result<(), AnalysisError> {
        let start = tone
            .start_sample(rhythm_start_ms + rhythm_ms, sample_rate)
            .ok_or_else(|| {
                AnalysisError::InvalidInput(format!(
                    "Tone at {:.1} ms starts before the waveform; increase the lead-in",
                    rhythm_ms
                ))
            })?;
        mix_into(&mut samples, audio, start);
        Ok(())
    };

    for &time in &marker_times {
        place(&marker_tone, &marker_samples, time)?;
    }
    for (&time, &is_played) in stim_times.iter().zip(played) {
        if is_played {
            place(&beat_tone, &beat_samples, time)?;
        }
    }

    let stim_onsets = stim_times
        .iter()
        .zip(played)
        .enumerate()
        .map(|(index, (&time_ms, &is_played))| Onset {
            time_ms,
            role: OnsetRole::Stimulus,
            index,
            is_played,
        })
        .collect();
    let marker_onsets = marker_times
        .iter()
        .enumerate()
        .map(|(index, &time_ms)| Onset {
            time_ms,
            role: OnsetRole::Marker,
            index,
            is_played: true,
        })
        .collect();

    Ok(Stimulus {
        waveform: Waveform::mono(samples, sample_rate)?,
        info: StimulusInfo {
            sample_rate,
            stim_onsets,
            markers: marker_onsets,
            rhythm_start_ms,
            duration_ms,
        },
    })
}

/// Marker onsets in rhythm time: `count` leading markers ending `gap_ms`
/// before the first beat, then `count` trailing markers starting `gap_ms`
/// after the last beat
pub fn marker_layout(markers: &MarkerConfig, last_beat_ms: f64) -> Vec<f64> {
    let leading = (0..markers.count)
        .map(|k| -markers.gap_ms - (markers.count - 1 - k) as f64 * markers.spacing_ms);
    let trailing =
        (0..markers.count).map(|k| last_beat_ms + markers.gap_ms + k as f64 * markers.spacing_ms);
    leading.chain(trailing).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_build(ioi: Vec<f64>) -> Stimulus {
        let ioi = IoiSequence::new(ioi).unwrap();
        build(&ioi, 44100, &StimulusConfig::default(), &MarkerConfig::default()).unwrap()
    }

    #[test]
    fn test_onsets_match_ioi() {
        let stimulus = default_build(vec![0.0, 500.0, 500.0, 250.0]);
        let times = stimulus.info.stim_times_ms();
        assert_eq!(times, vec![0.0, 500.0, 1000.0, 1250.0]);
        assert!(times.windows(2).all(|w| w[1] > w[0]));
        assert!(stimulus.info.stim_onsets.iter().all(|o| o.is_played));
    }

    #[test]
    fn test_default_marker_layout() {
        let stimulus = default_build(vec![0.0, 500.0, 500.0]);
        assert_eq!(
            stimulus.info.marker_times_ms(),
            vec![-1560.0, -1280.0, -1000.0, 2000.0, 2280.0, 2560.0]
        );
        assert_eq!(stimulus.info.rhythm_start_ms, 2060.0);
        // rhythm start + last marker + marker tone + tail
        assert_eq!(stimulus.info.duration_ms, 2060.0 + 2560.0 + 50.0 + 500.0);
        assert_eq!(
            stimulus.waveform.frames(),
            ms_to_samples(stimulus.info.duration_ms, 44100).ceil() as usize
        );
    }

    #[test]
    fn test_tones_sound_at_onsets() {
        let stimulus = default_build(vec![0.0, 500.0]);
        let samples = stimulus.waveform.samples();
        let energy = |ms: f64| -> f32 {
            let start = ms_to_samples(ms, 44100) as usize;
            samples[start..start + 441].iter().map(|x| x * x).sum()
        };
        let start = stimulus.info.rhythm_start_ms;
        assert!(energy(start + 10.0) > 1.0);
        assert!(energy(start + 300.0) < 1e-9);
        assert!(energy(start + 510.0) > 1.0);
        assert!(energy(start - 1000.0 + 10.0) > 1.0);
        assert!(energy(100.0) < 1e-9);
    }

    #[test]
    fn test_mask_silences_beats() {
        let ioi = IoiSequence::new(vec![0.0, 500.0, 500.0]).unwrap();
        let stimulus = build_with_mask(
            &ioi,
            &[true, false, true],
            44100,
            &StimulusConfig::default(),
            &MarkerConfig::default(),
        )
        .unwrap();
        assert_eq!(stimulus.info.played_mask(), vec![true, false, true]);
        assert_eq!(stimulus.info.stim_onsets[1].time_ms, 500.0);

        let samples = stimulus.waveform.samples();
        let at = ms_to_samples(stimulus.info.rhythm_start_ms + 510.0, 44100) as usize;
        assert!(samples[at..at + 441].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_mask_length_mismatch() {
        let ioi = IoiSequence::new(vec![0.0, 500.0]).unwrap();
        let result = build_with_mask(
            &ioi,
            &[true],
            44100,
            &StimulusConfig::default(),
            &MarkerConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_single_onset_sequence() {
        let stimulus = default_build(vec![0.0]);
        assert_eq!(stimulus.info.stim_onsets.len(), 1);
        assert_eq!(stimulus.info.markers.len(), 6);
    }
}
