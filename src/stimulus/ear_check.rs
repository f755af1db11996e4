//! Headphone ear-check calibration sound

use super::tone::{mix_into, synthesize_tone, Tone};
use super::Ear;
use crate::config::EarCheckConfig;
use crate::error::AnalysisError;
use crate::io::waveform::ms_to_samples;
use crate::io::Waveform;
use crate::preprocessing::channel_mixer::route_to_ear;

/// On/off ramp of the calibration tone in ms
const RAMP_MS: f64 = 10.0;

/// Build the stereo calibration sound: silence, tone, silence, with the
/// tone only in `ear`
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or
/// non-positive durations
pub fn ear_check_stimulus(
    ear: Ear,
    config: &EarCheckConfig,
    sample_rate: u32,
) -> Result<Waveform, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Invalid sample rate".to_string(),
        ));
    }
    if !(config.tone_duration_ms > 0.0) || !(config.silence_ms >= 0.0) {
        return Err(AnalysisError::InvalidInput(
            "Ear-check tone must be > 0 ms and silence >= 0 ms".to_string(),
        ));
    }

    let tone = synthesize_tone(
        &Tone {
            frequency_hz: config.tone_frequency_hz,
            duration_ms: config.tone_duration_ms,
            amplitude: config.amplitude,
            ramp_ms: RAMP_MS,
        },
        sample_rate,
    );
    let silence = ms_to_samples(config.silence_ms, sample_rate).round() as usize;

    let mut mono = vec![0.0f32; silence * 2 + tone.len()];
    mix_into(&mut mono, &tone, silence);

    log::debug!(
        "Ear check stimulus for {:?} ear: {} frames at {} Hz",
        ear,
        mono.len(),
        sample_rate
    );

    Waveform::new(route_to_ear(&mono, ear), sample_rate, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_only_in_selected_ear() {
        let config = EarCheckConfig::default();
        let wave = ear_check_stimulus(Ear::Right, &config, 44100).unwrap();
        assert_eq!(wave.channels(), 2);
        assert!((wave.duration_ms() - 3000.0).abs() < 0.1);

        let samples = wave.samples();
        let left_energy: f32 = samples.iter().step_by(2).map(|x| x * x).sum();
        let right_energy: f32 = samples.iter().skip(1).step_by(2).map(|x| x * x).sum();
        assert_eq!(left_energy, 0.0);
        assert!(right_energy > 1000.0);
    }

    #[test]
    fn test_silence_around_tone() {
        let wave = ear_check_stimulus(Ear::Left, &EarCheckConfig::default(), 44100).unwrap();
        let mono = wave.to_mono();
        let silence = ms_to_samples(750.0, 44100) as usize;
        assert!(mono[..silence].iter().all(|&x| x == 0.0));
        assert!(mono[mono.len() - silence + 1..].iter().all(|&x| x == 0.0));
    }
}
