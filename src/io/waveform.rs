//! Fixed-rate audio buffer handed between pipeline stages

use std::borrow::Cow;

use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::downmix;

/// Convert a time in milliseconds to a (fractional) sample position
pub fn ms_to_samples(ms: f64, sample_rate: u32) -> f64 {
    ms * sample_rate as f64 / 1000.0
}

/// Convert a (fractional) sample position to milliseconds
pub fn samples_to_ms(samples: f64, sample_rate: u32) -> f64 {
    samples * 1000.0 / sample_rate as f64
}

/// Interleaved `f32` audio with a fixed sample rate
///
/// Detection only ever reads a waveform; multi-channel buffers are
/// down-mixed into a fresh mono copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl Waveform {
    /// Create a waveform from interleaved samples
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the sample rate or channel
    /// count is zero, or the sample count is not a whole number of frames.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate".to_string(),
            ));
        }
        if channels == 0 {
            return Err(AnalysisError::InvalidInput(
                "Waveform must have at least one channel".to_string(),
            ));
        }
        if samples.len() % channels as usize != 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Create a mono waveform
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        Self::new(samples, sample_rate, 1)
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consume the waveform, returning its interleaved samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// True when the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        samples_to_ms(self.frames() as f64, self.sample_rate)
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    /// Mono view of the signal: borrowed when already mono, otherwise a
    /// channel-averaged copy
    pub fn to_mono(&self) -> Cow<'_, [f32]> {
        if self.channels == 1 {
            Cow::Borrowed(&self.samples)
        } else {
            Cow::Owned(downmix(&self.samples, self.channels as usize))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_partial_frames() {
        assert!(Waveform::new(vec![0.0; 3], 44100, 2).is_err());
        assert!(Waveform::new(vec![0.0; 4], 44100, 2).is_ok());
    }

    #[test]
    fn test_new_rejects_zero_rate_and_channels() {
        assert!(Waveform::new(vec![0.0; 4], 0, 1).is_err());
        assert!(Waveform::new(vec![0.0; 4], 44100, 0).is_err());
    }

    #[test]
    fn test_duration_and_frames() {
        let wave = Waveform::new(vec![0.0; 88200], 44100, 2).unwrap();
        assert_eq!(wave.frames(), 44100);
        assert!((wave.duration_ms() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_to_mono_borrows_mono_input() {
        let wave = Waveform::mono(vec![0.1, -0.5, 0.3], 8000).unwrap();
        assert!(matches!(wave.to_mono(), Cow::Borrowed(_)));
        assert_eq!(wave.peak(), 0.5);
    }

    #[test]
    fn test_to_mono_averages_stereo() {
        let wave = Waveform::new(vec![1.0, 0.0, 0.5, 0.5], 8000, 2).unwrap();
        assert_eq!(wave.to_mono().as_ref(), &[0.5, 0.5]);
    }

    #[test]
    fn test_time_conversions() {
        assert!((ms_to_samples(500.0, 44100) - 22050.0).abs() < 1e-9);
        assert!((samples_to_ms(22050.0, 44100) - 500.0).abs() < 1e-9);
    }
}
