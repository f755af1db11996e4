//! Level normalization and recording mix-down
//!
//! Supports two normalization methods:
//! - Peak normalization (scales the largest absolute sample to a target)
//! - RMS normalization (scales the root-mean-square level to a target)
//!
//! # Example
//!
//! ```
//! use tapsync_dsp::preprocessing::normalization::{
//!     normalize, NormalizationConfig, NormalizationMethod
//! };
//!
//! let mut samples = vec![0.25f32, -0.5, 0.1];
//! let config = NormalizationConfig {
//!     method: NormalizationMethod::Peak,
//!     target_level: 0.9,
//! };
//!
//! let levels = normalize(&mut samples, config)?;
//! assert!((samples[1] + 0.9).abs() < 1e-6);
//! assert!(levels.gain_db > 0.0);
//! # Ok::<(), tapsync_dsp::AnalysisError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::io::Waveform;

/// Numerical stability epsilon for divisions
const EPSILON: f32 = 1e-10;

/// Normalization method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationMethod {
    /// Scale so the largest absolute sample equals the target
    Peak,
    /// Scale so the RMS level equals the target
    Rms,
}

/// Normalization configuration
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationConfig {
    /// Normalization method
    pub method: NormalizationMethod,

    /// Target level as linear amplitude (default: 0.9)
    pub target_level: f32,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            method: NormalizationMethod::Peak,
            target_level: 0.9,
        }
    }
}

/// Levels measured before normalization, and the gain applied
#[derive(Debug, Clone, PartialEq)]
pub struct LevelMetadata {
    /// Peak level in dBFS (before normalization)
    pub peak_db: f32,
    /// RMS level in dBFS (before normalization)
    pub rms_db: f32,
    /// Gain applied in dB
    pub gain_db: f32,
}

fn to_db(linear: f32) -> f32 {
    if linear > EPSILON {
        20.0 * linear.log10()
    } else {
        f32::NEG_INFINITY
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Normalize a buffer in place
///
/// Silent buffers are left untouched (0 dB gain) rather than amplified.
///
/// # Errors
///
/// Returns `AnalysisError` if the buffer is empty or the target is not a
/// positive finite level.
pub fn normalize(
    samples: &mut [f32],
    config: NormalizationConfig,
) -> Result<LevelMetadata, AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty audio samples".to_string(),
        ));
    }
    if !(config.target_level > 0.0 && config.target_level.is_finite()) {
        return Err(AnalysisError::InvalidInput(format!(
            "Normalization target must be a positive level, got {}",
            config.target_level
        )));
    }

    let peak = samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
    let rms_level = rms(samples);
    if !peak.is_finite() {
        return Err(AnalysisError::NumericalError(
            "Non-finite sample in buffer".to_string(),
        ));
    }

    let current = match config.method {
        NormalizationMethod::Peak => peak,
        NormalizationMethod::Rms => rms_level,
    };

    let mut metadata = LevelMetadata {
        peak_db: to_db(peak),
        rms_db: to_db(rms_level),
        gain_db: 0.0,
    };

    if current <= EPSILON {
        log::warn!("Buffer is silent, skipping {:?} normalization", config.method);
        return Ok(metadata);
    }

    let gain = config.target_level / current;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
    metadata.gain_db = to_db(gain);

    log::debug!(
        "{:?} normalization: peak {:.1} dB, rms {:.1} dB, gain {:.1} dB",
        config.method,
        metadata.peak_db,
        metadata.rms_db,
        metadata.gain_db
    );

    Ok(metadata)
}

/// Build the combined trial recording from the tapping capture and the
/// stimulus that was played
///
/// Both inputs are down-mixed to mono and peak-normalized to `target_peak`,
/// summed sample by sample (the shorter one is zero-padded), and the sum is
/// peak-normalized again to `target_peak` so it cannot clip.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the sample rates differ or
/// either input is empty.
pub fn combine_recordings(
    tapping: &Waveform,
    stimulus: &Waveform,
    target_peak: f32,
) -> Result<Waveform, AnalysisError> {
    if tapping.sample_rate() != stimulus.sample_rate() {
        return Err(AnalysisError::InvalidInput(format!(
            "Cannot combine recordings at {} Hz and {} Hz",
            tapping.sample_rate(),
            stimulus.sample_rate()
        )));
    }

    let config = NormalizationConfig {
        method: NormalizationMethod::Peak,
        target_level: target_peak,
    };

    let mut taps = tapping.to_mono().into_owned();
    normalize(&mut taps, config.clone())?;
    let mut stim = stimulus.to_mono().into_owned();
    normalize(&mut stim, config.clone())?;

    let len = taps.len().max(stim.len());
    let mut combined = vec![0.0f32; len];
    for (i, out) in combined.iter_mut().enumerate() {
        *out = taps.get(i).copied().unwrap_or(0.0) + stim.get(i).copied().unwrap_or(0.0);
    }
    normalize(&mut combined, config)?;

    Waveform::mono(combined, tapping.sample_rate())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_normalization() {
        let mut samples = vec![0.1, -0.2, 0.05];
        let meta = normalize(&mut samples, NormalizationConfig::default()).unwrap();
        assert!((samples[1] + 0.9).abs() < 1e-6);
        assert!((samples[0] - 0.45).abs() < 1e-6);
        assert!((meta.peak_db - 20.0 * 0.2f32.log10()).abs() < 1e-4);
    }

    #[test]
    fn test_rms_normalization() {
        let mut samples = vec![0.5, -0.5, 0.5, -0.5];
        let config = NormalizationConfig {
            method: NormalizationMethod::Rms,
            target_level: 0.25,
        };
        normalize(&mut samples, config).unwrap();
        assert!((rms(&samples) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_silence_is_left_alone() {
        let mut samples = vec![0.0; 16];
        let meta = normalize(&mut samples, NormalizationConfig::default()).unwrap();
        assert_eq!(meta.gain_db, 0.0);
        assert!(samples.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_empty_and_bad_target_rejected() {
        assert!(normalize(&mut [], NormalizationConfig::default()).is_err());
        let config = NormalizationConfig {
            method: NormalizationMethod::Peak,
            target_level: 0.0,
        };
        assert!(normalize(&mut [0.5], config).is_err());
    }

    #[test]
    fn test_combine_recordings_pads_and_limits_peak() {
        let tapping = Waveform::mono(vec![0.0, 0.1, 0.0], 1000).unwrap();
        let stimulus = Waveform::mono(vec![0.4, 0.4, 0.0, 0.0, 0.2], 1000).unwrap();

        let combined = combine_recordings(&tapping, &stimulus, 0.9).unwrap();
        assert_eq!(combined.frames(), 5);
        assert!((combined.peak() - 0.9).abs() < 1e-6);
        // sample 1 holds tap + stimulus, both at full scale before the final rescale
        assert!((combined.samples()[1] - 0.9).abs() < 1e-6);
        assert!((combined.samples()[0] - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_combine_rejects_rate_mismatch() {
        let a = Waveform::mono(vec![0.1; 4], 44100).unwrap();
        let b = Waveform::mono(vec![0.1; 4], 48000).unwrap();
        assert!(combine_recordings(&a, &b, 0.9).is_err());
    }
}
