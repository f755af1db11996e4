//! Ramped sine tone synthesis

use crate::io::waveform::ms_to_samples;

/// Parameters of one synthesized tone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    /// Carrier frequency in Hz
    pub frequency_hz: f32,
    /// Total duration in ms, ramps included
    pub duration_ms: f64,
    /// Peak amplitude
    pub amplitude: f32,
    /// Raised-cosine attack and release length in ms
    pub ramp_ms: f64,
}

impl Tone {
    /// Attack ramp length in whole samples
    pub fn ramp_samples(&self, sample_rate: u32) -> usize {
        ms_to_samples(self.ramp_ms, sample_rate).round() as usize
    }

    /// First sample of a tone whose attack midpoint (half amplitude) lands
    /// on `onset_ms`
    ///
    /// Returns `None` if the tone would start before sample 0.
    pub fn start_sample(&self, onset_ms: f64, sample_rate: u32) -> Option<usize> {
        let start = ms_to_samples(onset_ms, sample_rate) - self.ramp_samples(sample_rate) as f64 / 2.0;
        let start = start.round();
        if start < 0.0 {
            None
        } else {
            Some(start as usize)
        }
    }
}

/// Synthesize a sine tone with raised-cosine on/off ramps
///
/// The ramps are shortened to half the tone if they would not fit.
pub fn synthesize_tone(tone: &Tone, sample_rate: u32) -> Vec<f32> {
    let len = ms_to_samples(tone.duration_ms, sample_rate).round() as usize;
    let ramp = tone.ramp_samples(sample_rate).min(len / 2);
    let omega = 2.0 * std::f64::consts::PI * tone.frequency_hz as f64 / sample_rate as f64;

    (0..len)
        .map(|i| {
            let gain = if ramp > 0 && i < ramp {
                raised_cosine(i, ramp)
            } else if ramp > 0 && i >= len - ramp {
                raised_cosine(len - i, ramp)
            } else {
                1.0
            };
            (tone.amplitude as f64 * gain * (omega * i as f64).sin()) as f32
        })
        .collect()
}

fn raised_cosine(position: usize, ramp: usize) -> f64 {
    0.5 * (1.0 - (std::f64::consts::PI * position as f64 / ramp as f64).cos())
}

/// Add `tone` into `target` starting at sample `start`
///
/// Samples that would fall past the end of `target` are dropped.
pub fn mix_into(target: &mut [f32], tone: &[f32], start: usize) {
    if start >= target.len() {
        return;
    }
    for (out, &sample) in target[start..].iter_mut().zip(tone) {
        *out += sample;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beep() -> Tone {
        Tone {
            frequency_hz: 1000.0,
            duration_ms: 50.0,
            amplitude: 0.8,
            ramp_ms: 5.0,
        }
    }

    #[test]
    fn test_tone_length_and_peak() {
        let samples = synthesize_tone(&beep(), 44100);
        assert_eq!(samples.len(), 2205);
        let peak = samples.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        assert!(peak <= 0.8 + 1e-6);
        assert!(peak > 0.79);
    }

    #[test]
    fn test_ramps_start_and_end_silent() {
        let samples = synthesize_tone(&beep(), 44100);
        assert_eq!(samples[0], 0.0);
        assert!(samples[samples.len() - 1].abs() < 0.01);
    }

    #[test]
    fn test_start_sample_centres_ramp() {
        let tone = beep();
        // 5 ms ramp at 44.1 kHz is 221 samples; half of it precedes the onset
        assert_eq!(tone.start_sample(100.0, 44100), Some(4300));
        assert_eq!(tone.start_sample(1.0, 44100), None);
    }

    #[test]
    fn test_mix_into_adds_and_truncates() {
        let mut target = vec![1.0f32; 4];
        mix_into(&mut target, &[0.5, 0.5, 0.5], 2);
        assert_eq!(target, vec![1.0, 1.0, 1.5, 1.5]);
        mix_into(&mut target, &[1.0], 10);
        assert_eq!(target, vec![1.0, 1.0, 1.5, 1.5]);
    }
}
