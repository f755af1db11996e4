//! Envelope-based onset detector
//!
//! Algorithm:
//! 1. Down-mix to mono and measure the waveform's absolute peak
//! 2. Zero-phase Butterworth high-pass (and optional low-pass)
//! 3. Hilbert envelope, smoothed by a centred moving average
//! 4. Peak-pick above the profile's threshold with the refractory period as
//!    minimum distance
//! 5. Estimate each onset time (envelope peak or rising-edge crossing)
//! 6. Keep onsets inside the profile's window and re-apply the refractory
//!    period to the final times
//!
//! Finding nothing is a normal outcome and yields an empty result.
//!
//! # Example
//!
//! ```no_run
//! use tapsync_dsp::config::DetectionProfile;
//! use tapsync_dsp::features::onset::detector::detect;
//! use tapsync_dsp::io::Waveform;
//!
//! let recording = Waveform::mono(vec![0.0f32; 44100], 44100)?;
//! let taps = detect(&recording, &DetectionProfile::trial_taps())?;
//! println!("Found {} taps", taps.len());
//! # Ok::<(), tapsync_dsp::AnalysisError>(())
//! ```

use super::envelope::{hilbert_envelope, moving_average};
use super::peak_picking::find_peaks;
use super::{DetectedOnset, DetectionResult};
use crate::config::{DetectionProfile, OnsetTiming};
use crate::error::AnalysisError;
use crate::io::waveform::{ms_to_samples, samples_to_ms};
use crate::io::Waveform;
use crate::preprocessing::filter::ButterworthFilter;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Detect onsets in a waveform
///
/// # Arguments
///
/// * `waveform` - Recording to analyze (read only)
/// * `profile` - Filter, smoothing, threshold and refractory settings
///
/// # Returns
///
/// Onsets in ms from the start of the waveform, strictly increasing and at
/// least `profile.refractory_ms` apart
///
/// # Errors
///
/// Returns `AnalysisError` if the waveform is empty, holds non-finite
/// samples, or the profile is invalid for its sample rate
pub fn detect(
    waveform: &Waveform,
    profile: &DetectionProfile,
) -> Result<DetectionResult, AnalysisError> {
    if waveform.is_empty() {
        return Err(AnalysisError::InvalidInput("Empty waveform".to_string()));
    }
    let sample_rate = waveform.sample_rate();
    profile.validate(sample_rate)?;

    let mono = waveform.to_mono();
    let waveform_peak = mono.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
    if !waveform_peak.is_finite() {
        return Err(AnalysisError::NumericalError(
            "Non-finite sample in waveform".to_string(),
        ));
    }

    log::debug!(
        "Detecting onsets: {} frames at {} Hz, band {:.0}-{} Hz, peak {:.4}",
        mono.len(),
        sample_rate,
        profile.highpass_hz,
        profile
            .lowpass_hz
            .map_or_else(|| "nyquist".to_string(), |f| format!("{:.0}", f)),
        waveform_peak
    );

    if waveform_peak <= EPSILON {
        log::debug!("Waveform is silent, no onsets detected");
        return Ok(DetectionResult {
            onsets: Vec::new(),
            threshold: profile.threshold.absolute_floor,
        });
    }

    // Step 1: band limiting
    let highpass = ButterworthFilter::highpass(profile.filter_order, profile.highpass_hz, sample_rate)?;
    let mut filtered = highpass.filtfilt(&mono);
    if let Some(cutoff) = profile.lowpass_hz {
        let lowpass = ButterworthFilter::lowpass(profile.filter_order, cutoff, sample_rate)?;
        filtered = lowpass.filtfilt(&filtered);
    }

    // Step 2: envelope
    let envelope = hilbert_envelope(&filtered)?;
    let window = (ms_to_samples(profile.smoothing_ms, sample_rate).round() as usize).max(1);
    let smooth = moving_average(&envelope, window);

    // Step 3: threshold and peak picking
    let threshold = profile.threshold.resolve(&smooth, waveform_peak)?;
    let min_distance = (ms_to_samples(profile.refractory_ms, sample_rate).ceil() as usize).max(1);
    let peaks = find_peaks(&smooth, threshold, min_distance);

    log::debug!(
        "Envelope threshold {:.5}, window {} samples, {} peaks above threshold",
        threshold,
        window,
        peaks.len()
    );

    // Step 4: onset time estimation
    let mut candidates = Vec::with_capacity(peaks.len());
    let mut lower_bound = 0usize;
    for &(index, value) in &peaks {
        let position = match profile.timing {
            OnsetTiming::EnvelopePeak => index as f64,
            OnsetTiming::RisingEdge { fraction } => {
                rising_edge(&smooth, index, lower_bound, value * fraction)
            }
        };
        lower_bound = index;
        candidates.push(DetectedOnset {
            time_ms: samples_to_ms(position, sample_rate),
            amplitude: value,
        });
    }

    // Step 5: window restriction, then refractory period on the final times
    if let Some((start, end)) = profile.window_ms {
        candidates.retain(|onset| onset.time_ms > start && onset.time_ms < end);
    }
    let onsets = enforce_refractory(candidates, profile.refractory_ms);

    log::debug!("Detected {} onsets", onsets.len());

    Ok(DetectionResult { onsets, threshold })
}

/// Walk back from a peak to where the envelope first reaches `level`
///
/// Never walks past `lower_bound` (the previous peak). Returns a fractional
/// sample position, linearly interpolated between the bracketing samples.
fn rising_edge(envelope: &[f32], peak: usize, lower_bound: usize, level: f32) -> f64 {
    let mut i = peak;
    while i > lower_bound && envelope[i - 1] >= level {
        i -= 1;
    }
    if i == lower_bound {
        return i as f64;
    }

    let below = envelope[i - 1];
    let above = envelope[i];
    let span = above - below;
    if span <= EPSILON {
        return i as f64;
    }
    (i - 1) as f64 + ((level - below) / span) as f64
}

/// Drop onsets closer than `refractory_ms` to the previously kept one,
/// keeping the stronger of each conflicting pair
fn enforce_refractory(candidates: Vec<DetectedOnset>, refractory_ms: f64) -> Vec<DetectedOnset> {
    let mut kept: Vec<DetectedOnset> = Vec::with_capacity(candidates.len());
    for onset in candidates {
        match kept.last_mut() {
            Some(last) if onset.time_ms - last.time_ms < refractory_ms => {
                if onset.amplitude > last.amplitude {
                    *last = onset;
                }
            }
            _ => kept.push(onset),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::onset::threshold::ThresholdPolicy;

    const SR: u32 = 44100;

    fn silence(ms: f64) -> Vec<f32> {
        vec![0.0; ms_to_samples(ms, SR) as usize]
    }

    /// Low-frequency decaying burst resembling a finger tap
    fn add_tap(signal: &mut [f32], at_ms: f64, amplitude: f32) {
        let start = ms_to_samples(at_ms, SR) as usize;
        let len = ms_to_samples(80.0, SR) as usize;
        let attack = ms_to_samples(3.0, SR);
        for i in 0..len.min(signal.len().saturating_sub(start)) {
            let t = i as f32 / SR as f32;
            let ramp = ((i as f64) / attack).min(1.0) as f32;
            signal[start + i] += amplitude
                * ramp
                * (-t / 0.010).exp()
                * (2.0 * std::f32::consts::PI * 150.0 * t).sin();
        }
    }

    /// Ramped sine tone whose half-amplitude point sits on `at_ms`
    fn add_tone(signal: &mut [f32], at_ms: f64, freq: f32, amplitude: f32) {
        let ramp = ms_to_samples(5.0, SR) as usize;
        let len = ms_to_samples(50.0, SR) as usize;
        let start = ms_to_samples(at_ms, SR) as usize - ramp / 2;
        for i in 0..len {
            let gain = if i < ramp {
                0.5 * (1.0 - (std::f32::consts::PI * i as f32 / ramp as f32).cos())
            } else if i >= len - ramp {
                0.5 * (1.0 - (std::f32::consts::PI * (len - i) as f32 / ramp as f32).cos())
            } else {
                1.0
            };
            let t = (start + i) as f32 / SR as f32;
            signal[start + i] += amplitude * gain * (2.0 * std::f32::consts::PI * freq * t).sin();
        }
    }

    fn pulse_profile() -> DetectionProfile {
        DetectionProfile {
            highpass_hz: 30.0,
            lowpass_hz: None,
            filter_order: 4,
            smoothing_ms: 5.0,
            threshold: ThresholdPolicy {
                relative_to_peak: 0.1,
                absolute_floor: 0.01,
                mad_multiplier: None,
            },
            refractory_ms: 100.0,
            timing: OnsetTiming::RisingEdge { fraction: 0.5 },
            window_ms: None,
        }
    }

    #[test]
    fn test_silence_yields_no_onsets() {
        let wave = Waveform::mono(silence(1000.0), SR).unwrap();
        for profile in [
            DetectionProfile::trial_taps(),
            DetectionProfile::tones(),
            DetectionProfile::ear_check(),
        ] {
            let result = detect(&wave, &profile).unwrap();
            assert!(result.is_empty());
        }
    }

    #[test]
    fn test_empty_waveform_is_error() {
        let wave = Waveform::mono(Vec::new(), SR).unwrap();
        assert!(detect(&wave, &DetectionProfile::trial_taps()).is_err());
    }

    #[test]
    fn test_non_finite_waveform_is_error() {
        let mut samples = silence(100.0);
        samples[10] = f32::INFINITY;
        let wave = Waveform::mono(samples, SR).unwrap();
        let err = detect(&wave, &DetectionProfile::trial_taps()).unwrap_err();
        assert_eq!(err.reason(), "numerical_error");
    }

    #[test]
    fn test_single_impulse_detected_once_near_its_time() {
        let mut samples = silence(1000.0);
        let at = ms_to_samples(400.0, SR) as usize;
        let width = ms_to_samples(2.0, SR) as usize;
        for s in &mut samples[at..at + width] {
            *s = 1.0;
        }
        let wave = Waveform::mono(samples, SR).unwrap();
        let profile = pulse_profile();
        let result = detect(&wave, &profile).unwrap();

        assert_eq!(result.len(), 1, "{:?}", result.onsets);
        assert!(
            (result.onsets[0].time_ms - 400.0).abs() <= profile.smoothing_ms,
            "onset at {} ms",
            result.onsets[0].time_ms
        );
    }

    #[test]
    fn test_tap_profile_finds_taps_and_ignores_tones() {
        let mut samples = silence(3000.0);
        for at in [500.0, 1000.0, 1500.0] {
            add_tone(&mut samples, at, 1000.0, 0.8);
        }
        for at in [700.0, 1800.0] {
            add_tap(&mut samples, at, 0.6);
        }
        let wave = Waveform::mono(samples, SR).unwrap();

        let taps = detect(&wave, &DetectionProfile::trial_taps()).unwrap();
        let times = taps.times_ms();
        assert_eq!(times.len(), 2, "{:?}", times);
        assert!((times[0] - 700.0).abs() < 5.0, "{:?}", times);
        assert!((times[1] - 1800.0).abs() < 5.0, "{:?}", times);
    }

    #[test]
    fn test_tone_profile_finds_tones_and_ignores_taps() {
        let mut samples = silence(3000.0);
        for at in [500.0, 1000.0, 1500.0] {
            add_tone(&mut samples, at, 1000.0, 0.8);
        }
        add_tap(&mut samples, 1200.0, 0.6);
        let wave = Waveform::mono(samples, SR).unwrap();

        let tones = detect(&wave, &DetectionProfile::tones()).unwrap();
        let times = tones.times_ms();
        assert_eq!(times.len(), 3, "{:?}", times);
        for (detected, expected) in times.iter().zip([500.0, 1000.0, 1500.0]) {
            assert!((detected - expected).abs() < 1.0, "{} vs {}", detected, expected);
        }
    }

    #[test]
    fn test_single_in_band_pulse_detected_once_by_tap_profile() {
        let profile = DetectionProfile::trial_taps();
        let mut samples = silence(1500.0);
        let start = ms_to_samples(800.0, SR) as usize;
        let width = ms_to_samples(2.0, SR) as usize;
        for i in 0..width {
            samples[start + i] = 0.8 * (std::f32::consts::PI * i as f32 / width as f32).sin();
        }
        let wave = Waveform::mono(samples, SR).unwrap();

        let result = detect(&wave, &profile).unwrap();
        let times = result.times_ms();
        assert_eq!(times.len(), 1, "{:?}", times);
        assert!((times[0] - 801.0).abs() <= profile.smoothing_ms, "{:?}", times);
    }

    #[test]
    fn test_tap_profile_rejects_broadband_click() {
        let mut samples = silence(1000.0);
        samples[ms_to_samples(500.0, SR) as usize] = 1.0;
        let wave = Waveform::mono(samples, SR).unwrap();
        assert!(detect(&wave, &DetectionProfile::trial_taps()).unwrap().is_empty());
    }

    #[test]
    fn test_quiet_recording_still_detected() {
        let mut samples = silence(2000.0);
        add_tap(&mut samples, 600.0, 0.05);
        add_tap(&mut samples, 1300.0, 0.05);
        let wave = Waveform::mono(samples, SR).unwrap();
        let taps = detect(&wave, &DetectionProfile::trial_taps()).unwrap();
        assert_eq!(taps.len(), 2);
    }

    #[test]
    fn test_refractory_period_never_violated() {
        // Dense pseudo-random bursts, many closer than the refractory period
        let mut state: u32 = 12345;
        let mut next = || {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            (state >> 8) as f32 / (1u32 << 24) as f32
        };
        for _ in 0..3 {
            let mut samples = silence(3000.0);
            let mut at = 50.0;
            while at < 2900.0 {
                add_tap(&mut samples, at, 0.1 + 0.8 * next());
                at += 20.0 + 150.0 * next() as f64;
            }
            let wave = Waveform::mono(samples, SR).unwrap();
            let profile = DetectionProfile::trial_taps();
            let result = detect(&wave, &profile).unwrap();
            assert!(!result.is_empty());
            for pair in result.onsets.windows(2) {
                assert!(
                    pair[1].time_ms - pair[0].time_ms >= profile.refractory_ms,
                    "{} -> {}",
                    pair[0].time_ms,
                    pair[1].time_ms
                );
            }
        }
    }

    #[test]
    fn test_window_restricts_accepted_onsets() {
        let mut samples = silence(2000.0);
        add_tap(&mut samples, 300.0, 0.6);
        add_tap(&mut samples, 1500.0, 0.6);
        let wave = Waveform::mono(samples, SR).unwrap();

        let mut profile = DetectionProfile::trial_taps();
        profile.window_ms = Some((0.0, 1000.0));
        let result = detect(&wave, &profile).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.onsets[0].time_ms < 1000.0);
    }

    #[test]
    fn test_stereo_input_is_downmixed() {
        let mut mono = silence(1000.0);
        add_tap(&mut mono, 500.0, 0.6);
        let mut stereo = Vec::with_capacity(mono.len() * 2);
        for &s in &mono {
            stereo.push(s);
            stereo.push(0.0);
        }
        let wave = Waveform::new(stereo, SR, 2).unwrap();
        let result = detect(&wave, &DetectionProfile::trial_taps()).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_rising_edge_interpolates() {
        let envelope = [0.0, 0.2, 0.6, 1.0, 0.5];
        // half of 1.0 is crossed between samples 1 and 2
        let pos = rising_edge(&envelope, 3, 0, 0.5);
        assert!((pos - 1.75).abs() < 1e-6);
        // bounded by the previous peak
        assert_eq!(rising_edge(&envelope, 3, 2, 0.5), 2.0);
    }

    #[test]
    fn test_enforce_refractory_keeps_stronger() {
        let onsets = vec![
            DetectedOnset { time_ms: 0.0, amplitude: 0.2 },
            DetectedOnset { time_ms: 50.0, amplitude: 0.9 },
            DetectedOnset { time_ms: 300.0, amplitude: 0.1 },
        ];
        let kept = enforce_refractory(onsets, 100.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].time_ms, 50.0);
        assert_eq!(kept[1].time_ms, 300.0);
    }
}
