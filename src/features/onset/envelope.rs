//! Amplitude envelope extraction
//!
//! The envelope is the magnitude of the analytic signal, so it follows the
//! amplitude of an event independently of the phase of its carrier. A
//! centred moving average then removes residual ripple.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::AnalysisError;

/// Magnitude of the analytic signal (Hilbert envelope)
///
/// Computed in the frequency domain: FFT, zero the negative frequencies and
/// double the positive ones, inverse FFT, take the magnitude. The signal is
/// zero-padded to the next power of two, which only matters if the signal
/// does not decay to silence at its ends.
///
/// # Errors
///
/// Returns `AnalysisError::NumericalError` if the input holds non-finite
/// values.
pub fn hilbert_envelope(signal: &[f32]) -> Result<Vec<f32>, AnalysisError> {
    let n = signal.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    if signal.iter().any(|x| !x.is_finite()) {
        return Err(AnalysisError::NumericalError(
            "Non-finite sample in envelope input".to_string(),
        ));
    }

    let fft_size = n.next_power_of_two();
    log::debug!("Hilbert envelope: {} samples, FFT size {}", n, fft_size);

    let mut buffer: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut buffer);

    // Analytic-signal weights: DC and Nyquist kept, positive bins doubled, negative bins zeroed
    let half = fft_size / 2;
    for (k, bin) in buffer.iter_mut().enumerate() {
        if k == 0 || (k == half && fft_size % 2 == 0) {
            continue;
        }
        if k < half || (fft_size % 2 == 1 && k == half) {
            *bin = *bin * 2.0;
        } else {
            *bin = Complex::new(0.0, 0.0);
        }
    }

    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut buffer);

    let scale = 1.0 / fft_size as f32;
    Ok(buffer[..n].iter().map(|c| c.norm() * scale).collect())
}

/// Centred moving average with `same`-length output
///
/// Even windows are widened by one sample so the average stays centred on
/// each sample; near the edges the missing neighbours count as zero.
pub fn moving_average(values: &[f32], window: usize) -> Vec<f32> {
    if values.is_empty() || window <= 1 {
        return values.to_vec();
    }
    let window = window | 1;
    let half = window / 2;

    let mut prefix = Vec::with_capacity(values.len() + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for &v in values {
        acc += v as f64;
        prefix.push(acc);
    }

    let n = values.len();
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            ((prefix[end] - prefix[start]) / window as f64) as f32
        })
        .collect()
}
