//! Butterworth filtering with zero-phase (forward-backward) application
//!
//! Filters are cascades of second-order sections designed with the
//! `biquad` crate (RBJ coefficients, one section per Butterworth pole pair)
//! and run in Direct Form II transposed. A forward-backward pass squares
//! the magnitude response and cancels the phase response, so filtering
//! introduces no time shift that would bias onset estimates.
//!
//! # Example
//!
//! ```
//! use tapsync_dsp::preprocessing::filter::ButterworthFilter;
//!
//! let filter = ButterworthFilter::highpass(4, 30.0, 44100)?;
//! let signal = vec![0.5f32; 4410]; // pure DC
//! let filtered = filter.filtfilt(&signal);
//! assert!(filtered.iter().all(|x| x.abs() < 1e-3));
//! # Ok::<(), tapsync_dsp::AnalysisError>(())
//! ```

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};

use crate::error::AnalysisError;

/// One second-order section of the cascade
#[derive(Debug, Clone)]
struct Section {
    coeffs: Coefficients<f64>,
}

impl Section {
    fn new(kind: FilterKind, cutoff_hz: f64, sample_rate: f64, q: f64) -> Result<Self, AnalysisError> {
        let filter_type = match kind {
            FilterKind::Highpass => Type::HighPass,
            FilterKind::Lowpass => Type::LowPass,
        };
        let coeffs = Coefficients::<f64>::from_params(filter_type, sample_rate.hz(), cutoff_hz.hz(), q)
            .map_err(|e| {
                AnalysisError::InvalidInput(format!(
                    "Cannot design {:?} section at {} Hz (Q {:.3}): {:?}",
                    kind, cutoff_hz, q, e
                ))
            })?;
        Ok(Self { coeffs })
    }

    fn dc_gain(&self) -> f64 {
        let c = &self.coeffs;
        (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2)
    }

    /// Causal pass started in the steady state of the first sample
    ///
    /// The primed response equals the constant steady-state output plus the
    /// zero-state response to the input minus its first sample.
    fn run(&self, input: &[f64]) -> Vec<f64> {
        let Some(&x0) = input.first() else {
            return Vec::new();
        };
        let y0 = self.dc_gain() * x0;
        let mut state = DirectForm2Transposed::<f64>::new(self.coeffs);
        input.iter().map(|&x| y0 + state.run(x - x0)).collect()
    }
}

/// Filter response type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Pass frequencies above the cutoff
    Highpass,
    /// Pass frequencies below the cutoff
    Lowpass,
}

/// Even-order Butterworth filter as a cascade of biquads
#[derive(Debug, Clone)]
pub struct ButterworthFilter {
    kind: FilterKind,
    order: usize,
    sections: Vec<Section>,
}

impl ButterworthFilter {
    /// Design a filter
    ///
    /// # Arguments
    ///
    /// * `kind` - High-pass or low-pass
    /// * `order` - Filter order; must be even and > 0
    /// * `cutoff_hz` - -3 dB frequency; must lie in (0, Nyquist)
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for an odd/zero order, a zero
    /// sample rate or a cutoff outside (0, Nyquist).
    pub fn new(
        kind: FilterKind,
        order: usize,
        cutoff_hz: f32,
        sample_rate: u32,
    ) -> Result<Self, AnalysisError> {
        if order == 0 || order % 2 != 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Butterworth order must be even and > 0, got {}",
                order
            )));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate".to_string(),
            ));
        }
        let nyquist = sample_rate as f32 / 2.0;
        if !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
            return Err(AnalysisError::InvalidInput(format!(
                "Cutoff must be in (0, {}) Hz, got {}",
                nyquist, cutoff_hz
            )));
        }

        // Pole pair k of an order-N Butterworth prototype has Q = 1 / (2 sin((2k + 1) pi / 2N))
        let sections = (0..order / 2)
            .map(|k| {
                let theta = (2 * k + 1) as f64 * std::f64::consts::PI / (2 * order) as f64;
                let q = 1.0 / (2.0 * theta.sin());
                Section::new(kind, cutoff_hz as f64, sample_rate as f64, q)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            kind,
            order,
            sections,
        })
    }

    /// High-pass design, see [`ButterworthFilter::new`]
    pub fn highpass(order: usize, cutoff_hz: f32, sample_rate: u32) -> Result<Self, AnalysisError> {
        Self::new(FilterKind::Highpass, order, cutoff_hz, sample_rate)
    }

    /// Low-pass design, see [`ButterworthFilter::new`]
    pub fn lowpass(order: usize, cutoff_hz: f32, sample_rate: u32) -> Result<Self, AnalysisError> {
        Self::new(FilterKind::Lowpass, order, cutoff_hz, sample_rate)
    }

    /// Response type
    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Filter order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Single causal pass through every section
    fn run(&self, signal: &[f64]) -> Vec<f64> {
        self.sections
            .iter()
            .fold(signal.to_vec(), |acc, section| section.run(&acc))
    }

    /// Causal filtering (introduces the filter's phase delay)
    pub fn filter(&self, signal: &[f32]) -> Vec<f32> {
        let input: Vec<f64> = signal.iter().map(|&x| x as f64).collect();
        self.run(&input).into_iter().map(|y| y as f32).collect()
    }

    /// Zero-phase forward-backward filtering
    ///
    /// The signal is extended at both ends by odd reflection so the edge
    /// transients settle before the real samples are reached. The input is
    /// never modified.
    pub fn filtfilt(&self, signal: &[f32]) -> Vec<f32> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }

        let pad = (3 * (self.order + 1)).min(n - 1);
        let first = signal[0] as f64;
        let last = signal[n - 1] as f64;

        let mut extended: Vec<f64> = Vec::with_capacity(n + 2 * pad);
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i] as f64));
        extended.extend(signal.iter().map(|&x| x as f64));
        extended.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i] as f64));

        let mut forward = self.run(&extended);
        forward.reverse();
        let mut backward = self.run(&forward);
        backward.reverse();

        backward[pad..pad + n].iter().map(|&y| y as f32).collect()
    }
}
