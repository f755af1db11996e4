//! Feature extraction modules
//!
//! - Onset detection (taps, beat tones, markers, ear check)

pub mod onset;
