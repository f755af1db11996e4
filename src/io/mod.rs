//! Audio I/O modules
//!
//! The waveform container handed between stages, WAV reading/writing with
//! hound, and general decoding using Symphonia.

pub mod decoder;
pub mod waveform;
pub mod wav;

pub use waveform::Waveform;
