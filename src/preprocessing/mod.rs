//! Audio preprocessing modules
//!
//! This module contains utilities for preparing audio for analysis:
//! - Zero-phase Butterworth filtering
//! - Normalization (peak, RMS) and trial-recording mixing
//! - Channel mixing (down-mix to mono, ear routing)

pub mod channel_mixer;
pub mod filter;
pub mod normalization;
