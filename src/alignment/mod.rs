//! Time alignment between stimulus expectations and a recording
//!
//! - Marker aligner: locates the marker pattern and derives the mapping from
//!   rhythm time to recording time
//! - Matcher: pairs expected stimulus onsets with detected responses

pub mod markers;
pub mod matcher;

pub use markers::{locate_markers, MarkerAlignment};
pub use matcher::{match_onsets, match_responses};
