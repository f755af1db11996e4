//! Analysis and result aggregation modules
//!
//! Turns an alignment record into the per-trial metric set:
//! - Result types (alignment record, summary statistics, trial outcome)
//! - NaN-aware statistics
//! - Metrics aggregation
//! - Metadata

pub mod metadata;
pub mod metrics;
pub mod result;
pub mod statistics;
