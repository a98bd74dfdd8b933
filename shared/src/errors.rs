//! Error types for the Health Tracker domain

use thiserror::Error;

/// Domain-level error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Unknown granularity: {0}")]
    UnknownGranularity(String),

    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    #[error("Series length mismatch: {values} values, {labels} labels")]
    SeriesLengthMismatch { values: usize, labels: usize },
}
