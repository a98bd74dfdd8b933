//! Core error handling
//!
//! Every fallible operation in the core returns [`CoreResult`]. Most call
//! sites degrade instead of propagating (cache misses, skipped writes); the
//! variants here are what reaches callers that asked to see failures.

use health_tracker_shared::DomainError;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Storage error")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Heart rate monitor is already running")]
    AlreadyMonitoring,

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn device<S: Into<String>>(msg: S) -> Self {
        CoreError::Device(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        CoreError::Validation(msg.into())
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_is_transparent() {
        let err: CoreError = DomainError::UnknownMetric("calories".to_string()).into();
        assert_eq!(err.to_string(), "Unknown metric: calories");
    }

    #[test]
    fn test_device_error_message() {
        let err = CoreError::device("not connected");
        assert_eq!(err.to_string(), "Device error: not connected");
    }
}
