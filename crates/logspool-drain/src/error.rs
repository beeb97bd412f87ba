//! Error types for logspool-drain

use logspool_storage::StorageError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while managing an appender's lifecycle
#[derive(Debug, Error)]
pub enum DrainError {
    /// The configuration failed validation; the appender stays stopped
    #[error("Invalid backlog configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),

    /// `start` was called on a running appender
    #[error("Appender already started")]
    AlreadyStarted,

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for drain operations
pub type DrainResult<T> = Result<T, DrainError>;

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_lists_every_problem() {
        let err = DrainError::InvalidConfig(vec![ConfigError::ZeroBatchSize, ConfigError::ZeroQuota]);
        let text = err.to_string();
        assert!(text.contains("batch_size must be greater than zero"));
        assert!(text.contains("quota must be greater than zero"));
    }

    #[test]
    fn test_storage_conversion() {
        let err: DrainError = StorageError::io("disk full").into();
        assert!(matches!(err, DrainError::Storage(_)));
    }
}
