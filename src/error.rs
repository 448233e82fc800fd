use thiserror::Error;

/// Result type for deepq operations
pub type Result<T> = std::result::Result<T, DeepQError>;

/// Main error type for the deepq crate
#[derive(Debug, Error)]
pub enum DeepQError {
    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Action index outside of the estimator's output width
    #[error("Invalid action {action}: must be less than {max_actions}")]
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// More samples were requested than the replay buffer holds
    #[error("Insufficient samples: requested {requested}, buffer holds {available}")]
    InsufficientSamples {
        requested: usize,
        available: usize,
    },

    /// Empty batch of transitions
    #[error("Empty batch: {0}")]
    EmptyBatch(String),

    /// Operation is part of the estimator interface but not implemented
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Failure reported by an environment implementation
    #[error("Environment error: {0}")]
    Environment(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for DeepQError {
    fn from(err: bincode::Error) -> Self {
        DeepQError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DeepQError {
    fn from(err: serde_json::Error) -> Self {
        DeepQError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl DeepQError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        DeepQError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        DeepQError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
