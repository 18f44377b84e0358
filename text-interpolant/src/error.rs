//! Error types for text-interpolant

use thiserror::Error;

/// Errors that can occur while encoding, sampling or integrating
#[derive(Debug, Error)]
pub enum InterpolantError {
    /// Model loading error
    #[error("Model error: {0}")]
    Model(String),

    /// Embedding generation error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector width does not match the reference embedding
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// ODE solver failure (step size underflow, non-finite state, step budget)
    #[error("Integration error: {0}")]
    Integration(String),

    /// Quadrature did not converge or hit a non-finite integrand
    #[error("Quadrature error: {0}")]
    Quadrature(String),

    /// Bad argument to an operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Bad configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Invalid path
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl InterpolantError {
    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create an embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create an integration error
    pub fn integration(msg: impl Into<String>) -> Self {
        Self::Integration(msg.into())
    }

    /// Create a quadrature error
    pub fn quadrature(msg: impl Into<String>) -> Self {
        Self::Quadrature(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }
}

/// Result type for interpolant operations
pub type Result<T> = std::result::Result<T, InterpolantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = InterpolantError::dimension_mismatch(384, 4);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 384, got 4");
    }

    #[test]
    fn test_helpers_wrap_message() {
        let err = InterpolantError::integration("step size underflow at t=0.5");
        assert!(matches!(err, InterpolantError::Integration(_)));
        assert!(err.to_string().contains("t=0.5"));
    }
}
