//! Error types for toponet-nn.

use candle_core::DType;
use thiserror::Error;

/// Kernel error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Sparse structure is malformed.
    #[error("structure error: {0}")]
    Structure(#[from] toponet_core::Error),

    /// Dimension mismatch between inputs and the layer's declared shapes.
    #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// Input dtype differs from the parameter dtype.
    #[error("dtype mismatch: expected {expected:?}, got {got:?}")]
    DTypeMismatch { expected: DType, got: DType },

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
