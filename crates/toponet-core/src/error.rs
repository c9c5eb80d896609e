use std::fmt;

use thiserror::Error;

/// Which end of a connection an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The entity receiving messages.
    Target,
    /// The entity sending messages.
    Source,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Target => f.write_str("target"),
            Side::Source => f.write_str("source"),
        }
    }
}

/// Errors raised while building or reshaping a sparse structure.
#[derive(Debug, Error)]
pub enum Error {
    /// An edge points outside the declared entity range.
    #[error("{side} index {index} at edge {edge} is out of range (bound {bound})")]
    IndexOutOfRange {
        side: Side,
        edge: usize,
        index: usize,
        bound: usize,
    },

    /// Two sequences that must line up do not.
    #[error("length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Base weights are malformed.
    #[error("invalid edge weights: {0}")]
    InvalidWeights(String),

    /// Structure cannot be represented (entity counts too large, bad permutation, ...).
    #[error("invalid structure: {0}")]
    InvalidStructure(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
