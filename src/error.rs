// src/error.rs
//
// Tagged, flat error kinds for the whole crate. Every fallible operation
// returns `Result<T, KqtError>` and propagates with `?`; nothing in the
// render path throws or unwinds. The handle facade (`crate::handle`) is the
// one place that flattens a `Result` into a checked-return-plus-error-slot
// shape, for fidelity to the described C-style API boundary.

use thiserror::Error;

use crate::streader::StreaderError;

/// One of the five tagged error kinds the engine ever produces.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KqtError {
    /// A caller passed a value outside a documented range.
    #[error("argument error: {0}")]
    Argument(String),

    /// Model data is syntactically malformed.
    #[error("format error: {0}")]
    Format(String),

    /// A referenced entity (port, device, pattern, ...) does not exist.
    #[error("resource error: {0}")]
    Resource(String),

    /// An allocation failed. Never produced on the render path, since every
    /// buffer there is pre-sized; reserved for model-load time.
    #[error("memory error: {0}")]
    Memory(String),

    /// A parsed value fell outside the validator's accepted range.
    #[error("range error: {0}")]
    Range(String),
}

impl From<StreaderError> for KqtError {
    fn from(e: StreaderError) -> Self {
        KqtError::Format(e.to_string())
    }
}

pub type KqtResult<T> = Result<T, KqtError>;
