//! Errors reported by a projection engine.
//!
//! The boundary does not interpret engine failures; it attaches the year (or
//! the initialization step) and hands them to the caller.
use thiserror::Error;

use crate::engine::params::ParamKey;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A parameter the year's computation needs was never ingested.
    #[error("parameter {key:?} was not set before projecting year index {year}")]
    MissingParameter { key: ParamKey, year: usize },

    /// Demographic inputs could not be loaded.
    #[error("failed to initialize from {path}: {reason}")]
    Initialization { path: String, reason: String },

    /// Any other engine failure.
    #[error("{0}")]
    Failed(String),
}
