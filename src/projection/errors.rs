//! Errors for projection sessions (buffers, year arguments, value conversion,
//! and engine failures).
//!
//! [`ProjectionError`] is the error type of every public operation on a
//! [`Projection`](crate::projection::Projection). It converts to `PyErr` at
//! the PyO3 boundary.
//!
//! ## Conventions
//! - Years are calendar years; `index` fields are 0-based buffer indices.
//! - A failed call leaves previously ingested parameters and the
//!   last-computed-year marker untouched.
#[cfg(feature = "python-bindings")]
use pyo3::{
    PyErr,
    exceptions::{PyRuntimeError, PyValueError},
};
use thiserror::Error;

use crate::{buffer::BufferError, engine::EngineError, numerics::PchipError};

pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    // ---- Shape / layout ----
    /// A host buffer failed validation.
    #[error(transparent)]
    Buffer(#[from] BufferError),

    // ---- Usage ----
    /// `first` is after `last` when constructing a projection.
    #[error("invalid projection years: first year {first} is after final year {last}")]
    InvalidYearRange { first: i32, last: i32 },

    /// The range cannot be indexed, or its "nothing computed" year
    /// `first - 1` is not representable.
    #[error("invalid projection years: [{first}, {last}] is not a representable range")]
    UnrepresentableYearRange { first: i32, last: i32 },

    /// A year argument is outside `[first, last]`.
    #[error("year {year} is outside the projection range [{first}, {last}]")]
    YearOutOfRange { year: i32, first: i32, last: i32 },

    /// Unrecognized share mode name.
    #[error("invalid share mode {0:?} (expected 'borrow' or 'copy')")]
    UnknownShareMode(String),

    // ---- Conversion ----
    /// A value cannot be converted into an engine parameter.
    #[error("{param} at index {index:?}: {reason}; got {value}")]
    InvalidValue { param: &'static str, index: Vec<usize>, value: f64, reason: &'static str },

    /// A derived-parameter interpolant could not be fitted.
    #[error("interpolation failed: {0}")]
    Interpolation(#[from] PchipError),

    // ---- Engine ----
    /// The engine failed while computing `year`.
    #[error("projection failed in year {year}: {source}")]
    Engine { year: i32, source: EngineError },

    /// The engine failed to initialize.
    #[error("engine initialization failed: {0}")]
    EngineInit(EngineError),
}

impl ProjectionError {
    /// `true` for InvalidShape and InvalidLayout failures.
    pub fn is_buffer_error(&self) -> bool {
        matches!(self, ProjectionError::Buffer(_))
    }

    /// `true` for out-of-range or malformed year arguments.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            ProjectionError::InvalidYearRange { .. }
                | ProjectionError::UnrepresentableYearRange { .. }
                | ProjectionError::YearOutOfRange { .. }
                | ProjectionError::UnknownShareMode(_)
        )
    }
}

#[cfg(feature = "python-bindings")]
impl From<ProjectionError> for PyErr {
    fn from(err: ProjectionError) -> PyErr {
        match err {
            ProjectionError::Engine { .. } | ProjectionError::EngineInit(_) => {
                PyRuntimeError::new_err(err.to_string())
            }
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}
