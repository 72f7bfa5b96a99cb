//! Errors for host buffer validation (rank, per-axis extent, and memory layout).
//!
//! This module defines [`BufferError`], raised by the shape validator before
//! any element of a host buffer is read, and [`LayoutFault`], the detail
//! carried by [`BufferError::InvalidLayout`].
//!
//! ## Conventions
//! - **Axes are 0-based** (match Rust/NumPy).
//! - `buffer` names the argument that failed (e.g. `"births"`,
//!   `"deaths.adult_hiv"`) so a caller passing several arrays in one call can
//!   tell which one was rejected.
//! - Rank and extent mismatches both belong to the *InvalidShape* class;
//!   contiguity, alignment, and element-size problems belong to the
//!   *InvalidLayout* class.
use std::fmt;

use thiserror::Error;

/// Result alias for buffer validation and binding.
pub type BufferResult<T> = Result<T, BufferError>;

/// Why a buffer's memory layout was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutFault {
    /// Neither row-major nor column-major contiguous.
    NonContiguous,
    /// Start address is not a multiple of the element alignment.
    Misaligned { address: usize, align: usize },
    /// Element byte size differs from the declared element type.
    ElementSize { expected: usize, actual: usize },
}

impl fmt::Display for LayoutFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutFault::NonContiguous => {
                write!(f, "array must be contiguous in C (row-major) or Fortran (column-major) order")
            }
            LayoutFault::Misaligned { address, align } => {
                write!(f, "array is not properly aligned (address {address:#x}, alignment {align})")
            }
            LayoutFault::ElementSize { expected, actual } => {
                write!(f, "array elements are {actual} bytes wide, expected {expected}")
            }
        }
    }
}

/// Buffer validation failure.
///
/// Every variant is raised before the buffer is reinterpreted, so a failed
/// call never reads (or writes) host memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Number of dimensions differs from the expected rank.
    #[error("{buffer}: array dimension={actual}, expected {expected}")]
    InvalidRank { buffer: &'static str, expected: usize, actual: usize },

    /// One axis has the wrong extent.
    #[error("{buffer}: array dimension {axis} has {actual} elements, expected {expected}")]
    InvalidShape { buffer: &'static str, axis: usize, expected: usize, actual: usize },

    /// Memory is not a supported contiguous layout, or is misaligned.
    #[error("{buffer}: {fault}")]
    InvalidLayout { buffer: &'static str, fault: LayoutFault },
}

impl BufferError {
    /// Name of the offending buffer argument.
    pub fn buffer(&self) -> &'static str {
        match self {
            BufferError::InvalidRank { buffer, .. }
            | BufferError::InvalidShape { buffer, .. }
            | BufferError::InvalidLayout { buffer, .. } => buffer,
        }
    }

    /// `true` for rank and extent mismatches, `false` for layout faults.
    pub fn is_shape_error(&self) -> bool {
        !matches!(self, BufferError::InvalidLayout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Error messages name the buffer, the axis and expected-vs-actual extents.
    //
    // Given
    // -----
    // - An `InvalidShape` error on axis 1 of `births`.
    //
    // Expect
    // ------
    // - The rendered message contains each of those facts.
    fn invalid_shape_message_names_axis_and_extents() {
        let err = BufferError::InvalidShape { buffer: "births", axis: 1, expected: 2, actual: 3 };

        let msg = err.to_string();

        assert_eq!(msg, "births: array dimension 1 has 3 elements, expected 2");
        assert_eq!(err.buffer(), "births");
        assert!(err.is_shape_error());
    }

    #[test]
    // Purpose
    // -------
    // Layout faults render their detail and are classified as layout errors.
    fn misaligned_layout_renders_address() {
        let err = BufferError::InvalidLayout {
            buffer: "uptake",
            fault: LayoutFault::Misaligned { address: 0x1003, align: 8 },
        };

        assert!(err.to_string().contains("0x1003"));
        assert!(!err.is_shape_error());
    }
}
