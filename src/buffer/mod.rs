//! buffer — validation and zero-copy binding of host-owned numeric buffers.
//!
//! Purpose
//! -------
//! Provide the single point at which a host buffer's rank, per-axis extent,
//! element size, contiguity and alignment are checked, and the typed views
//! that are handed to ingestion and to the projection engine afterwards.
//!
//! Key behaviors
//! -------------
//! - [`BufferLayout`] captures buffer metadata from `ndarray` views or from a
//!   foreign host, and classifies it as [`MemoryOrder::RowMajor`] or
//!   [`MemoryOrder::ColumnMajor`].
//! - [`validate_layout`] compares that metadata with an expected shape and
//!   fails fast with a [`BufferError`].
//! - [`BufferView`] / [`BufferViewMut`] are the read-only and read-write
//!   views produced after validation.
//!
//! Invariants & assumptions
//! ------------------------
//! - No element is read before validation succeeds.
//! - Views never own or copy the memory they describe.
//!
//! Testing notes
//! -------------
//! - `validate` carries property tests over random shapes in both orders;
//!   `layout` and `view` carry example-based unit tests.

pub mod errors;
pub mod layout;
pub mod validate;
pub mod view;

pub use self::errors::{BufferError, BufferResult, LayoutFault};
pub use self::layout::{BufferLayout, HostElement, MemoryOrder};
pub use self::validate::validate_layout;
pub use self::view::{BufferView, BufferViewMut};

pub mod prelude {
    pub use super::errors::{BufferError, BufferResult};
    pub use super::layout::{HostElement, MemoryOrder};
    pub use super::view::{BufferView, BufferViewMut};
}
