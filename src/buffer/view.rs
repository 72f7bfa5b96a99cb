//! Zero-copy typed views over validated host buffers.
//!
//! Purpose
//! -------
//! Turn a host buffer into an indexable `ndarray` view after it has passed
//! [`validate_layout`]. Construction is the only place shape and layout are
//! checked; afterwards indexing is a plain offset computation.
//!
//! Key behaviors
//! -------------
//! - [`BufferView`] (read-only, ingestion) and [`BufferViewMut`] (read-write,
//!   shared outputs) wrap `ndarray` dynamic-rank views and dereference to them,
//!   so `view[[t, a]]` resolves correctly for either storage order.
//! - `bind` validates an existing `ndarray` view; `bind_raw` / `bind_raw_mut`
//!   build the view from foreign metadata after validation.
//! - `into_dim` recovers a fixed-rank view for consumers that want static
//!   dimensionality.
//!
//! Invariants & assumptions
//! ------------------------
//! - A bound view never copies; reads and writes address host memory.
//! - The lifetime `'a` is the lifetime of the host buffer. For `bind` it is
//!   inherited from the borrowed `ndarray` view; for the raw binders it is
//!   chosen by the caller under the contract documented on those functions.
use std::ops::{Deref, DerefMut};

use ndarray::{ArrayView, ArrayViewD, ArrayViewMut, ArrayViewMutD, Dimension, IxDyn, ShapeBuilder};

use crate::buffer::{
    errors::{BufferError, BufferResult},
    layout::{BufferLayout, HostElement, MemoryOrder},
    validate::validate_layout,
};

/// Read-only view of a validated host buffer.
#[derive(Debug, Clone)]
pub struct BufferView<'a, T> {
    name: &'static str,
    order: MemoryOrder,
    view: ArrayViewD<'a, T>,
}

/// Read-write view of a validated host buffer.
#[derive(Debug)]
pub struct BufferViewMut<'a, T> {
    name: &'static str,
    order: MemoryOrder,
    view: ArrayViewMutD<'a, T>,
}

impl<'a, T: HostElement> BufferView<'a, T> {
    /// Validate `view` against `expected` and bind it.
    ///
    /// Errors
    /// ------
    /// - Any [`BufferError`] raised by [`validate_layout`].
    pub fn bind<D: Dimension>(
        name: &'static str, view: ArrayView<'a, T, D>, expected: &[usize],
    ) -> BufferResult<Self> {
        let order = validate_layout::<T>(name, &BufferLayout::of_view(&view), expected)?;
        Ok(BufferView { name, order, view: view.into_dyn() })
    }

    /// Validate foreign metadata and bind the memory it describes.
    ///
    /// # Safety
    ///
    /// `layout.address` must point to `layout.len()` initialized elements of
    /// type `T` described by `layout`, valid for reads and not mutated through
    /// another path for the whole of `'a`.
    pub unsafe fn bind_raw(
        name: &'static str, layout: &BufferLayout, expected: &[usize],
    ) -> BufferResult<Self> {
        let order = validate_layout::<T>(name, layout, expected)?;
        let shape = IxDyn(&layout.shape).set_f(order.is_column_major());
        let view = ArrayView::from_shape_ptr(shape, layout.address as *const T);
        Ok(BufferView { name, order, view })
    }

    /// Fixed-rank view of the same memory.
    pub fn into_dim<D: Dimension>(self) -> BufferResult<ArrayView<'a, T, D>> {
        let actual = self.view.ndim();
        self.view.into_dimensionality::<D>().map_err(|_| BufferError::InvalidRank {
            buffer: self.name,
            expected: D::NDIM.unwrap_or(actual),
            actual,
        })
    }
}

impl<'a, T> BufferView<'a, T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn order(&self) -> MemoryOrder {
        self.order
    }

    pub fn view(&self) -> ArrayViewD<'_, T> {
        self.view.view()
    }
}

impl<'a, T> Deref for BufferView<'a, T> {
    type Target = ArrayViewD<'a, T>;

    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

impl<'a, T: HostElement> BufferViewMut<'a, T> {
    /// Validate `view` against `expected` and bind it for writing.
    pub fn bind<D: Dimension>(
        name: &'static str, view: ArrayViewMut<'a, T, D>, expected: &[usize],
    ) -> BufferResult<Self> {
        let order = validate_layout::<T>(name, &BufferLayout::of_view_mut(&view), expected)?;
        Ok(BufferViewMut { name, order, view: view.into_dyn() })
    }

    /// Validate foreign metadata and bind the memory it describes for writing.
    ///
    /// # Safety
    ///
    /// `layout.address` must point to `layout.len()` initialized elements of
    /// type `T` described by `layout`, valid for reads and writes, and not
    /// accessed through another path for the whole of `'a`. Hosts sharing an
    /// output buffer with a projection must keep it alive, and must not
    /// resize or relocate it, for as long as the projection exists.
    pub unsafe fn bind_raw_mut(
        name: &'static str, layout: &BufferLayout, expected: &[usize],
    ) -> BufferResult<Self> {
        let order = validate_layout::<T>(name, layout, expected)?;
        let shape = IxDyn(&layout.shape).set_f(order.is_column_major());
        let view = ArrayViewMut::from_shape_ptr(shape, layout.address as *mut T);
        Ok(BufferViewMut { name, order, view })
    }

    /// Fixed-rank mutable view of the same memory.
    pub fn into_dim<D: Dimension>(self) -> BufferResult<ArrayViewMut<'a, T, D>> {
        let actual = self.view.ndim();
        self.view.into_dimensionality::<D>().map_err(|_| BufferError::InvalidRank {
            buffer: self.name,
            expected: D::NDIM.unwrap_or(actual),
            actual,
        })
    }
}

impl<'a, T> BufferViewMut<'a, T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn order(&self) -> MemoryOrder {
        self.order
    }
}

impl<'a, T> Deref for BufferViewMut<'a, T> {
    type Target = ArrayViewMutD<'a, T>;

    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

impl<'a, T> DerefMut for BufferViewMut<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.view
    }
}
