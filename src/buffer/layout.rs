//! Buffer layout metadata — what the validator inspects before any read.
//!
//! Purpose
//! -------
//! Describe a host-owned buffer by its metadata only (start address, element
//! size, shape, byte strides) so that rank, extent, contiguity and alignment
//! can be checked without touching the memory itself.
//!
//! Key behaviors
//! -------------
//! - [`BufferLayout::of_view`] / [`BufferLayout::of_view_mut`] read the
//!   metadata of an `ndarray` view; [`BufferLayout::from_raw`] accepts the
//!   metadata a foreign host reports (e.g. NumPy's `data`, `shape`, and
//!   byte `strides`).
//! - [`BufferLayout::memory_order`] classifies the layout as row-major or
//!   column-major contiguous, or reports a [`LayoutFault`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Strides are stored in **bytes**, as NumPy reports them. `ndarray`
//!   element strides are scaled by the element size on the way in.
//! - Axes of extent 1 place no constraint on their stride (NumPy's rule), and
//!   a buffer with any zero-extent axis is trivially contiguous.
//! - A buffer that is both C- and F-contiguous (rank ≤ 1, or all but one
//!   axis of extent 1) is reported as [`MemoryOrder::RowMajor`].
//!
//! Conventions
//! -----------
//! - "Row-major" is NumPy order `"C"`: the last axis varies fastest.
//!   "Column-major" is order `"F"`: the first axis varies fastest.
use ndarray::{ArrayView, ArrayViewMut, Dimension};

use crate::buffer::errors::LayoutFault;

/// Element types that may cross the host boundary.
pub trait HostElement: Copy + Send + Sync + 'static {
    /// NumPy-style dtype name, used in diagnostics.
    const DTYPE: &'static str;

    /// Widen to `f64` for conversion routines. Exact for every implementor.
    fn to_f64(self) -> f64;
}

impl HostElement for f64 {
    const DTYPE: &'static str = "float64";

    fn to_f64(self) -> f64 {
        self
    }
}

impl HostElement for i32 {
    const DTYPE: &'static str = "int32";

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

/// Contiguous storage order of a validated buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryOrder {
    /// C order, last axis fastest.
    #[default]
    RowMajor,
    /// Fortran order, first axis fastest.
    ColumnMajor,
}

impl MemoryOrder {
    pub fn is_column_major(self) -> bool {
        matches!(self, MemoryOrder::ColumnMajor)
    }
}

/// Metadata of a host buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferLayout {
    /// Start address of element `[0, 0, ..]`.
    pub address: usize,
    /// Size in bytes of one element as the host reports it.
    pub elem_size: usize,
    /// Extent of every axis.
    pub shape: Vec<usize>,
    /// Byte stride of every axis.
    pub byte_strides: Vec<isize>,
}

impl BufferLayout {
    /// Layout reported by a foreign host.
    pub fn from_raw(
        address: usize, elem_size: usize, shape: &[usize], byte_strides: &[isize],
    ) -> BufferLayout {
        BufferLayout {
            address,
            elem_size,
            shape: shape.to_vec(),
            byte_strides: byte_strides.to_vec(),
        }
    }

    /// Layout of a read-only `ndarray` view.
    pub fn of_view<T, D: Dimension>(view: &ArrayView<'_, T, D>) -> BufferLayout {
        Self::from_elem_strides::<T>(view.as_ptr() as usize, view.shape(), view.strides())
    }

    /// Layout of a mutable `ndarray` view.
    pub fn of_view_mut<T, D: Dimension>(view: &ArrayViewMut<'_, T, D>) -> BufferLayout {
        Self::from_elem_strides::<T>(view.as_ptr() as usize, view.shape(), view.strides())
    }

    fn from_elem_strides<T>(address: usize, shape: &[usize], strides: &[isize]) -> BufferLayout {
        let elem_size = std::mem::size_of::<T>();
        let byte_strides = strides.iter().map(|&s| s * elem_size as isize).collect();
        BufferLayout { address, elem_size, shape: shape.to_vec(), byte_strides }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Classify the layout for element type `T`.
    ///
    /// Checks, in order: element size, contiguity (row-major first), and
    /// start-address alignment. Zero-sized buffers skip the alignment check
    /// since nothing will ever be read through them.
    pub fn memory_order<T: HostElement>(&self) -> Result<MemoryOrder, LayoutFault> {
        let expected = std::mem::size_of::<T>();
        if self.elem_size != expected {
            return Err(LayoutFault::ElementSize { expected, actual: self.elem_size });
        }

        let order = if self.is_packed((0..self.rank()).rev()) {
            MemoryOrder::RowMajor
        } else if self.is_packed(0..self.rank()) {
            MemoryOrder::ColumnMajor
        } else {
            return Err(LayoutFault::NonContiguous);
        };

        let align = std::mem::align_of::<T>();
        if !self.is_empty() && self.address % align != 0 {
            return Err(LayoutFault::Misaligned { address: self.address, align });
        }
        Ok(order)
    }

    /// `true` when walking `axes` fastest-first visits dense, ascending memory.
    fn is_packed(&self, axes: impl Iterator<Item = usize>) -> bool {
        if self.is_empty() {
            return true;
        }
        let mut expected = self.elem_size as isize;
        for axis in axes {
            let extent = self.shape[axis];
            if extent != 1 && self.byte_strides[axis] != expected {
                return false;
            }
            expected *= extent as isize;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, ShapeBuilder, s};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Detection of row-major and column-major contiguity from ndarray views.
    // - Rejection of sliced (strided) and transposed-then-sliced views.
    // - Alignment and element-size faults on raw layouts.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A freshly allocated C-order array is detected as row-major.
    fn c_order_array_is_row_major() {
        let arr = Array3::<f64>::zeros((4, 3, 2));

        let layout = BufferLayout::of_view(&arr.view());

        assert_eq!(layout.byte_strides, vec![48, 16, 8]);
        assert_eq!(layout.memory_order::<f64>(), Ok(MemoryOrder::RowMajor));
    }

    #[test]
    // Purpose
    // -------
    // A Fortran-order array is detected as column-major.
    fn f_order_array_is_column_major() {
        let arr = Array3::<f64>::zeros((4, 3, 2).f());

        let layout = BufferLayout::of_view(&arr.view());

        assert_eq!(layout.memory_order::<f64>(), Ok(MemoryOrder::ColumnMajor));
    }

    #[test]
    // Purpose
    // -------
    // Every-other-column slices are neither C nor F contiguous.
    fn strided_slice_is_rejected() {
        let arr = Array2::<f64>::zeros((4, 6));
        let view = arr.slice(s![.., ..;2]);

        let layout = BufferLayout::of_view(&view);

        assert_eq!(layout.memory_order::<f64>(), Err(LayoutFault::NonContiguous));
    }

    #[test]
    // Purpose
    // -------
    // Axes of extent one do not constrain their stride, and a vector is
    // reported as row-major.
    fn unit_axes_and_vectors_are_row_major() {
        let layout = BufferLayout::from_raw(0x1000, 8, &[5, 1], &[8, 9999]);
        assert_eq!(layout.memory_order::<f64>(), Ok(MemoryOrder::RowMajor));

        let vector = BufferLayout::from_raw(0x1000, 8, &[7], &[8]);
        assert_eq!(vector.memory_order::<f64>(), Ok(MemoryOrder::RowMajor));
    }

    #[test]
    // Purpose
    // -------
    // Raw layouts are rejected when misaligned or when the element width does
    // not match the declared element type.
    //
    // Given
    // -----
    // - A contiguous [2, 2] f64 layout starting at an odd address.
    // - A contiguous layout reporting 4-byte elements checked as f64.
    //
    // Expect
    // ------
    // - `Misaligned` and `ElementSize` faults respectively.
    fn raw_layout_faults() {
        let odd = BufferLayout::from_raw(0x1003, 8, &[2, 2], &[16, 8]);
        assert_eq!(
            odd.memory_order::<f64>(),
            Err(LayoutFault::Misaligned { address: 0x1003, align: 8 })
        );

        let narrow = BufferLayout::from_raw(0x1000, 4, &[2, 2], &[8, 4]);
        assert_eq!(
            narrow.memory_order::<f64>(),
            Err(LayoutFault::ElementSize { expected: 8, actual: 4 })
        );
        assert_eq!(narrow.memory_order::<i32>(), Ok(MemoryOrder::RowMajor));
    }

    #[test]
    // Purpose
    // -------
    // Zero-sized buffers are contiguous regardless of strides or address.
    fn empty_buffer_is_contiguous() {
        let layout = BufferLayout::from_raw(0x1001, 8, &[0, 3], &[0, 0]);

        assert!(layout.is_empty());
        assert_eq!(layout.memory_order::<f64>(), Ok(MemoryOrder::RowMajor));
    }
}
