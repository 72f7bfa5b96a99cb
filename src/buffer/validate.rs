//! Shape validation for host buffers.
//!
//! [`validate_layout`] is the single gate every host buffer passes before it
//! is reinterpreted. Checks run in a fixed order and stop at the first
//! failure: rank, per-axis extent, element size, contiguity, alignment.
use crate::buffer::{
    errors::{BufferError, BufferResult},
    layout::{BufferLayout, HostElement, MemoryOrder},
};

/// Validate `layout` against `expected` for element type `T`.
///
/// Parameters
/// ----------
/// - `buffer`: `&'static str`
///   Argument name reported in errors.
/// - `layout`: `&BufferLayout`
///   Metadata of the host buffer.
/// - `expected`: `&[usize]`
///   Exact shape; its length is the expected rank. No broadcasting, no
///   trimming.
///
/// Returns
/// -------
/// `BufferResult<MemoryOrder>`
///   The detected contiguous ordering on success.
///
/// Errors
/// ------
/// - `BufferError::InvalidRank` when `layout.rank() != expected.len()`.
/// - `BufferError::InvalidShape` naming the first axis whose extent differs.
/// - `BufferError::InvalidLayout` for element size, contiguity, or alignment
///   faults.
pub fn validate_layout<T: HostElement>(
    buffer: &'static str, layout: &BufferLayout, expected: &[usize],
) -> BufferResult<MemoryOrder> {
    if layout.rank() != expected.len() {
        return Err(BufferError::InvalidRank {
            buffer,
            expected: expected.len(),
            actual: layout.rank(),
        });
    }
    for (axis, (&actual, &want)) in layout.shape.iter().zip(expected).enumerate() {
        if actual != want {
            return Err(BufferError::InvalidShape { buffer, axis, expected: want, actual });
        }
    }
    layout.memory_order::<T>().map_err(|fault| BufferError::InvalidLayout { buffer, fault })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::errors::LayoutFault;
    use ndarray::{Array, ArrayD, IxDyn, ShapeBuilder, s};
    use proptest::prelude::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Acceptance of exact shapes in both contiguous orders.
    // - Rejection on one-axis extent change, rank change, and non-contiguity.
    // - Check ordering (rank before extent before layout).
    // -------------------------------------------------------------------------

    fn shape_strategy() -> impl Strategy<Value = Vec<usize>> {
        prop::collection::vec(1usize..5, 1..=5)
    }

    proptest! {
        #[test]
        // Purpose
        // -------
        // Exact shapes are accepted in row-major and column-major order.
        fn accepts_exact_shape_in_both_orders(shape in shape_strategy()) {
            let c = ArrayD::<f64>::zeros(IxDyn(&shape));
            let f = ArrayD::<f64>::zeros(IxDyn(&shape).f());

            let c_order = validate_layout::<f64>("x", &BufferLayout::of_view(&c.view()), &shape);
            let f_order = validate_layout::<f64>("x", &BufferLayout::of_view(&f.view()), &shape);

            prop_assert_eq!(c_order, Ok(MemoryOrder::RowMajor));
            prop_assert!(f_order.is_ok());
        }

        #[test]
        // Purpose
        // -------
        // Changing any single axis extent is reported against that axis.
        fn rejects_one_axis_mismatch(shape in shape_strategy(), pick in any::<prop::sample::Index>()) {
            let axis = pick.index(shape.len());
            let arr = ArrayD::<f64>::zeros(IxDyn(&shape));
            let mut expected = shape.clone();
            expected[axis] += 1;

            let result = validate_layout::<f64>("x", &BufferLayout::of_view(&arr.view()), &expected);

            prop_assert_eq!(
                result,
                Err(BufferError::InvalidShape {
                    buffer: "x",
                    axis,
                    expected: shape[axis] + 1,
                    actual: shape[axis],
                })
            );
        }

        #[test]
        // Purpose
        // -------
        // A rank mismatch is reported before any extent comparison.
        fn rejects_rank_mismatch(shape in shape_strategy()) {
            let arr = ArrayD::<f64>::zeros(IxDyn(&shape));
            let mut expected = shape.clone();
            expected.push(1);

            let result = validate_layout::<f64>("x", &BufferLayout::of_view(&arr.view()), &expected);

            prop_assert_eq!(
                result,
                Err(BufferError::InvalidRank { buffer: "x", expected: shape.len() + 1, actual: shape.len() })
            );
        }

        #[test]
        // Purpose
        // -------
        // A view skipping every other element along the last axis is rejected
        // as non-contiguous even though its shape matches.
        fn rejects_strided_views(mut shape in shape_strategy()) {
            let last = shape.len() - 1;
            shape[last] = shape[last].max(2);
            let mut backing = shape.clone();
            backing[last] *= 2;
            let arr = ArrayD::<f64>::zeros(IxDyn(&backing));
            let view = arr.slice_each_axis(|ax| {
                if ax.axis.index() == last { ndarray::Slice::new(0, None, 2) } else { ndarray::Slice::from(..) }
            });

            let result = validate_layout::<f64>("x", &BufferLayout::of_view(&view), &shape);

            prop_assert_eq!(
                result,
                Err(BufferError::InvalidLayout { buffer: "x", fault: LayoutFault::NonContiguous })
            );
        }
    }

    #[test]
    // Purpose
    // -------
    // A transposed Fortran array is row-major; a transposed slice is rejected.
    fn transposes_and_slices() {
        let f = Array::<f64, _>::zeros((3, 5).f());
        let t = f.t();
        assert_eq!(
            validate_layout::<f64>("x", &BufferLayout::of_view(&t), &[5, 3]),
            Ok(MemoryOrder::RowMajor)
        );

        let c = Array::<f64, _>::zeros((6, 5));
        let sliced = c.slice(s![1..4, ..]);
        assert_eq!(
            validate_layout::<f64>("x", &BufferLayout::of_view(&sliced), &[3, 5]),
            Ok(MemoryOrder::RowMajor)
        );
        let sliced_cols = c.slice(s![.., 1..4]);
        assert!(validate_layout::<f64>("x", &BufferLayout::of_view(&sliced_cols), &[6, 3]).is_err());
    }

    #[test]
    // Purpose
    // -------
    // An int32 buffer validated as f64 fails on element size, after the shape
    // checks have passed.
    fn element_size_is_checked_after_shape() {
        let ints = Array::<i32, _>::zeros((2, 3));
        let layout = BufferLayout::of_view(&ints.view());

        assert!(matches!(
            validate_layout::<f64>("x", &layout, &[2, 4]),
            Err(BufferError::InvalidShape { axis: 1, .. })
        ));
        assert_eq!(
            validate_layout::<f64>("x", &layout, &[2, 3]),
            Err(BufferError::InvalidLayout {
                buffer: "x",
                fault: LayoutFault::ElementSize { expected: 8, actual: 4 },
            })
        );
    }
}
