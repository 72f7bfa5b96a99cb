//! PyO3 glue: numpy arrays to views the projection can validate and bind.
//!
//! Two lifetimes of access exist at the Python boundary:
//! - ingestion arguments are read (migration patterns also written) during a
//!   single call, so they go through numpy's conversion and borrow tracking
//!   via [`readonly`] and [`readwrite`];
//! - shared inputs and outputs are referenced for the projection's lifetime,
//!   so [`persistent`] and [`persistent_mut`] build `'static` views over
//!   host memory under a keep-alive contract upheld by the caller.
//!
//! Only the element type is checked here. Shape and layout checks are the
//! validator's, which reports them with the argument name.
use ndarray::{ArrayViewD, ArrayViewMutD, IxDyn};
use numpy::{
    AllowTypeChange, Element, PyArrayDescrMethods, PyArrayDyn, PyArrayLikeDyn, PyArrayMethods,
    PyReadwriteArrayDyn, PyUntypedArrayMethods,
};
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
};

use crate::{
    buffer::{BufferError, BufferLayout, BufferView, BufferViewMut, HostElement},
    projection::ProjectionError,
};

fn typed<'a, 'py, T>(
    name: &'static str, obj: &'a Bound<'py, PyAny>,
) -> PyResult<&'a Bound<'py, PyArrayDyn<T>>>
where
    T: HostElement + Element,
{
    obj.downcast::<PyArrayDyn<T>>().map_err(|_| {
        PyTypeError::new_err(format!("{name}: expected a numpy.ndarray of {}", T::DTYPE))
    })
}

fn buffer_err(err: BufferError) -> PyErr {
    ProjectionError::from(err).into()
}

/// Metadata numpy reports for `array`, strides in bytes.
pub fn host_layout<T: Element>(array: &Bound<'_, PyArrayDyn<T>>) -> BufferLayout {
    BufferLayout::from_raw(
        array.data() as usize,
        array.dtype().itemsize(),
        array.shape(),
        array.strides(),
    )
}

/// Borrow an argument for reading during one call.
///
/// Array-likes of another element type (lists, integer arrays) are
/// converted first; arrays of the right type are used in place.
pub fn readonly<'py, T>(
    name: &'static str, obj: &Bound<'py, PyAny>,
) -> PyResult<PyArrayLikeDyn<'py, T, AllowTypeChange>>
where
    T: HostElement + Element,
    Vec<T>: FromPyObject<'py>,
{
    obj.extract().map_err(|err: PyErr| {
        PyTypeError::new_err(format!("{name}: expected an array-like of {}: {err}", T::DTYPE))
    })
}

/// Borrow an argument for writing during one call.
///
/// Fails for read-only arrays and for arrays already borrowed, which
/// includes the same array passed twice.
pub fn readwrite<'py, T>(
    name: &'static str, obj: &Bound<'py, PyAny>,
) -> PyResult<PyReadwriteArrayDyn<'py, T>>
where
    T: HostElement + Element,
{
    typed::<T>(name, obj)?
        .try_readwrite()
        .map_err(|err| PyValueError::new_err(format!("{name}: {err}")))
}

/// `'static` read-only view of a shared input.
///
/// # Safety
///
/// The caller must hold a strong reference to `obj` for as long as the view
/// lives, and the host must not resize or reallocate the array meanwhile.
pub unsafe fn persistent<T>(
    name: &'static str, obj: &Bound<'_, PyAny>,
) -> PyResult<ArrayViewD<'static, T>>
where
    T: HostElement + Element,
{
    let layout = host_layout(typed::<T>(name, obj)?);
    let view = unsafe { BufferView::<T>::bind_raw(name, &layout, &layout.shape) };
    let view = view.map_err(buffer_err)?;
    view.into_dim::<IxDyn>().map_err(buffer_err)
}

/// `'static` mutable view of an output array.
///
/// The array must be writeable and not borrowed elsewhere at binding time.
///
/// # Safety
///
/// As for [`persistent`]. In addition the host must not pass the same memory
/// as two outputs, since the engine writes through both views.
pub unsafe fn persistent_mut<T>(
    name: &'static str, obj: &Bound<'_, PyAny>,
) -> PyResult<ArrayViewMutD<'static, T>>
where
    T: HostElement + Element,
{
    let array = typed::<T>(name, obj)?;
    drop(readwrite::<T>(name, obj)?);
    let layout = host_layout(array);
    let view = unsafe { BufferViewMut::<T>::bind_raw_mut(name, &layout, &layout.shape) };
    let view = view.map_err(buffer_err)?;
    view.into_dim::<IxDyn>().map_err(buffer_err)
}
