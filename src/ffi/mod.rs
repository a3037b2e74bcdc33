//! C surface - CPython-compatible entry points
//!
//! Design: every entry point converts its raw arguments at the boundary,
//! calls the Rust API and maps an `ApiError` onto the entry point's
//! failure sentinel:
//! 1. Null for object and pointer returns
//! 2. `-1` for status, size and integer returns
//! 3. `0` for the `PyArg_*` family (C "false")
//! 4. `-1.0` for double returns
//!
//! There is no error indicator to query afterwards; the failure is logged
//! at `warn` level. Where `-1` is also a valid value, a `pyabi_*_checked`
//! variant returns a status and writes the value through a pointer.

#![allow(non_snake_case, non_upper_case_globals)]

mod args;
mod memory;
mod methods;
mod refcount;
mod scalars;
mod sequences;

pub use args::{PyArg_ParseTupleAndKeywordsSlots, PyArg_ParseTupleSlots, Py_BuildValueSlots};
pub use memory::{
    PyMem_Calloc, PyMem_Free, PyMem_Malloc, PyMem_RawCalloc, PyMem_RawFree, PyMem_RawMalloc,
    PyMem_RawRealloc, PyMem_Realloc, PyObject_Calloc, PyObject_Free, PyObject_Malloc,
    PyObject_Realloc,
};
pub use methods::{pyabi_call_method, pyabi_call_table};
pub use refcount::{pyabi_refcnt, pyabi_size, pyabi_type_name, Py_DECREF, Py_INCREF, Py_XDECREF, Py_XINCREF};
pub use scalars::{
    pyabi_float_as_double_checked, pyabi_long_as_long_checked, pyabi_long_as_long_long_checked,
    pyabi_long_as_size_t_checked, PyBool_Check, PyBool_FromLong, PyFloat_AsDouble, PyFloat_Check,
    PyFloat_CheckExact, PyFloat_FromDouble, PyLong_AsLong, PyLong_AsLongLong, PyLong_AsSize_t,
    PyLong_AsUnsignedLong, PyLong_Check, PyLong_CheckExact, PyLong_FromLong, PyLong_FromLongLong,
    PyLong_FromSize_t, PyLong_FromUnsignedLong, PyUnicode_AsUTF8, PyUnicode_Check,
    PyUnicode_FromString, ObjectPtr, Py_False, Py_None, Py_True,
};
pub use sequences::{
    PyList_Append, PyList_Check, PyList_GetItem, PyList_New, PyList_SetItem, PyList_Size,
    PyTuple_Check, PyTuple_GetItem, PyTuple_New, PyTuple_SetItem, PyTuple_Size,
};

use crate::error::{ApiError, ApiResult};
use crate::logging::log_entry_failure;
use crate::object::PyObject;
use crate::refcount::{Borrowed, Owned};
use core::ffi::c_int;

/// Unwrap `result`, or log the error and return `sentinel`
#[inline]
pub(crate) fn report<T>(fn_name: &str, result: ApiResult<T>, sentinel: T) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            log_entry_failure(fn_name, &err);
            sentinel
        }
    }
}

/// New-reference return: ownership passes to the caller, null on failure
#[inline]
pub(crate) fn new_reference(fn_name: &str, result: ApiResult<Owned>) -> *mut PyObject {
    report(fn_name, result.map(Owned::into_raw), core::ptr::null_mut())
}

/// `0` on success, `-1` on failure
#[inline]
pub(crate) fn status(fn_name: &str, result: ApiResult<()>) -> c_int {
    report(fn_name, result.map(|()| 0), -1)
}

/// # Safety
/// `op` must be null or a live object for `'a`.
#[inline]
pub(crate) unsafe fn borrowed<'a>(op: *mut PyObject) -> ApiResult<Borrowed<'a>> {
    Borrowed::from_raw(op).ok_or(ApiError::NullReference)
}

/// Adopt a stolen reference
///
/// # Safety
/// `op` must be null or a live object whose reference the caller gives up.
#[inline]
pub(crate) unsafe fn stolen(op: *mut PyObject) -> ApiResult<Owned> {
    Owned::from_raw(op).ok_or(ApiError::NullReference)
}

/// Convert a C index against a container of length `len`
#[inline]
pub(crate) fn index(index: i64, len: usize) -> ApiResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(ApiError::IndexOutOfRange {
            index: index as isize,
            len: len as isize,
        })
}

/// Convert a container length to the C `int64_t` result
#[inline]
pub(crate) fn length(len: usize) -> i64 {
    len as i64
}
