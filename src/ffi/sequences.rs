//! Tuple and list entry points
//!
//! Sizes and indices are `int64_t`. `GetItem` returns a borrowed
//! reference; `SetItem` and `Append` steal `item` even when they fail.

use super::{borrowed, index, length, new_reference, report, status, stolen};
use crate::builtins::{list, tuple};
use crate::error::{ApiError, ApiResult};
use crate::object::PyObject;
use crate::refcount::{Borrowed, Owned};
use core::ffi::c_int;
use core::ptr;

fn container_size(size: i64) -> ApiResult<usize> {
    usize::try_from(size).map_err(|_| ApiError::Overflow { target: "container size" })
}

type Len = fn(Borrowed<'_>) -> ApiResult<usize>;
type Get = for<'a> fn(Borrowed<'a>, usize) -> ApiResult<Borrowed<'a>>;
type Set = fn(Borrowed<'_>, usize, Owned) -> ApiResult<()>;

/// Shared `SetItem`: `item` is adopted first so every failure releases it
unsafe fn set_item(
    obj: *mut PyObject,
    i: i64,
    item: *mut PyObject,
    len: Len,
    set: Set,
) -> ApiResult<()> {
    let item = stolen(item)?;
    let obj = borrowed(obj)?;
    let i = index(i, len(obj)?)?;
    set(obj, i, item)
}

unsafe fn get_item(obj: *mut PyObject, i: i64, len: Len, get: Get) -> ApiResult<*mut PyObject> {
    let obj = borrowed(obj)?;
    let i = index(i, len(obj)?)?;
    Ok(get(obj, i)?.as_ptr())
}

// ============================================================================
// tuple
// ============================================================================

/// New tuple of `size` empty slots, to be filled with `PyTuple_SetItem`
#[no_mangle]
pub extern "C" fn PyTuple_New(size: i64) -> *mut PyObject {
    new_reference("PyTuple_New", container_size(size).and_then(tuple::new))
}

/// `-1` on failure
///
/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyTuple_Size(obj: *mut PyObject) -> i64 {
    report("PyTuple_Size", borrowed(obj).and_then(tuple::len).map(length), -1)
}

/// Borrowed reference, null on failure
///
/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyTuple_GetItem(obj: *mut PyObject, i: i64) -> *mut PyObject {
    report("PyTuple_GetItem", get_item(obj, i, tuple::len, tuple::get_item), ptr::null_mut())
}

/// Steals `item`; `0` on success, `-1` on failure
///
/// # Safety
/// `obj` must be null or a live object; `item` null or a reference the
/// caller owns.
#[no_mangle]
pub unsafe extern "C" fn PyTuple_SetItem(obj: *mut PyObject, i: i64, item: *mut PyObject) -> c_int {
    status("PyTuple_SetItem", set_item(obj, i, item, tuple::len, tuple::set_item))
}

/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyTuple_Check(obj: *mut PyObject) -> c_int {
    c_int::from(borrowed(obj).is_ok_and(tuple::check))
}

// ============================================================================
// list
// ============================================================================

/// New list of logical length `size`; slots start empty
#[no_mangle]
pub extern "C" fn PyList_New(size: i64) -> *mut PyObject {
    new_reference("PyList_New", container_size(size).and_then(list::new))
}

/// `-1` on failure
///
/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyList_Size(obj: *mut PyObject) -> i64 {
    report("PyList_Size", borrowed(obj).and_then(list::len).map(length), -1)
}

/// Borrowed reference, null on failure
///
/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyList_GetItem(obj: *mut PyObject, i: i64) -> *mut PyObject {
    report("PyList_GetItem", get_item(obj, i, list::len, list::get_item), ptr::null_mut())
}

/// Steals `item`; `0` on success, `-1` on failure
///
/// # Safety
/// `obj` must be null or a live object; `item` null or a reference the
/// caller owns.
#[no_mangle]
pub unsafe extern "C" fn PyList_SetItem(obj: *mut PyObject, i: i64, item: *mut PyObject) -> c_int {
    status("PyList_SetItem", set_item(obj, i, item, list::len, list::set_item))
}

/// Steals `item`; `0` on success, `-1` on failure
///
/// # Safety
/// `obj` must be null or a live object; `item` null or a reference the
/// caller owns.
#[no_mangle]
pub unsafe extern "C" fn PyList_Append(obj: *mut PyObject, item: *mut PyObject) -> c_int {
    let result = stolen(item).and_then(|item| list::append(borrowed(obj)?, item));
    status("PyList_Append", result)
}

/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyList_Check(obj: *mut PyObject) -> c_int {
    c_int::from(borrowed(obj).is_ok_and(list::check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{pyabi_refcnt, PyLong_AsLong, PyLong_FromLong, Py_DECREF, Py_INCREF};

    #[test]
    fn test_tuple_steals_and_borrows() {
        unsafe {
            let t = PyTuple_New(2);
            let a = PyLong_FromLong(1);
            let b = PyLong_FromLong(2);
            assert_eq!(PyTuple_SetItem(t, 0, a), 0);
            assert_eq!(PyTuple_SetItem(t, 1, b), 0);
            assert_eq!(PyTuple_Size(t), 2);

            let item = PyTuple_GetItem(t, 1);
            assert_eq!(item, b);
            assert_eq!(pyabi_refcnt(item), 1);
            assert_eq!(PyLong_AsLong(item), 2);

            Py_DECREF(t.cast());
        }
    }

    #[test]
    fn test_failed_set_item_releases_item() {
        unsafe {
            let t = PyTuple_New(1);
            let item = PyLong_FromLong(9);
            Py_INCREF(item.cast());
            assert_eq!(pyabi_refcnt(item), 2);

            assert_eq!(PyTuple_SetItem(t, 5, item), -1);
            assert_eq!(pyabi_refcnt(item), 1);
            Py_INCREF(item.cast());
            assert_eq!(PyTuple_SetItem(t, -1, item), -1);
            assert_eq!(pyabi_refcnt(item), 1);

            Py_DECREF(item.cast());
            Py_DECREF(t.cast());
        }
    }

    #[test]
    fn test_list_append_and_index_errors() {
        unsafe {
            let l = PyList_New(0);
            for v in [10, 20, 30] {
                assert_eq!(PyList_Append(l, PyLong_FromLong(v)), 0);
            }
            assert_eq!(PyList_Size(l), 3);
            assert_eq!(PyLong_AsLong(PyList_GetItem(l, 2)), 30);
            assert!(PyList_GetItem(l, 3).is_null());
            assert!(PyList_GetItem(l, -1).is_null());
            assert_eq!(PyList_Check(l), 1);
            assert_eq!(PyTuple_Check(l), 0);
            assert_eq!(PyTuple_Size(l), -1);

            Py_DECREF(l.cast());
        }
    }

    #[test]
    fn test_negative_sizes_fail() {
        assert!(PyTuple_New(-1).is_null());
        assert!(PyList_New(-1).is_null());
    }

    #[test]
    fn test_null_arguments() {
        unsafe {
            assert_eq!(PyList_Append(ptr::null_mut(), PyLong_FromLong(1)), -1);
            let l = PyList_New(0);
            assert_eq!(PyList_Append(l, ptr::null_mut()), -1);
            assert_eq!(PyList_Size(l), 0);
            assert_eq!(PyTuple_Size(ptr::null_mut()), -1);
            Py_DECREF(l.cast());
        }
    }
}
