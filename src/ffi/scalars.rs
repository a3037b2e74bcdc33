//! Scalar boxes for C callers: int, bool, float, str and the singletons
//!
//! `As*` conversions return the documented sentinel on failure (`-1`,
//! `(size_t)-1`, `-1.0`). Because those are valid values too, the
//! `pyabi_*_checked` variants report success separately.

use super::{borrowed, new_reference, report};
use crate::builtins::{float, long, string};
use crate::error::ApiResult;
use crate::object::singletons::{FALSE, NONE, TRUE};
use crate::object::PyObject;
use core::ffi::{c_char, c_double, c_int, c_long, c_longlong, c_ulong, CStr};
use core::ptr::{self, addr_of};

/// Exported address of an immortal singleton (`extern PyObject *Py_None`)
#[repr(transparent)]
pub struct ObjectPtr(*mut PyObject);

// Points at an immortal static that is never written through
unsafe impl Sync for ObjectPtr {}

impl ObjectPtr {
    #[inline]
    pub fn as_ptr(&self) -> *mut PyObject {
        self.0
    }
}

#[no_mangle]
pub static Py_None: ObjectPtr = ObjectPtr(addr_of!(NONE).cast_mut());

#[no_mangle]
pub static Py_True: ObjectPtr = ObjectPtr(addr_of!(TRUE.ob_base).cast_mut());

#[no_mangle]
pub static Py_False: ObjectPtr = ObjectPtr(addr_of!(FALSE.ob_base).cast_mut());

/// Write `result` through `out` on success; `0`/`-1` status
unsafe fn checked<T>(fn_name: &str, result: ApiResult<T>, out: *mut T) -> c_int {
    match report(fn_name, result.map(Some), None) {
        Some(value) => {
            if !out.is_null() {
                *out = value;
            }
            0
        }
        None => -1,
    }
}

fn as_c_bool(value: bool) -> c_int {
    c_int::from(value)
}

// ============================================================================
// int
// ============================================================================

#[no_mangle]
pub extern "C" fn PyLong_FromLong(value: c_long) -> *mut PyObject {
    new_reference("PyLong_FromLong", long::from_i128(value.into()))
}

#[no_mangle]
pub extern "C" fn PyLong_FromUnsignedLong(value: c_ulong) -> *mut PyObject {
    new_reference("PyLong_FromUnsignedLong", long::from_i128(value.into()))
}

#[no_mangle]
pub extern "C" fn PyLong_FromLongLong(value: c_longlong) -> *mut PyObject {
    new_reference("PyLong_FromLongLong", long::from_i128(value.into()))
}

#[no_mangle]
pub extern "C" fn PyLong_FromSize_t(value: usize) -> *mut PyObject {
    new_reference("PyLong_FromSize_t", long::from_size_t(value))
}

/// `-1` on failure
///
/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyLong_AsLong(obj: *mut PyObject) -> c_long {
    let result = borrowed(obj).and_then(|o| long::as_native::<c_long>(o, "long"));
    report("PyLong_AsLong", result, -1)
}

/// `-1` on failure
///
/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyLong_AsLongLong(obj: *mut PyObject) -> c_longlong {
    let result = borrowed(obj).and_then(|o| long::as_native::<c_longlong>(o, "long long"));
    report("PyLong_AsLongLong", result, -1)
}

/// `(unsigned long)-1` on failure
///
/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyLong_AsUnsignedLong(obj: *mut PyObject) -> c_ulong {
    let result = borrowed(obj).and_then(|o| long::as_native::<c_ulong>(o, "unsigned long"));
    report("PyLong_AsUnsignedLong", result, c_ulong::MAX)
}

/// `(size_t)-1` on failure
///
/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyLong_AsSize_t(obj: *mut PyObject) -> usize {
    let result = borrowed(obj).and_then(long::as_size_t);
    report("PyLong_AsSize_t", result, usize::MAX)
}

/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyLong_Check(obj: *mut PyObject) -> c_int {
    as_c_bool(borrowed(obj).is_ok_and(long::check))
}

/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyLong_CheckExact(obj: *mut PyObject) -> c_int {
    as_c_bool(borrowed(obj).is_ok_and(long::check_exact))
}

/// # Safety
/// `obj` must be null or a live object; `out` null or writable.
#[no_mangle]
pub unsafe extern "C" fn pyabi_long_as_long_checked(obj: *mut PyObject, out: *mut c_long) -> c_int {
    let result = borrowed(obj).and_then(|o| long::as_native::<c_long>(o, "long"));
    checked("pyabi_long_as_long_checked", result, out)
}

/// # Safety
/// `obj` must be null or a live object; `out` null or writable.
#[no_mangle]
pub unsafe extern "C" fn pyabi_long_as_long_long_checked(
    obj: *mut PyObject,
    out: *mut c_longlong,
) -> c_int {
    let result = borrowed(obj).and_then(|o| long::as_native::<c_longlong>(o, "long long"));
    checked("pyabi_long_as_long_long_checked", result, out)
}

/// # Safety
/// `obj` must be null or a live object; `out` null or writable.
#[no_mangle]
pub unsafe extern "C" fn pyabi_long_as_size_t_checked(obj: *mut PyObject, out: *mut usize) -> c_int {
    let result = borrowed(obj).and_then(long::as_size_t);
    checked("pyabi_long_as_size_t_checked", result, out)
}

// ============================================================================
// bool
// ============================================================================

/// New reference to `Py_True` for non-zero, `Py_False` otherwise
#[no_mangle]
pub extern "C" fn PyBool_FromLong(value: c_long) -> *mut PyObject {
    long::from_bool(value != 0).into_raw()
}

/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyBool_Check(obj: *mut PyObject) -> c_int {
    as_c_bool(borrowed(obj).is_ok_and(long::bool_check))
}

// ============================================================================
// float
// ============================================================================

#[no_mangle]
pub extern "C" fn PyFloat_FromDouble(value: c_double) -> *mut PyObject {
    new_reference("PyFloat_FromDouble", float::from_double(value))
}

/// `-1.0` on failure; integer boxes convert
///
/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyFloat_AsDouble(obj: *mut PyObject) -> c_double {
    let result = borrowed(obj).and_then(float::as_double);
    report("PyFloat_AsDouble", result, -1.0)
}

/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyFloat_Check(obj: *mut PyObject) -> c_int {
    as_c_bool(borrowed(obj).is_ok_and(float::check))
}

/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyFloat_CheckExact(obj: *mut PyObject) -> c_int {
    as_c_bool(borrowed(obj).is_ok_and(float::check_exact))
}

/// # Safety
/// `obj` must be null or a live object; `out` null or writable.
#[no_mangle]
pub unsafe extern "C" fn pyabi_float_as_double_checked(obj: *mut PyObject, out: *mut c_double) -> c_int {
    let result = borrowed(obj).and_then(float::as_double);
    checked("pyabi_float_as_double_checked", result, out)
}

// ============================================================================
// str
// ============================================================================

/// New text box from a NUL-terminated UTF-8 string
///
/// # Safety
/// `text` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn PyUnicode_FromString(text: *const c_char) -> *mut PyObject {
    let result = if text.is_null() {
        Err(crate::error::ApiError::NullReference)
    } else {
        string::from_c_str(CStr::from_ptr(text))
    };
    new_reference("PyUnicode_FromString", result)
}

/// UTF-8 contents, valid while `obj` lives; null on failure
///
/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyUnicode_AsUTF8(obj: *mut PyObject) -> *const c_char {
    let result = borrowed(obj).and_then(string::as_str).map(|s| s.as_ptr().cast());
    report("PyUnicode_AsUTF8", result, ptr::null())
}

/// # Safety
/// `obj` must be null or a live object.
#[no_mangle]
pub unsafe extern "C" fn PyUnicode_Check(obj: *mut PyObject) -> c_int {
    as_c_bool(borrowed(obj).is_ok_and(string::check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refcount;

    #[test]
    fn test_singleton_statics_are_the_singletons() {
        assert_eq!(Py_None.as_ptr(), crate::object::none().as_ptr());
        assert_eq!(Py_True.as_ptr(), crate::object::bool_object(true).as_ptr());
        assert_eq!(Py_False.as_ptr(), crate::object::bool_object(false).as_ptr());
    }

    #[test]
    fn test_long_sentinels() {
        unsafe {
            let f = PyFloat_FromDouble(1.5);
            assert_eq!(PyLong_AsLong(f), -1);

            let mut out: c_long = 7;
            assert_eq!(pyabi_long_as_long_checked(f, &mut out), -1);
            assert_eq!(out, 7);

            let n = PyLong_FromLong(-1);
            assert_eq!(PyLong_AsLong(n), -1);
            assert_eq!(pyabi_long_as_long_checked(n, &mut out), 0);
            assert_eq!(out, -1);

            assert_eq!(PyLong_AsSize_t(n), usize::MAX);
            assert_eq!(PyLong_AsUnsignedLong(n), c_ulong::MAX);

            refcount::xdecref(f);
            refcount::xdecref(n);
        }
    }

    #[test]
    fn test_bool_is_int_but_not_exactly() {
        unsafe {
            let t = PyBool_FromLong(5);
            assert_eq!(t, Py_True.as_ptr());
            assert_eq!(PyLong_Check(t), 1);
            assert_eq!(PyLong_CheckExact(t), 0);
            assert_eq!(PyBool_Check(t), 1);
            assert_eq!(PyLong_AsLong(t), 1);
            assert_eq!(PyFloat_AsDouble(PyBool_FromLong(0)), 0.0);
        }
    }

    #[test]
    fn test_float_conversions() {
        unsafe {
            let f = PyFloat_FromDouble(2.5);
            assert_eq!(PyFloat_AsDouble(f), 2.5);
            assert_eq!(PyFloat_Check(f), 1);
            assert_eq!(PyFloat_CheckExact(f), 1);

            let n = PyLong_FromLong(3);
            assert_eq!(PyFloat_AsDouble(n), 3.0);
            assert_eq!(PyFloat_Check(n), 0);

            assert_eq!(PyFloat_AsDouble(ptr::null_mut()), -1.0);
            let mut out = 0.0;
            assert_eq!(pyabi_float_as_double_checked(ptr::null_mut(), &mut out), -1);

            refcount::xdecref(f);
            refcount::xdecref(n);
        }
    }

    #[test]
    fn test_unicode_round_trip() {
        unsafe {
            let s = PyUnicode_FromString(c"héllo".as_ptr());
            assert_eq!(PyUnicode_Check(s), 1);
            assert_eq!(CStr::from_ptr(PyUnicode_AsUTF8(s)).to_str().unwrap(), "héllo");
            assert!(PyUnicode_FromString(ptr::null()).is_null());
            assert!(PyUnicode_AsUTF8(Py_None.as_ptr()).is_null());
            refcount::xdecref(s);
        }
    }

    #[test]
    fn test_checks_reject_null() {
        unsafe {
            assert_eq!(PyLong_Check(ptr::null_mut()), 0);
            assert_eq!(PyFloat_Check(ptr::null_mut()), 0);
            assert_eq!(PyUnicode_Check(ptr::null_mut()), 0);
        }
    }
}
