//! Reference counting and header accessors for C callers
//!
//! Hot path operations, inlined into the Rust implementation. The header
//! declares them over `void *`, so any object pointer is accepted.

use crate::object::{PyObject, PyVarObject};
use crate::refcount;
use core::ffi::{c_char, c_void};
use core::ptr::{self, NonNull};

/// Increment reference count
///
/// # Safety
/// `op` must point to a live object.
#[no_mangle]
pub unsafe extern "C" fn Py_INCREF(op: *mut c_void) {
    refcount::xincref(op.cast());
}

/// Decrement reference count, destroying the object at zero
///
/// # Safety
/// `op` must point to a live object and the caller must own the reference.
#[no_mangle]
pub unsafe extern "C" fn Py_DECREF(op: *mut c_void) {
    refcount::xdecref(op.cast());
}

/// Null-safe increment
///
/// # Safety
/// `op` must be null or point to a live object.
#[no_mangle]
pub unsafe extern "C" fn Py_XINCREF(op: *mut c_void) {
    refcount::xincref(op.cast());
}

/// Null-safe decrement
///
/// # Safety
/// `op` must be null or satisfy `Py_DECREF`'s contract.
#[no_mangle]
pub unsafe extern "C" fn Py_XDECREF(op: *mut c_void) {
    refcount::xdecref(op.cast());
}

/// `Py_REFCNT`: current count, `-1` for null
///
/// # Safety
/// `op` must be null or point to a live object.
#[no_mangle]
pub unsafe extern "C" fn pyabi_refcnt(op: *mut PyObject) -> i64 {
    match op.as_ref() {
        Some(obj) => obj.refcnt(),
        None => -1,
    }
}

/// Name of the object's type as a static C string, null for null
///
/// # Safety
/// `op` must be null or point to a live object.
#[no_mangle]
pub unsafe extern "C" fn pyabi_type_name(op: *mut PyObject) -> *const c_char {
    match op.as_ref() {
        Some(obj) => obj.type_object().c_name.as_ptr(),
        None => ptr::null(),
    }
}

/// `Py_SIZE`: `ob_size` of a variable-size object
///
/// Returns `-1` for null and for fixed-size objects.
///
/// # Safety
/// `op` must be null or point to a live object.
#[no_mangle]
pub unsafe extern "C" fn pyabi_size(op: *mut PyObject) -> i64 {
    match NonNull::new(op) {
        Some(op) if op.as_ref().type_object().var_sized => PyVarObject::size_of(op),
        _ => -1,
    }
}
