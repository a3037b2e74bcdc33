//! Method dispatch for C callers

use super::new_reference;
use crate::error::ApiError;
use crate::methods::{call_method, MethodTable, PyMethodDef};
use crate::object::PyObject;
use crate::refcount::Borrowed;
use core::ffi::{c_char, CStr};

/// Call one method entry per its declared convention; null on failure
///
/// `slf`, `args` and `kwargs` may each be null. A non-null `args` must be
/// a tuple; `kwargs` a tuple or list of `(str, object)` pairs.
///
/// # Safety
/// `def` must be null or a valid entry; the object pointers null or live.
#[no_mangle]
pub unsafe extern "C" fn pyabi_call_method(
    def: *const PyMethodDef,
    slf: *mut PyObject,
    args: *mut PyObject,
    kwargs: *mut PyObject,
) -> *mut PyObject {
    let result = match def.as_ref() {
        Some(def) => call_method(
            def,
            Borrowed::from_raw(slf),
            Borrowed::from_raw(args),
            Borrowed::from_raw(kwargs),
        ),
        None => Err(ApiError::NullReference),
    };
    new_reference("pyabi_call_method", result)
}

/// Look `name` up in a sentinel-terminated table and call it
///
/// # Safety
/// `defs` must be a sentinel-terminated table, `name` a NUL-terminated
/// string; object pointers as for `pyabi_call_method`.
#[no_mangle]
pub unsafe extern "C" fn pyabi_call_table(
    defs: *const PyMethodDef,
    name: *const c_char,
    slf: *mut PyObject,
    args: *mut PyObject,
    kwargs: *mut PyObject,
) -> *mut PyObject {
    let result = (|| {
        if name.is_null() {
            return Err(ApiError::NullReference);
        }
        let name = CStr::from_ptr(name).to_str().map_err(|_| ApiError::InvalidUtf8)?;
        MethodTable::from_sentinel(defs)?.call(
            name,
            Borrowed::from_raw(slf),
            Borrowed::from_raw(args),
            Borrowed::from_raw(kwargs),
        )
    })();
    new_reference("pyabi_call_table", result)
}
