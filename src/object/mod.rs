//! Object model - headers, type descriptors and object allocation
//!
//! Design: every instance begins with a `PyObject` header at offset 0 and
//! points at a static `TypeObject`. Instances are carved from the
//! two-tier allocator, zero-filled past the header, and returned as owned
//! references with refcount 1.

mod header;
mod typeobj;
mod slot;
pub mod registry;
pub mod singletons;


pub use header::{PyObject, PyVarObject, IMMORTAL_REFCNT};
pub use typeobj::{Destructor, TypeObject, TypeTag};
pub use slot::Slot;
pub use singletons::{bool_object, is_none, new_none, none};

use crate::allocator;
use crate::error::{ApiError, ApiResult};
use crate::logging::trace;
use crate::refcount::{Borrowed, Owned};
use core::ptr::NonNull;

/// Allocate a fixed-size instance of `tp`
pub fn new_object(tp: &'static TypeObject) -> ApiResult<Owned> {
    alloc_instance(tp, tp.basic_size)
}

/// Allocate a variable-size instance of `tp` with `nitems` trailing items
///
/// `ob_size` is set to `nitems`; the items themselves are zero-filled.
pub fn new_var_object(tp: &'static TypeObject, nitems: usize) -> ApiResult<Owned> {
    let size = tp.instance_size(nitems).ok_or(ApiError::AllocationFailed { size: usize::MAX })?;
    let len = i64::try_from(nitems).map_err(|_| ApiError::AllocationFailed { size })?;

    let obj = alloc_instance(tp, size)?;
    unsafe { PyVarObject::set_size(obj.as_non_null(), len) };
    Ok(obj)
}

fn alloc_instance(tp: &'static TypeObject, size: usize) -> ApiResult<Owned> {
    debug_assert!(size >= core::mem::size_of::<PyObject>());

    let mem = allocator::calloc(1, size).ok_or(ApiError::AllocationFailed { size })?;
    let op = mem.cast::<PyObject>();

    unsafe {
        op.as_ptr().write(PyObject::new(tp));
        trace!(event = "object_new", type_name = tp.name, size_bytes = size);
        Ok(Owned::from_non_null(op))
    }
}

/// Return an instance's storage to the allocator
///
/// # Safety
/// `op` must come from `new_object`/`new_var_object`, its owned children
/// must already be released, and nothing may use it afterwards.
pub unsafe fn free_object(op: NonNull<PyObject>) {
    allocator::free(op.cast::<u8>());
}

/// Deallocation routine for types without owned children
///
/// # Safety
/// Same as `free_object`.
pub unsafe fn generic_dealloc(op: NonNull<PyObject>) {
    free_object(op);
}

/// `Check`: instance of `tp` or of a type deriving from it
pub fn ensure_instance(obj: Borrowed<'_>, tp: &'static TypeObject) -> ApiResult<()> {
    if obj.is_instance(tp) {
        Ok(())
    } else {
        Err(ApiError::TypeMismatch {
            expected: tp.name,
            found: obj.type_name(),
        })
    }
}

/// `CheckExact`: instance of exactly `tp`
pub fn ensure_exact(obj: Borrowed<'_>, tp: &'static TypeObject) -> ApiResult<()> {
    if obj.is_exact(tp) {
        Ok(())
    } else {
        Err(ApiError::TypeMismatch {
            expected: tp.name,
            found: obj.type_name(),
        })
    }
}
