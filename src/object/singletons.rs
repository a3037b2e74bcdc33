//! Immortal singletons - None, True and False
//!
//! Statically allocated, address-stable, compared by identity. Their
//! refcount sits at `IMMORTAL_REFCNT`, so incref/decref leave it unchanged
//! and never reach the deallocation routine.

use super::{PyObject, TypeObject, TypeTag};
use crate::builtins::long::{PyLongObject, BOOL_TYPE};
use crate::logging::log_fatal;
use crate::refcount::{Borrowed, Owned};
use core::ptr::NonNull;

pub static NONE_TYPE: TypeObject = TypeObject::new(
    c"NoneType",
    TypeTag::NONE,
    core::mem::size_of::<PyObject>(),
    0,
    immortal_dealloc,
);

pub static NONE: PyObject = PyObject::immortal(&NONE_TYPE);
pub static TRUE: PyLongObject = PyLongObject::immortal(&BOOL_TYPE, 1);
pub static FALSE: PyLongObject = PyLongObject::immortal(&BOOL_TYPE, 0);

/// Reaching this means an immortal object's count was forced to zero
pub(crate) unsafe fn immortal_dealloc(op: NonNull<PyObject>) {
    log_fatal("deallocation of immortal object", op.as_ptr() as *const u8);
    std::process::abort();
}

#[inline]
pub fn none() -> Borrowed<'static> {
    Borrowed::from_static(&NONE)
}

/// New reference to None (no count change, None is immortal)
#[inline]
pub fn new_none() -> Owned {
    none().retain()
}

#[inline]
pub fn bool_object(value: bool) -> Borrowed<'static> {
    if value {
        Borrowed::from_static(&TRUE.ob_base)
    } else {
        Borrowed::from_static(&FALSE.ob_base)
    }
}

#[inline]
pub fn is_none(obj: Borrowed<'_>) -> bool {
    obj.is(none())
}
