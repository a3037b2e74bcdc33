//! Object header - the prefix every heap object starts with
//!
//! Layout is part of the C contract: an 8-byte signed refcount at offset 0,
//! the type pointer at offset 8. Variable-size objects append a length.

use super::TypeObject;
use core::ptr::NonNull;
use std::sync::atomic::{AtomicI64, Ordering};

/// Refcount value marking an object exempt from refcount accounting
///
/// Any count at or above this value is treated as immortal, so stray
/// increments from extension code cannot make an immortal object mortal.
pub const IMMORTAL_REFCNT: i64 = 1 << 62;

/// Common object header (`PyObject` in C)
///
/// The refcount is an `AtomicI64` only so that immortal statics can live in
/// shared memory; all accesses are `Relaxed` and callers still serialize
/// entry points externally.
#[repr(C)]
pub struct PyObject {
    pub ob_refcnt: AtomicI64,
    pub ob_type: &'static TypeObject,
}

impl PyObject {
    /// Header for a freshly created object (refcount 1)
    #[inline]
    pub const fn new(ob_type: &'static TypeObject) -> Self {
        Self {
            ob_refcnt: AtomicI64::new(1),
            ob_type,
        }
    }

    /// Header for a statically allocated immortal object
    #[inline]
    pub const fn immortal(ob_type: &'static TypeObject) -> Self {
        Self {
            ob_refcnt: AtomicI64::new(IMMORTAL_REFCNT),
            ob_type,
        }
    }

    #[inline]
    pub fn refcnt(&self) -> i64 {
        self.ob_refcnt.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_immortal(&self) -> bool {
        self.refcnt() >= IMMORTAL_REFCNT
    }

    #[inline]
    pub fn type_object(&self) -> &'static TypeObject {
        self.ob_type
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.ob_type.name
    }

    /// Whether this object's type is `tp` or derives from it
    #[inline]
    pub fn is_instance(&self, tp: &TypeObject) -> bool {
        self.ob_type.is_subtype_of(tp)
    }

    /// Whether this object's type is exactly `tp`
    #[inline]
    pub fn is_exact(&self, tp: &TypeObject) -> bool {
        core::ptr::eq(self.ob_type, tp)
    }
}

/// Header of variable-size objects (`PyVarObject` in C)
#[repr(C)]
pub struct PyVarObject {
    pub ob_base: PyObject,
    pub ob_size: i64,
}

impl PyVarObject {
    /// Read `ob_size` of an object known to be variable-size
    ///
    /// # Safety
    /// `op` must point to a live object whose type lays out a `PyVarObject`.
    #[inline]
    pub unsafe fn size_of(op: NonNull<PyObject>) -> i64 {
        (*op.cast::<PyVarObject>().as_ptr()).ob_size
    }

    /// # Safety
    /// Same as `size_of`, and the caller owns the only mutable access.
    #[inline]
    pub unsafe fn set_size(op: NonNull<PyObject>, size: i64) {
        (*op.cast::<PyVarObject>().as_ptr()).ob_size = size;
    }
}
