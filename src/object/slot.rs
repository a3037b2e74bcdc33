//! Container slots - an owned reference or an explicit empty state
//!
//! `Slot` has the same layout as a C `PyObject *`: an unset slot reads as
//! NULL from extension code, while Rust code sees a tagged `None` that can
//! never be confused with a live reference.

use super::PyObject;
use core::ptr::NonNull;

#[repr(transparent)]
pub struct Slot(Option<NonNull<PyObject>>);

impl Slot {
    pub const EMPTY: Slot = Slot(None);

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    #[inline]
    pub fn get(&self) -> Option<NonNull<PyObject>> {
        self.0
    }

    /// Install `obj` and hand back the previous occupant (caller releases it)
    #[inline]
    pub fn replace(&mut self, obj: NonNull<PyObject>) -> Option<NonNull<PyObject>> {
        self.0.replace(obj)
    }

    #[inline]
    pub fn take(&mut self) -> Option<NonNull<PyObject>> {
        self.0.take()
    }
}
