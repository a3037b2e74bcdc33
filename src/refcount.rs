//! Reference counting - increment/decrement and ownership handles
//!
//! Hot path operations are always inlined. Immortal objects are skipped
//! before any arithmetic. Driving a count below zero is a caller bug that
//! would corrupt the heap, so it aborts the process instead of returning.

use crate::logging::{log_fatal, log_dealloc, trace};
use crate::object::{PyObject, TypeObject};
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;
use std::cell::{Cell, RefCell};
use std::sync::atomic::Ordering;

/// Increment reference count (no-op for immortal objects)
///
/// # Safety
/// `op` must point to a live object.
#[inline(always)]
pub unsafe fn incref(op: NonNull<PyObject>) {
    let obj = op.as_ref();
    if obj.is_immortal() {
        return;
    }
    obj.ob_refcnt.fetch_add(1, Ordering::Relaxed);
}

/// Decrement reference count, deallocating synchronously at zero
///
/// # Safety
/// `op` must point to a live object and the caller must own the reference
/// being released.
#[inline(always)]
pub unsafe fn decref(op: NonNull<PyObject>) {
    let obj = op.as_ref();
    let old = obj.refcnt();
    if old >= crate::object::IMMORTAL_REFCNT {
        return;
    }
    if old <= 0 {
        refcount_underflow(op, old);
    }

    obj.ob_refcnt.store(old - 1, Ordering::Relaxed);
    if old == 1 {
        dealloc(op);
    }
}

/// Null-safe `incref`
///
/// # Safety
/// `op` must be null or point to a live object.
#[inline]
pub unsafe fn xincref(op: *mut PyObject) {
    if let Some(op) = NonNull::new(op) {
        incref(op);
    }
}

/// Null-safe `decref`
///
/// # Safety
/// `op` must be null or satisfy `decref`'s contract.
#[inline]
pub unsafe fn xdecref(op: *mut PyObject) {
    if let Some(op) = NonNull::new(op) {
        decref(op);
    }
}

thread_local! {
    /// Set while a deallocation routine runs on this thread
    static DEALLOC_ACTIVE: Cell<bool> = const { Cell::new(false) };
    /// Objects whose count reached zero inside a running deallocation
    static DEALLOC_PENDING: RefCell<Vec<NonNull<PyObject>>> = const { RefCell::new(Vec::new()) };
}

/// Deallocate an object whose count reached zero (cold path)
///
/// Releasing a container releases its items, which may release theirs in
/// turn. Only the outermost call runs deallocation routines directly; a
/// count reaching zero inside one is queued and drained here, so stack
/// depth stays constant however deeply objects nest.
#[cold]
#[inline(never)]
unsafe fn dealloc(op: NonNull<PyObject>) {
    let nested = DEALLOC_ACTIVE.try_with(|active| active.replace(true)).unwrap_or(false);
    if nested {
        let queued = DEALLOC_PENDING.try_with(|pending| pending.borrow_mut().push(op)).is_ok();
        if !queued {
            run_dealloc(op);
        }
        return;
    }

    run_dealloc(op);
    while let Some(next) = DEALLOC_PENDING
        .try_with(|pending| pending.borrow_mut().pop())
        .ok()
        .flatten()
    {
        run_dealloc(next);
    }
    let _ = DEALLOC_ACTIVE.try_with(|active| active.set(false));
}

unsafe fn run_dealloc(op: NonNull<PyObject>) {
    let tp: &'static TypeObject = op.as_ref().ob_type;
    log_dealloc(tp.name, op.as_ptr() as *const u8);
    (tp.dealloc)(op);
}

#[cold]
#[inline(never)]
fn refcount_underflow(op: NonNull<PyObject>, count: i64) -> ! {
    trace!(event = "refcount_underflow", address = ?op.as_ptr(), count);
    log_fatal("refcount decremented below zero", op.as_ptr() as *const u8);
    std::process::abort()
}

/// Owned (strong) reference: released exactly once when dropped
///
/// Clone takes another reference; `into_raw` hands ownership to C code.
pub struct Owned {
    ptr: NonNull<PyObject>,
}

impl Owned {
    /// Adopt a new reference
    ///
    /// # Safety
    /// The caller must own one reference to the live object at `ptr`.
    #[inline]
    pub unsafe fn from_non_null(ptr: NonNull<PyObject>) -> Self {
        Self { ptr }
    }

    /// Adopt a new reference from C; `None` for null
    ///
    /// # Safety
    /// Same as `from_non_null` when non-null.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut PyObject) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// Give up ownership without decrementing
    #[inline]
    pub fn into_raw(self) -> *mut PyObject {
        let ptr = self.ptr.as_ptr();
        core::mem::forget(self);
        ptr
    }

    /// `into_raw` for Rust-side storage such as container slots
    #[inline]
    pub fn into_non_null(self) -> NonNull<PyObject> {
        let ptr = self.ptr;
        core::mem::forget(self);
        ptr
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut PyObject {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_non_null(&self) -> NonNull<PyObject> {
        self.ptr
    }

    #[inline]
    pub fn borrow(&self) -> Borrowed<'_> {
        Borrowed {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }

    /// Identity comparison
    #[inline]
    pub fn is(&self, other: Borrowed<'_>) -> bool {
        self.ptr == other.ptr
    }
}

impl Clone for Owned {
    #[inline]
    fn clone(&self) -> Self {
        unsafe { incref(self.ptr) };
        Self { ptr: self.ptr }
    }
}

impl Drop for Owned {
    #[inline]
    fn drop(&mut self) {
        unsafe { decref(self.ptr) };
    }
}

impl Deref for Owned {
    type Target = PyObject;

    #[inline]
    fn deref(&self) -> &PyObject {
        unsafe { self.ptr.as_ref() }
    }
}

impl core::fmt::Debug for Owned {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Owned<{}>({:p})", self.type_name(), self.ptr)
    }
}

/// Borrowed reference, valid for `'a` without owning a count
#[derive(Clone, Copy)]
pub struct Borrowed<'a> {
    ptr: NonNull<PyObject>,
    _marker: PhantomData<&'a PyObject>,
}

impl<'a> Borrowed<'a> {
    /// # Safety
    /// `ptr` must stay live for `'a`.
    #[inline]
    pub unsafe fn from_non_null(ptr: NonNull<PyObject>) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// `None` for null
    ///
    /// # Safety
    /// Same as `from_non_null` when non-null.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut PyObject) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self::from_non_null(ptr))
    }

    #[inline]
    pub fn from_static(obj: &'static PyObject) -> Borrowed<'static> {
        Borrowed {
            ptr: NonNull::from(obj),
            _marker: PhantomData,
        }
    }

    /// Take an owned reference to the same object
    #[inline]
    pub fn retain(self) -> Owned {
        unsafe {
            incref(self.ptr);
            Owned::from_non_null(self.ptr)
        }
    }

    #[inline]
    pub fn as_ptr(self) -> *mut PyObject {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_non_null(self) -> NonNull<PyObject> {
        self.ptr
    }

    #[inline]
    pub fn is(self, other: Borrowed<'_>) -> bool {
        self.ptr == other.ptr
    }
}

impl Deref for Borrowed<'_> {
    type Target = PyObject;

    #[inline]
    fn deref(&self) -> &PyObject {
        unsafe { self.ptr.as_ref() }
    }
}

impl core::fmt::Debug for Borrowed<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Borrowed<{}>({:p})", self.type_name(), self.ptr)
    }
}
