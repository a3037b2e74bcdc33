//! Allocator entry points
//!
//! `PyMem_*` and `PyObject_*` use the two-tier allocator, `PyMem_Raw*`
//! the general heap only. All return null on failure, and every zero-byte
//! request still returns a unique pointer.

use crate::allocator;
use core::ffi::c_void;
use core::ptr::{self, NonNull};

#[inline]
fn into_c(block: Option<NonNull<u8>>) -> *mut c_void {
    block.map_or(ptr::null_mut(), |p| p.as_ptr().cast())
}

#[no_mangle]
pub extern "C" fn PyMem_Malloc(size: usize) -> *mut c_void {
    into_c(allocator::malloc(size))
}

#[no_mangle]
pub extern "C" fn PyMem_Calloc(nelem: usize, elsize: usize) -> *mut c_void {
    into_c(allocator::calloc(nelem, elsize))
}

/// # Safety
/// `ptr` must be null or a live block from this family.
#[no_mangle]
pub unsafe extern "C" fn PyMem_Realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    into_c(allocator::realloc(NonNull::new(ptr.cast()), size))
}

/// # Safety
/// `ptr` must be null or a live block from this family.
#[no_mangle]
pub unsafe extern "C" fn PyMem_Free(ptr: *mut c_void) {
    if let Some(block) = NonNull::new(ptr.cast()) {
        allocator::free(block);
    }
}

#[no_mangle]
pub extern "C" fn PyObject_Malloc(size: usize) -> *mut c_void {
    into_c(allocator::malloc(size))
}

#[no_mangle]
pub extern "C" fn PyObject_Calloc(nelem: usize, elsize: usize) -> *mut c_void {
    into_c(allocator::calloc(nelem, elsize))
}

/// # Safety
/// `ptr` must be null or a live block from this family.
#[no_mangle]
pub unsafe extern "C" fn PyObject_Realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    into_c(allocator::realloc(NonNull::new(ptr.cast()), size))
}

/// # Safety
/// `ptr` must be null or a live block from this family.
#[no_mangle]
pub unsafe extern "C" fn PyObject_Free(ptr: *mut c_void) {
    if let Some(block) = NonNull::new(ptr.cast()) {
        allocator::free(block);
    }
}

#[no_mangle]
pub extern "C" fn PyMem_RawMalloc(size: usize) -> *mut c_void {
    into_c(allocator::raw_malloc(size))
}

#[no_mangle]
pub extern "C" fn PyMem_RawCalloc(nelem: usize, elsize: usize) -> *mut c_void {
    into_c(allocator::raw_calloc(nelem, elsize))
}

/// # Safety
/// `ptr` must be null or a live block from `PyMem_Raw*`.
#[no_mangle]
pub unsafe extern "C" fn PyMem_RawRealloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    into_c(allocator::raw_realloc(NonNull::new(ptr.cast()), size))
}

/// # Safety
/// `ptr` must be null or a live block from `PyMem_Raw*`.
#[no_mangle]
pub unsafe extern "C" fn PyMem_RawFree(ptr: *mut c_void) {
    if let Some(block) = NonNull::new(ptr.cast()) {
        allocator::raw_free(block);
    }
}
