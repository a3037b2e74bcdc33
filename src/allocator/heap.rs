//! General heap tier - failure-checked passthrough to the process heap
//!
//! Serves requests above the pool threshold and the `PyMem_Raw*` family.
//! Stateless apart from global counters, so it is usable from any thread
//! and after the calling thread's allocator is gone.

use super::block::{BlockHeader, BlockKind, HEADER_SIZE, HEAP_MAGIC};
use core::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

static LIVE_BLOCKS: AtomicUsize = AtomicUsize::new(0);
static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub live_blocks: usize,
    pub live_bytes: usize,
}

pub fn stats() -> HeapStats {
    HeapStats {
        live_blocks: LIVE_BLOCKS.load(Ordering::Relaxed),
        live_bytes: LIVE_BYTES.load(Ordering::Relaxed),
    }
}

/// Allocate `size` payload bytes (zero is served as one byte)
pub fn alloc(size: usize) -> Option<NonNull<u8>> {
    let size = size.max(1);
    let total = size.checked_add(HEADER_SIZE)?;
    if total > isize::MAX as usize {
        return None;
    }

    let header = NonNull::new(unsafe { sys::alloc(total) })?.cast::<BlockHeader>();
    unsafe { write_header(header, size) };

    LIVE_BLOCKS.fetch_add(1, Ordering::Relaxed);
    LIVE_BYTES.fetch_add(size, Ordering::Relaxed);
    Some(BlockHeader::payload(header))
}

/// Resize a heap block in place or by moving it
///
/// On failure the original block is untouched.
///
/// # Safety
/// `header` must prefix a live heap block of `old_size` bytes.
pub unsafe fn realloc(header: NonNull<BlockHeader>, old_size: usize, size: usize) -> Option<NonNull<u8>> {
    let size = size.max(1);
    let total = size.checked_add(HEADER_SIZE)?;
    if total > isize::MAX as usize {
        return None;
    }

    let moved = sys::realloc(header.as_ptr() as *mut u8, old_size + HEADER_SIZE, total);
    let header = NonNull::new(moved)?.cast::<BlockHeader>();
    write_header(header, size);

    LIVE_BYTES.fetch_add(size, Ordering::Relaxed);
    LIVE_BYTES.fetch_sub(old_size, Ordering::Relaxed);
    Some(BlockHeader::payload(header))
}

/// # Safety
/// `header` must prefix a live heap block; it is invalid afterwards.
pub unsafe fn free(header: NonNull<BlockHeader>) {
    let size = match header.as_ref().kind() {
        BlockKind::Heap { size } => size,
        _ => return,
    };

    // Poison so a second free is caught by the magic check
    (*header.as_ptr()).magic = 0;
    sys::free(header.as_ptr() as *mut u8, size + HEADER_SIZE);

    LIVE_BLOCKS.fetch_sub(1, Ordering::Relaxed);
    LIVE_BYTES.fetch_sub(size, Ordering::Relaxed);
}

unsafe fn write_header(header: NonNull<BlockHeader>, size: usize) {
    header.as_ptr().write(BlockHeader {
        class: u32::MAX,
        magic: HEAP_MAGIC,
        link: size,
    });
}

#[cfg(unix)]
mod sys {
    pub unsafe fn alloc(total: usize) -> *mut u8 {
        let ptr = libc::malloc(total) as *mut u8;
        debug_assert!(ptr.is_null() || ptr as usize % super::super::block::BLOCK_ALIGN == 0);
        ptr
    }

    pub unsafe fn realloc(ptr: *mut u8, _old_total: usize, total: usize) -> *mut u8 {
        libc::realloc(ptr as *mut libc::c_void, total) as *mut u8
    }

    pub unsafe fn free(ptr: *mut u8, _total: usize) {
        libc::free(ptr as *mut libc::c_void)
    }
}

#[cfg(not(unix))]
mod sys {
    use super::super::block::BLOCK_ALIGN;
    use std::alloc::Layout;

    pub unsafe fn alloc(total: usize) -> *mut u8 {
        match Layout::from_size_align(total, BLOCK_ALIGN) {
            Ok(layout) => std::alloc::alloc(layout),
            Err(_) => core::ptr::null_mut(),
        }
    }

    pub unsafe fn realloc(ptr: *mut u8, old_total: usize, total: usize) -> *mut u8 {
        let layout = Layout::from_size_align_unchecked(old_total, BLOCK_ALIGN);
        std::alloc::realloc(ptr, layout, total)
    }

    pub unsafe fn free(ptr: *mut u8, total: usize) {
        std::alloc::dealloc(ptr, Layout::from_size_align_unchecked(total, BLOCK_ALIGN))
    }
}
