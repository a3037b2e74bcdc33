//! Arena management - OS memory the pool carves blocks from
//!
//! Design: large blocks (64KB-4MB by default) acquired lazily, carved with
//! a bump cursor. Arena memory is never handed back to the OS while the
//! process runs: pool blocks may be freed on another thread long after the
//! owning thread exits, so a dropped `ArenaPool` parks its arenas in a
//! process-wide orphan list instead of deallocating them.

use super::block::BLOCK_ALIGN;
use crate::logging::{debug, perf, performance_tracking};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::alloc::{alloc, dealloc, Layout};
use core::ptr::NonNull;

static ORPHANED: Lazy<Mutex<Vec<Arena>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Arena metadata - tracks one OS-allocated region
pub struct Arena {
    start: NonNull<u8>,
    layout: Layout,
    cursor: usize,
}

// An arena exclusively owns its region; moving it between threads only
// moves bookkeeping.
unsafe impl Send for Arena {}

impl Arena {
    /// Allocate new arena from OS
    pub fn new(size: usize) -> Option<Self> {
        let layout = Layout::from_size_align(size, BLOCK_ALIGN).ok()?;
        if layout.size() == 0 {
            return None;
        }

        let start = NonNull::new(unsafe { alloc(layout) })?;
        Some(Self { start, layout, cursor: 0 })
    }

    /// Bump-allocate `size` bytes, rounded up to `BLOCK_ALIGN`
    #[inline]
    pub fn carve(&mut self, size: usize) -> Option<NonNull<u8>> {
        let size = align_up(size, BLOCK_ALIGN)?;
        let end = self.cursor.checked_add(size)?;
        if end > self.layout.size() {
            return None;
        }

        let ptr = unsafe { self.start.as_ptr().add(self.cursor) };
        self.cursor = end;
        NonNull::new(ptr)
    }

    /// Arena size
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Bytes not yet carved
    #[inline]
    pub fn remaining(&self) -> usize {
        self.layout.size() - self.cursor
    }

    #[inline]
    pub fn contains(&self, ptr: *const u8) -> bool {
        let start = self.start.as_ptr() as usize;
        let addr = ptr as usize;
        addr >= start && addr < start + self.layout.size()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe {
            dealloc(self.start.as_ptr(), self.layout);
        }
    }
}

/// Arena pool - manages the arenas of one allocator
pub struct ArenaPool {
    arenas: Vec<Arena>,
    current_size: usize,
    max_size: usize,
    limit: Option<usize>,
    /// Bytes held elsewhere by the same owner that count against `limit`
    reserved: usize,
}

impl ArenaPool {
    pub fn new(initial_size: usize, max_size: usize, limit: Option<usize>) -> Self {
        Self {
            arenas: Vec::new(),
            current_size: initial_size,
            max_size: max_size.max(initial_size),
            limit,
            reserved: 0,
        }
    }

    pub fn set_reserved(&mut self, bytes: usize) {
        self.reserved = bytes;
    }

    /// Carve from the newest arena, growing the pool when it is full
    pub fn carve(&mut self, size: usize) -> Option<NonNull<u8>> {
        if let Some(ptr) = self.arenas.last_mut().and_then(|a| a.carve(size)) {
            return Some(ptr);
        }
        self.grow_with_min(size)?.carve(size)
    }

    /// Allocate a new arena at least `min` bytes large, growing size adaptively
    pub fn grow_with_min(&mut self, min: usize) -> Option<&mut Arena> {
        let size = self.current_size.max(align_up(min, BLOCK_ALIGN)?);

        if let Some(limit) = self.limit {
            let committed = self.total_allocated().checked_add(self.reserved)?;
            if committed.checked_add(size)? > limit {
                return None;
            }
        }

        let _perf = performance_tracking().then(|| perf::track("arena_acquire"));
        let arena = Arena::new(size)?;
        debug!(
            event = "arena_acquired",
            size_bytes = size,
            arenas = self.arenas.len() + 1,
            "Arena acquired"
        );

        // Grow arena size for next allocation (capped at max_size)
        self.current_size = (self.current_size * 2).min(self.max_size);

        self.arenas.push(arena);
        self.arenas.last_mut()
    }

    /// Total allocated memory across all arenas
    pub fn total_allocated(&self) -> usize {
        self.arenas.iter().map(|a| a.size()).sum()
    }

    pub fn arena_count(&self) -> usize {
        self.arenas.len()
    }

    /// Whether `ptr` lies inside one of this pool's arenas
    pub fn owns(&self, ptr: *const u8) -> bool {
        self.arenas.iter().any(|a| a.contains(ptr))
    }
}

impl Drop for ArenaPool {
    fn drop(&mut self) {
        if !self.arenas.is_empty() {
            ORPHANED.lock().append(&mut self.arenas);
        }
    }
}

/// Bytes held by arenas whose allocator has gone away
pub fn orphaned_bytes() -> usize {
    ORPHANED.lock().iter().map(|a| a.size()).sum()
}

/// Round `value` up to a multiple of `align` (a power of two)
#[inline]
pub(crate) const fn align_up(value: usize, align: usize) -> Option<usize> {
    match value.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}
