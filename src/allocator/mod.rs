//! Memory allocator - small-object pool over arenas plus a general heap
//!
//! Design: two tiers behind one set of entry points:
//! 1. Size-class pool (requests up to 1024 bytes, free-list reuse)
//! 2. Arena management (bump carving, memory the pool is built from)
//! 3. General heap (large requests and `PyMem_Raw*`)
//!
//! Every payload carries a 16-byte prefix naming its tier, so `free` and
//! `realloc` need no lookup. Each thread owns one `Allocator`; entry points
//! reach it through `with_thread_allocator`.
//!
//! Every entry point reports exhaustion as `None` (NULL at the C boundary)
//! and never panics. Zero-byte requests return a unique one-byte block.

mod arena;
mod block;
mod heap;
mod pool;

#[cfg(test)]
mod tests;

pub use arena::{orphaned_bytes, Arena, ArenaPool};
pub use block::{BlockKind, BLOCK_ALIGN};
pub use heap::HeapStats;
pub use pool::{class_size, size_class, PoolStats, NUM_SIZE_CLASSES, SMALL_REQUEST_THRESHOLD};

use crate::config::{self, AllocatorSettings};
use crate::logging::{debug, log_block_alloc, log_block_free, log_fatal};
use block::{BlockHeader, FREED_MAGIC};
use core::ptr::NonNull;
use pool::SmallObjectPool;
use std::cell::RefCell;

thread_local! {
    static THREAD_ALLOCATOR: RefCell<Allocator> =
        RefCell::new(Allocator::with_settings(config::allocator_settings()));
}

/// Run `f` with this thread's allocator
///
/// `None` when the allocator is unavailable: during thread teardown, or if
/// `f` itself re-enters the allocator.
pub fn with_thread_allocator<R>(f: impl FnOnce(&mut Allocator) -> R) -> Option<R> {
    THREAD_ALLOCATOR
        .try_with(|cell| cell.try_borrow_mut().ok().map(|mut alloc| f(&mut alloc)))
        .ok()
        .flatten()
}

/// Warm up this thread's allocator
pub fn init() {
    if let Some(settings) = with_thread_allocator(|alloc| alloc.settings) {
        debug!(
            arena_size = settings.arena_size,
            max_arena_size = settings.max_arena_size,
            memory_limit = ?settings.memory_limit,
            "Allocator initialized"
        );
    }
}

/// Per-thread two-tier allocator
pub struct Allocator {
    pool: SmallObjectPool,
    settings: AllocatorSettings,
    /// Payload bytes of live heap blocks obtained through this allocator
    heap_live: usize,
}

impl Allocator {
    pub fn new() -> Self {
        Self::with_settings(AllocatorSettings::default())
    }

    pub fn with_settings(settings: AllocatorSettings) -> Self {
        Self {
            pool: SmallObjectPool::new(&settings),
            settings,
            heap_live: 0,
        }
    }

    /// Allocate `size` bytes, 16-byte aligned
    pub fn alloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        match size_class(size) {
            Some(class) => self.pool.alloc(class),
            None => self.heap_alloc(size),
        }
    }

    /// Allocate `size` zeroed bytes
    pub fn alloc_zeroed(&mut self, size: usize) -> Option<NonNull<u8>> {
        let ptr = self.alloc(size)?;
        unsafe { core::ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Some(ptr)
    }

    /// Resize a block, keeping its contents up to the smaller size
    ///
    /// Stays in place while the new size maps to the same size class. On
    /// failure `None` is returned and `ptr` remains valid and unchanged.
    ///
    /// # Safety
    /// `ptr` must be a live block returned by this module.
    pub unsafe fn realloc(&mut self, ptr: NonNull<u8>, size: usize) -> Option<NonNull<u8>> {
        let header = BlockHeader::from_payload(ptr);
        match header.as_ref().kind() {
            BlockKind::Pool { class } => {
                if size_class(size) == Some(class) {
                    return Some(ptr);
                }
                self.move_block(ptr, class_size(class), size)
            }
            BlockKind::Heap { size: old } => {
                if size_class(size).is_some() {
                    return self.move_block(ptr, old, size);
                }
                let grown = size.max(1).saturating_sub(old);
                if !self.within_limit(grown) {
                    return None;
                }
                let moved = heap::realloc(header, old, size)?;
                self.set_heap_live(self.heap_live.saturating_sub(old) + size.max(1));
                Some(moved)
            }
            BlockKind::Freed => invalid_free("realloc of freed block", ptr),
            BlockKind::Foreign => invalid_free("realloc of foreign pointer", ptr),
        }
    }

    /// Release a block to its tier
    ///
    /// Pool blocks go on this allocator's free list even when another
    /// thread carved them. Freeing a block twice aborts.
    ///
    /// # Safety
    /// `ptr` must be a live block returned by this module.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) {
        let header = BlockHeader::from_payload(ptr);
        match header.as_ref().kind() {
            BlockKind::Pool { class } => self.pool.free(header, class),
            BlockKind::Heap { size } => {
                heap::free(header);
                // Saturating: the block may have been counted by another thread
                self.set_heap_live(self.heap_live.saturating_sub(size));
            }
            BlockKind::Freed => invalid_free("double free", ptr),
            BlockKind::Foreign => invalid_free("free of foreign pointer", ptr),
        }
    }

    /// Payload bytes of live heap blocks this allocator handed out
    pub fn heap_live_bytes(&self) -> usize {
        self.heap_live
    }

    /// Length of the free list for `class` (diagnostics and tests)
    pub fn free_count(&self, class: usize) -> usize {
        self.pool.free_count(class)
    }

    pub fn settings(&self) -> AllocatorSettings {
        self.settings
    }

    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            arena_bytes: self.pool.arena_bytes(),
            arena_count: self.pool.arena_count(),
            pool: self.pool.stats(),
            heap: heap::stats(),
        }
    }

    fn heap_alloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        if !self.within_limit(size) {
            debug!(size_bytes = size, "Heap request exceeds memory limit");
            return None;
        }
        let ptr = heap::alloc(size)?;
        self.set_heap_live(self.heap_live + size.max(1));
        Some(ptr)
    }

    fn set_heap_live(&mut self, bytes: usize) {
        self.heap_live = bytes;
        self.pool.set_heap_bytes(bytes);
    }

    /// Whether `extra` more bytes keep arenas plus live heap blocks under
    /// the configured limit
    fn within_limit(&self, extra: usize) -> bool {
        match self.settings.memory_limit {
            Some(limit) => self
                .pool
                .arena_bytes()
                .checked_add(self.heap_live)
                .and_then(|total| total.checked_add(extra))
                .map_or(false, |total| total <= limit),
            None => true,
        }
    }

    unsafe fn move_block(&mut self, ptr: NonNull<u8>, old: usize, size: usize) -> Option<NonNull<u8>> {
        let moved = self.alloc(size)?;
        core::ptr::copy_nonoverlapping(ptr.as_ptr(), moved.as_ptr(), old.min(size));
        self.free(ptr);
        Some(moved)
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocator statistics for monitoring and debugging
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStats {
    pub arena_bytes: usize,
    pub arena_count: usize,
    pub pool: PoolStats,
    pub heap: HeapStats,
}

/// Statistics of this thread's allocator
pub fn stats() -> AllocatorStats {
    with_thread_allocator(|alloc| alloc.stats()).unwrap_or_else(|| AllocatorStats {
        heap: heap::stats(),
        ..AllocatorStats::default()
    })
}

#[cold]
#[inline(never)]
fn invalid_free(what: &str, ptr: NonNull<u8>) -> ! {
    log_fatal(what, ptr.as_ptr());
    std::process::abort()
}

// ============================================================================
// Two-tier entry points (PyMem_* / PyObject_*)
// ============================================================================

/// Allocate `size` bytes; `None` on exhaustion
pub fn malloc(size: usize) -> Option<NonNull<u8>> {
    let ptr = with_thread_allocator(|alloc| alloc.alloc(size)).unwrap_or_else(|| heap::alloc(size))?;
    log_block_alloc(size, ptr.as_ptr());
    Some(ptr)
}

/// Allocate `nelem * elsize` zeroed bytes; `None` on overflow or exhaustion
pub fn calloc(nelem: usize, elsize: usize) -> Option<NonNull<u8>> {
    let size = nelem.checked_mul(elsize)?;
    let ptr = with_thread_allocator(|alloc| alloc.alloc_zeroed(size)).unwrap_or_else(|| {
        let ptr = heap::alloc(size)?;
        unsafe { core::ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Some(ptr)
    })?;
    log_block_alloc(size, ptr.as_ptr());
    Some(ptr)
}

/// Resize a block; a null `ptr` behaves like `malloc`
///
/// # Safety
/// `ptr` must be null or a live block from this module.
pub unsafe fn realloc(ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
    let Some(ptr) = ptr else {
        return malloc(size);
    };
    match with_thread_allocator(|alloc| alloc.realloc(ptr, size)) {
        Some(moved) => moved,
        None => realloc_unpooled(ptr, size),
    }
}

/// Resize path once this thread's allocator is gone: heap blocks resize in
/// place, pool blocks move to the heap and are retired.
unsafe fn realloc_unpooled(ptr: NonNull<u8>, size: usize) -> Option<NonNull<u8>> {
    let header = BlockHeader::from_payload(ptr);
    match header.as_ref().kind() {
        BlockKind::Heap { size: old } => heap::realloc(header, old, size),
        BlockKind::Pool { class } => {
            let moved = heap::alloc(size)?;
            core::ptr::copy_nonoverlapping(ptr.as_ptr(), moved.as_ptr(), class_size(class).min(size));
            (*header.as_ptr()).magic = FREED_MAGIC;
            Some(moved)
        }
        BlockKind::Freed => invalid_free("realloc of freed block", ptr),
        BlockKind::Foreign => invalid_free("realloc of foreign pointer", ptr),
    }
}

/// Release a block
///
/// # Safety
/// `ptr` must be a live block from this module; it is invalid afterwards.
pub unsafe fn free(ptr: NonNull<u8>) {
    log_block_free(ptr.as_ptr());
    if with_thread_allocator(|alloc| alloc.free(ptr)).is_none() {
        release_unpooled(ptr);
    }
}

/// Free path once this thread's allocator is gone: heap blocks are still
/// released, pool blocks are retired in place.
unsafe fn release_unpooled(ptr: NonNull<u8>) {
    let header = BlockHeader::from_payload(ptr);
    match header.as_ref().kind() {
        BlockKind::Heap { .. } => heap::free(header),
        BlockKind::Pool { .. } => (*header.as_ptr()).magic = FREED_MAGIC,
        BlockKind::Freed => invalid_free("double free", ptr),
        BlockKind::Foreign => invalid_free("free of foreign pointer", ptr),
    }
}

// ============================================================================
// Raw entry points (PyMem_Raw*) - general heap only
// ============================================================================

pub fn raw_malloc(size: usize) -> Option<NonNull<u8>> {
    heap::alloc(size)
}

pub fn raw_calloc(nelem: usize, elsize: usize) -> Option<NonNull<u8>> {
    let size = nelem.checked_mul(elsize)?;
    let ptr = heap::alloc(size)?;
    unsafe { core::ptr::write_bytes(ptr.as_ptr(), 0, size) };
    Some(ptr)
}

/// # Safety
/// `ptr` must be null or a live block from this module.
pub unsafe fn raw_realloc(ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
    let Some(ptr) = ptr else {
        return raw_malloc(size);
    };
    let header = BlockHeader::from_payload(ptr);
    match header.as_ref().kind() {
        BlockKind::Heap { size: old } => heap::realloc(header, old, size),
        _ => realloc(Some(ptr), size),
    }
}

/// # Safety
/// `ptr` must be a live block from this module; it is invalid afterwards.
pub unsafe fn raw_free(ptr: NonNull<u8>) {
    let header = BlockHeader::from_payload(ptr);
    match header.as_ref().kind() {
        BlockKind::Heap { .. } => heap::free(header),
        _ => free(ptr),
    }
}

/// Tier that currently owns `ptr` (diagnostics and tests)
///
/// # Safety
/// `ptr` must be a block returned by this module, live or freed-to-pool.
pub unsafe fn block_kind(ptr: NonNull<u8>) -> BlockKind {
    BlockHeader::from_payload(ptr).as_ref().kind()
}
