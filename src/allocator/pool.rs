//! Small-object pool - size-class free lists over arena memory
//!
//! Requests up to `SMALL_REQUEST_THRESHOLD` bytes are rounded to a 16-byte
//! size class. A freed block goes back on its class's free list and is the
//! first candidate for the next request of that class.

use super::arena::ArenaPool;
use super::block::{BlockHeader, BLOCK_ALIGN, FREED_MAGIC, HEADER_SIZE, POOL_MAGIC};
use crate::config::AllocatorSettings;
use core::ptr::{self, NonNull};

/// Largest request served by the pool (inclusive)
pub const SMALL_REQUEST_THRESHOLD: usize = 1024;
/// Size class granularity
pub const SIZE_CLASS_STEP: usize = BLOCK_ALIGN;
pub const NUM_SIZE_CLASSES: usize = SMALL_REQUEST_THRESHOLD / SIZE_CLASS_STEP;

/// Size class for a request, `None` when the pool does not serve it
///
/// Zero-byte requests share class 0 with one-byte requests.
#[inline]
pub const fn size_class(size: usize) -> Option<usize> {
    if size > SMALL_REQUEST_THRESHOLD {
        return None;
    }
    let size = if size == 0 { 1 } else { size };
    Some((size + SIZE_CLASS_STEP - 1) / SIZE_CLASS_STEP - 1)
}

/// Usable payload bytes of a class
#[inline]
pub const fn class_size(class: usize) -> usize {
    (class + 1) * SIZE_CLASS_STEP
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub blocks_in_use: usize,
    pub blocks_carved: usize,
    pub free_list_hits: usize,
}

pub struct SmallObjectPool {
    free_lists: [*mut BlockHeader; NUM_SIZE_CLASSES],
    arenas: ArenaPool,
    stats: PoolStats,
}

impl SmallObjectPool {
    pub fn new(settings: &AllocatorSettings) -> Self {
        Self {
            free_lists: [ptr::null_mut(); NUM_SIZE_CLASSES],
            arenas: ArenaPool::new(
                settings.arena_size,
                settings.max_arena_size,
                settings.memory_limit,
            ),
            stats: PoolStats::default(),
        }
    }

    /// Tell the arena layer how many bytes the heap tier holds, so arena
    /// growth respects the shared memory limit
    pub fn set_heap_bytes(&mut self, bytes: usize) {
        self.arenas.set_reserved(bytes);
    }

    /// Allocate a block of `class`, preferring the free list
    pub fn alloc(&mut self, class: usize) -> Option<NonNull<u8>> {
        debug_assert!(class < NUM_SIZE_CLASSES);

        let header = match NonNull::new(self.free_lists[class]) {
            Some(header) => unsafe {
                self.free_lists[class] = header.as_ref().link as *mut BlockHeader;
                self.stats.free_list_hits += 1;
                header
            },
            None => {
                let raw = self.arenas.carve(HEADER_SIZE + class_size(class))?;
                self.stats.blocks_carved += 1;
                raw.cast::<BlockHeader>()
            }
        };

        unsafe {
            header.as_ptr().write(BlockHeader {
                class: class as u32,
                magic: POOL_MAGIC,
                link: 0,
            });
        }
        self.stats.blocks_in_use += 1;
        Some(BlockHeader::payload(header))
    }

    /// Push a block back on its class's free list
    ///
    /// # Safety
    /// `header` must prefix a live pool block of `class`. The block may
    /// come from another thread's pool; arena memory is never released.
    pub unsafe fn free(&mut self, header: NonNull<BlockHeader>, class: usize) {
        let h = header.as_ptr();
        (*h).magic = FREED_MAGIC;
        (*h).link = self.free_lists[class] as usize;
        self.free_lists[class] = h;
        self.stats.blocks_in_use = self.stats.blocks_in_use.saturating_sub(1);
    }

    /// Length of a class's free list
    pub fn free_count(&self, class: usize) -> usize {
        let mut count = 0;
        let mut cursor = self.free_lists[class];
        while !cursor.is_null() {
            count += 1;
            cursor = unsafe { (*cursor).link as *mut BlockHeader };
        }
        count
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn arena_bytes(&self) -> usize {
        self.arenas.total_allocated()
    }

    pub fn arena_count(&self) -> usize {
        self.arenas.arena_count()
    }

    pub fn owns(&self, ptr: *const u8) -> bool {
        self.arenas.owns(ptr)
    }
}
