//! Block prefix - 16 bytes in front of every payload
//!
//! The prefix tells `free`/`realloc` which tier owns a payload without any
//! address-range lookup. Freed pool blocks keep their prefix and store the
//! free-list link there, so the payload (and any object header in it) is
//! left untouched until the block is reused.

use core::ptr::NonNull;

/// Payload alignment guaranteed by every allocation entry point
pub const BLOCK_ALIGN: usize = 16;

pub const POOL_MAGIC: u32 = 0x504F_4F4C; // "POOL"
pub const HEAP_MAGIC: u32 = 0x4845_4150; // "HEAP"
pub const FREED_MAGIC: u32 = 0x4652_4545; // "FREE"

#[repr(C, align(16))]
pub struct BlockHeader {
    /// Size class index for pool blocks, unused for heap blocks
    pub class: u32,
    pub magic: u32,
    /// Requested size (heap) or next free block (pool, while free)
    pub link: usize,
}

pub const HEADER_SIZE: usize = core::mem::size_of::<BlockHeader>();

const _: () = assert!(HEADER_SIZE == BLOCK_ALIGN);

/// What a prefix says about its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Pool { class: usize },
    Heap { size: usize },
    Freed,
    Foreign,
}

impl BlockHeader {
    /// # Safety
    /// `payload` must have been returned by this allocator.
    #[inline]
    pub unsafe fn from_payload(payload: NonNull<u8>) -> NonNull<BlockHeader> {
        NonNull::new_unchecked(payload.as_ptr().sub(HEADER_SIZE) as *mut BlockHeader)
    }

    #[inline]
    pub fn payload(header: NonNull<BlockHeader>) -> NonNull<u8> {
        unsafe { NonNull::new_unchecked((header.as_ptr() as *mut u8).add(HEADER_SIZE)) }
    }

    #[inline]
    pub fn kind(&self) -> BlockKind {
        match self.magic {
            POOL_MAGIC => BlockKind::Pool { class: self.class as usize },
            HEAP_MAGIC => BlockKind::Heap { size: self.link },
            FREED_MAGIC => BlockKind::Freed,
            _ => BlockKind::Foreign,
        }
    }
}
