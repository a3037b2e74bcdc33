//! Allocator tests
//!
//! Organized by component:
//! - Size classes: request-to-class mapping
//! - Pool: free-list reuse and isolation between blocks
//! - Heap: large requests and raw entry points
//! - Realloc: in-place and moving resizes
//! - Limits: exhaustion reported as `None`

use super::*;
use crate::config::AllocatorSettings;

fn limited(limit: usize) -> Allocator {
    Allocator::with_settings(AllocatorSettings {
        arena_size: 4096,
        max_arena_size: 4096,
        memory_limit: Some(limit),
    })
}

// ===== Size Class Tests =====

#[test]
fn size_class_boundaries() {
    assert_eq!(size_class(0), Some(0));
    assert_eq!(size_class(1), Some(0));
    assert_eq!(size_class(16), Some(0));
    assert_eq!(size_class(17), Some(1));
    assert_eq!(size_class(1024), Some(NUM_SIZE_CLASSES - 1));
    assert_eq!(size_class(1025), None);
}

#[test]
fn class_size_covers_request() {
    for size in 1..=SMALL_REQUEST_THRESHOLD {
        let class = size_class(size).unwrap();
        assert!(class_size(class) >= size);
        assert!(class_size(class) - size < 16);
    }
}

// ===== Pool Tests =====

#[test]
fn pool_reuses_freed_block_without_touching_canary() {
    let mut alloc = Allocator::new();

    let canary = alloc.alloc(1024).expect("canary");
    unsafe { core::ptr::write_bytes(canary.as_ptr(), 0xC3, 1024) };

    let block = alloc.alloc(1024).expect("block");
    unsafe {
        core::ptr::write_bytes(block.as_ptr(), 0xAB, 1024);
        alloc.free(block);
    }
    let class = size_class(1024).unwrap();
    assert_eq!(alloc.free_count(class), 1);

    let again = alloc.alloc(1024).expect("reuse");
    assert_eq!(again, block);
    assert_eq!(alloc.free_count(class), 0);

    let canary_bytes = unsafe { core::slice::from_raw_parts(canary.as_ptr(), 1024) };
    assert!(canary_bytes.iter().all(|&b| b == 0xC3));

    unsafe {
        alloc.free(again);
        alloc.free(canary);
    }
}

#[test]
fn pool_blocks_are_distinct_and_aligned() {
    let mut alloc = Allocator::new();
    let blocks: Vec<_> = (0..64).map(|_| alloc.alloc(24).expect("alloc")).collect();

    for (i, a) in blocks.iter().enumerate() {
        assert_eq!(a.as_ptr() as usize % BLOCK_ALIGN, 0);
        for b in &blocks[i + 1..] {
            assert_ne!(a, b);
        }
    }
    for block in blocks {
        unsafe { alloc.free(block) };
    }
    assert_eq!(alloc.stats().pool.blocks_in_use, 0);
}

#[test]
fn zero_size_requests_are_unique() {
    let mut alloc = Allocator::new();
    let a = alloc.alloc(0).expect("first");
    let b = alloc.alloc(0).expect("second");
    assert_ne!(a, b);
    unsafe {
        alloc.free(a);
        alloc.free(b);
    }
}

#[test]
fn freed_block_keeps_payload_until_reuse() {
    let mut alloc = Allocator::new();
    let block = alloc.alloc(32).expect("alloc");
    unsafe {
        block.as_ptr().cast::<u64>().write(0xDEAD_BEEF);
        alloc.free(block);
        assert_eq!(block_kind(block), BlockKind::Freed);
        assert_eq!(block.as_ptr().cast::<u64>().read(), 0xDEAD_BEEF);
    }
}

#[test]
fn zeroed_allocation_after_reuse() {
    let mut alloc = Allocator::new();
    let block = alloc.alloc(64).expect("alloc");
    unsafe {
        core::ptr::write_bytes(block.as_ptr(), 0xFF, 64);
        alloc.free(block);
    }
    let zeroed = alloc.alloc_zeroed(64).expect("calloc");
    assert_eq!(zeroed, block);
    let bytes = unsafe { core::slice::from_raw_parts(zeroed.as_ptr(), 64) };
    assert!(bytes.iter().all(|&b| b == 0));
    unsafe { alloc.free(zeroed) };
}

// ===== Heap Tests =====

#[test]
fn large_requests_use_heap() {
    let mut alloc = Allocator::new();
    let ptr = alloc.alloc(4096).expect("large");
    unsafe {
        assert_eq!(block_kind(ptr), BlockKind::Heap { size: 4096 });
        core::ptr::write_bytes(ptr.as_ptr(), 1, 4096);
        alloc.free(ptr);
    }
    assert_eq!(alloc.stats().arena_bytes, 0);
}

#[test]
fn raw_entry_points_bypass_pool() {
    let ptr = raw_malloc(8).expect("raw");
    unsafe {
        assert_eq!(block_kind(ptr), BlockKind::Heap { size: 8 });
        let grown = raw_realloc(Some(ptr), 100).expect("grow");
        assert_eq!(block_kind(grown), BlockKind::Heap { size: 100 });
        raw_free(grown);
    }

    let zeroed = raw_calloc(4, 8).expect("raw calloc");
    let bytes = unsafe { core::slice::from_raw_parts(zeroed.as_ptr(), 32) };
    assert!(bytes.iter().all(|&b| b == 0));
    unsafe { raw_free(zeroed) };
}

#[test]
fn calloc_rejects_overflow() {
    assert!(calloc(usize::MAX, 2).is_none());
    assert!(raw_calloc(usize::MAX / 2, 3).is_none());
}

// ===== Realloc Tests =====

#[test]
fn realloc_within_class_stays_in_place() {
    let mut alloc = Allocator::new();
    let ptr = alloc.alloc(20).expect("alloc");
    let same = unsafe { alloc.realloc(ptr, 30) }.expect("realloc");
    assert_eq!(ptr, same);
    unsafe { alloc.free(same) };
}

#[test]
fn realloc_preserves_contents_across_tiers() {
    let mut alloc = Allocator::new();
    let ptr = alloc.alloc(16).expect("alloc");
    unsafe {
        for i in 0..16 {
            ptr.as_ptr().add(i).write(i as u8);
        }
        let big = alloc.realloc(ptr, 2048).expect("to heap");
        assert!(matches!(block_kind(big), BlockKind::Heap { .. }));
        assert_eq!(block_kind(ptr), BlockKind::Freed);

        let small = alloc.realloc(big, 8).expect("back to pool");
        assert!(matches!(block_kind(small), BlockKind::Pool { .. }));
        for i in 0..8 {
            assert_eq!(small.as_ptr().add(i).read(), i as u8);
        }
        alloc.free(small);
    }
}

#[test]
fn realloc_null_acts_as_malloc() {
    let ptr = unsafe { realloc(None, 40) }.expect("malloc");
    unsafe { free(ptr) };
}

// ===== Limit Tests =====

#[test]
fn memory_limit_exhausts_pool() {
    let mut alloc = limited(4096);
    let mut blocks = Vec::new();
    while let Some(ptr) = alloc.alloc(1000) {
        blocks.push(ptr);
        assert!(blocks.len() < 16, "limit not enforced");
    }
    assert!(!blocks.is_empty());
    assert_eq!(alloc.stats().arena_bytes, 4096);

    // A freed block can still be handed out again
    let last = blocks.pop().unwrap();
    unsafe { alloc.free(last) };
    assert_eq!(alloc.alloc(1000), Some(last));
}

#[test]
fn memory_limit_rejects_large_heap_request() {
    let mut alloc = limited(4096);
    assert!(alloc.alloc(8192).is_none());
    let ok = alloc.alloc(2048).expect("under limit");
    unsafe {
        assert!(alloc.realloc(ok, 1 << 20).is_none());
        assert_eq!(block_kind(ok), BlockKind::Heap { size: 2048 });
        alloc.free(ok);
    }
}

#[test]
fn memory_limit_counts_live_heap_blocks() {
    let mut alloc = limited(4096);
    let first = alloc.alloc(2048).expect("first");
    let second = alloc.alloc(2048).expect("second");
    assert_eq!(alloc.heap_live_bytes(), 4096);
    for _ in 0..6 {
        assert!(alloc.alloc(2048).is_none());
    }

    // The heap already holds the whole budget, so no arena can be acquired
    assert!(alloc.alloc(64).is_none());

    unsafe { alloc.free(first) };
    assert_eq!(alloc.heap_live_bytes(), 2048);
    let third = alloc.alloc(2048).expect("room after free");
    unsafe {
        assert!(alloc.realloc(third, 4096).is_none());
        alloc.free(second);
        alloc.free(third);
    }
    assert_eq!(alloc.heap_live_bytes(), 0);
}

// ===== Thread Allocator Tests =====

#[test]
fn free_functions_route_through_thread_allocator() {
    let before = stats().pool.blocks_in_use;
    let ptr = malloc(48).expect("malloc");
    assert_eq!(stats().pool.blocks_in_use, before + 1);
    unsafe { free(ptr) };
    assert_eq!(stats().pool.blocks_in_use, before);
}

#[test]
fn block_freed_on_other_thread() {
    let ptr = malloc(64).expect("malloc");
    let addr = ptr.as_ptr() as usize;
    std::thread::spawn(move || unsafe {
        let ptr = NonNull::new(addr as *mut u8).unwrap();
        free(ptr);
        assert_eq!(block_kind(ptr), BlockKind::Freed);
    })
    .join()
    .unwrap();
}

#[test]
fn realloc_without_thread_allocator_keeps_contents() {
    let heap_block = malloc(2048).expect("heap");
    let pool_block = malloc(32).expect("pool");
    unsafe {
        core::ptr::write_bytes(heap_block.as_ptr(), 0x11, 2048);
        core::ptr::write_bytes(pool_block.as_ptr(), 0x22, 32);
    }

    // Re-entering the thread allocator makes it unavailable to the inner calls
    let (grown, moved) = with_thread_allocator(|_| unsafe {
        (realloc(Some(heap_block), 8192), realloc(Some(pool_block), 2048))
    })
    .expect("outer borrow");

    let grown = grown.expect("heap realloc");
    let moved = moved.expect("pool realloc");
    unsafe {
        assert_eq!(block_kind(grown), BlockKind::Heap { size: 8192 });
        assert_eq!(block_kind(moved), BlockKind::Heap { size: 2048 });
        assert_eq!(block_kind(pool_block), BlockKind::Freed);
        assert!(core::slice::from_raw_parts(grown.as_ptr(), 2048).iter().all(|&b| b == 0x11));
        assert!(core::slice::from_raw_parts(moved.as_ptr(), 32).iter().all(|&b| b == 0x22));
        free(grown);
        free(moved);
    }
}
