// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Process heap accounting.
//!
//! [`TrackingAllocator`] wraps the system allocator and keeps two lifetime
//! counters: bytes ever allocated and bytes ever freed. It only counts when a
//! binary installs it as `#[global_allocator]`; otherwise both counters stay
//! at zero and [`TrackingHeapProbe`] reads zero usage.
#![allow(unsafe_code)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::trial::{HeapProbe, HeapSample};

static TOTAL_ALLOCATED: AtomicU64 = AtomicU64::new(0);
static TOTAL_FREED: AtomicU64 = AtomicU64::new(0);

fn bytes(layout: Layout) -> u64 {
    u64::try_from(layout.size()).unwrap_or(u64::MAX)
}

/// Counting wrapper around [`System`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingAllocator;

impl TrackingAllocator {
    /// New allocator; counters are process-wide.
    pub const fn new() -> Self {
        Self
    }
}

// SAFETY: every call forwards to `System` with the caller's layout unchanged;
// the counters are plain atomics and never touch the returned memory.
unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller upholds the `GlobalAlloc::alloc` contract.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            TOTAL_ALLOCATED.fetch_add(bytes(layout), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller upholds the `GlobalAlloc::alloc_zeroed` contract.
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            TOTAL_ALLOCATED.fetch_add(bytes(layout), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        TOTAL_FREED.fetch_add(bytes(layout), Ordering::Relaxed);
        // SAFETY: `ptr` was returned by this allocator for `layout`.
        unsafe { System.dealloc(ptr, layout) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: caller upholds the `GlobalAlloc::realloc` contract.
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            // A move counts as freeing the old block and allocating the new one.
            TOTAL_FREED.fetch_add(bytes(layout), Ordering::Relaxed);
            TOTAL_ALLOCATED.fetch_add(
                u64::try_from(new_size).unwrap_or(u64::MAX),
                Ordering::Relaxed,
            );
        }
        new_ptr
    }
}

/// [`HeapProbe`] reading the [`TrackingAllocator`] counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingHeapProbe;

impl HeapProbe for TrackingHeapProbe {
    fn sample(&self) -> HeapSample {
        // Freed first: a sample never sees a free without its allocation.
        let free = TOTAL_FREED.load(Ordering::Acquire);
        let total = TOTAL_ALLOCATED.load(Ordering::Acquire);
        HeapSample { total, free }
    }
}
