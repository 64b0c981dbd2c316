//! `#[global_allocator]` support.
//!
//! ```rust,ignore
//! use stratalloc::StratAlloc;
//!
//! #[global_allocator]
//! static GLOBAL: StratAlloc = StratAlloc;
//! ```
//!
//! The tiers guarantee 16-byte alignment below 2 KiB and page alignment up
//! to 128 KiB, so the adapter turns `Layout` into a deterministic route:
//! default-aligned requests use the sized API directly, over-aligned ones
//! up to a page are padded into the page tier, and anything beyond goes to
//! the platform's aligned allocator. `dealloc` recomputes the same route
//! from the same `Layout`, which is what keeps sized frees exact.

use crate::api;
use crate::platform;
use crate::util::{MAX_ALLOC, MAX_SMALL, PAGE_SIZE, SLOT_SIZE};
use core::alloc::{GlobalAlloc, Layout};
use core::ptr;

/// Alignment every tier provides without help.
const MIN_ALIGN: usize = SLOT_SIZE;

/// A zero-sized handle implementing [`GlobalAlloc`] over the sized API.
pub struct StratAlloc;

/// Size that forces a request into the page tier, whose pointers satisfy
/// any alignment up to a page.
#[inline]
fn padded_size(size: usize) -> usize {
    size.max(MAX_SMALL + 1)
}

unsafe impl GlobalAlloc for StratAlloc {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let size = layout.size();
        let align = layout.align();
        if size == 0 {
            // standard dangling-pointer convention for zero-sized requests
            return align as *mut u8;
        }
        if align <= MIN_ALIGN {
            api::alloc(size)
        } else if align <= PAGE_SIZE && size <= MAX_ALLOC {
            api::alloc(padded_size(size))
        } else {
            platform::sys_alloc_aligned(align, size)
        }
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let size = layout.size();
        let align = layout.align();
        if size == 0 {
            return align as *mut u8;
        }
        if align <= MIN_ALIGN {
            api::zalloc(size)
        } else if align <= PAGE_SIZE && size <= MAX_ALLOC {
            api::zalloc(padded_size(size))
        } else {
            let p = platform::sys_alloc_aligned(align, size);
            if !p.is_null() {
                ptr::write_bytes(p, 0, size);
            }
            p
        }
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let size = layout.size();
        let align = layout.align();
        if size == 0 {
            return;
        }
        if align <= MIN_ALIGN {
            api::free(ptr, size);
        } else if align <= PAGE_SIZE && size <= MAX_ALLOC {
            api::free(ptr, padded_size(size));
        } else {
            platform::sys_free_aligned(ptr);
        }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let old_size = layout.size();
        let align = layout.align();
        if old_size == 0 {
            return self.alloc(Layout::from_size_align_unchecked(new_size, align));
        }
        if align <= MIN_ALIGN && new_size > old_size {
            return api::realloc(ptr, old_size, new_size);
        }
        // Shrinks and over-aligned resizes take a fresh allocation: the
        // sized route of a live pointer must never change under it.
        let q = self.alloc(Layout::from_size_align_unchecked(new_size, align));
        if !q.is_null() {
            ptr::copy_nonoverlapping(ptr, q, old_size.min(new_size));
            self.dealloc(ptr, layout);
        }
        q
    }
}
