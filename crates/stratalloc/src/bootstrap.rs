//! Bump allocation for permanent control data.
//!
//! ThreadAlloc headers and similar metadata live for the rest of the
//! process, so they are carved out of 64 KiB system-malloc slabs that are
//! never returned. A partially used slab abandoned by an oversized request
//! is simply forgotten.

use crate::platform;
use crate::util::align_up;
use core::ptr;

const SLAB_SIZE: usize = 64 * 1024;

/// Largest request served from a slab; anything bigger goes straight to
/// the system allocator.
const SLAB_MAX: usize = 4096;

pub struct StaticAllocator {
    cur: *mut u8,
    end: *mut u8,
}

impl StaticAllocator {
    pub const fn new() -> Self {
        StaticAllocator {
            cur: ptr::null_mut(),
            end: ptr::null_mut(),
        }
    }

    /// Allocate `n` bytes of permanent storage, rounded up to 8 bytes.
    /// Returns null only if the system allocator fails.
    pub fn alloc(&mut self, n: usize) -> *mut u8 {
        let n = align_up(n, 8);
        unsafe {
            if (self.cur as usize) + n <= self.end as usize {
                let p = self.cur;
                self.cur = self.cur.add(n);
                return p;
            }
            if n <= SLAB_MAX {
                let slab = platform::sys_alloc(SLAB_SIZE);
                if slab.is_null() {
                    return ptr::null_mut();
                }
                self.cur = slab.add(n);
                self.end = slab.add(SLAB_SIZE);
                return slab;
            }
            platform::sys_alloc(n)
        }
    }
}
