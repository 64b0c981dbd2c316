//! The public sized-allocation entry points.
//!
//! Every call routes through the calling thread's front end. The sizes are
//! part of the contract: `free` and `realloc` must receive the size the
//! allocation was made with, which is what lets the tiers recover an
//! object's header purely from pointer alignment.
//!
//! With the `system-malloc` feature the whole crate collapses to direct
//! calls into the system allocator.

#[cfg(not(feature = "system-malloc"))]
mod imp {
    use crate::thread;
    use core::ptr;

    /// Permanent metadata; there is deliberately no way to free it.
    pub fn static_alloc(n: usize) -> *mut u8 {
        let ta = thread::thread_alloc();
        if ta.is_null() {
            return ptr::null_mut();
        }
        unsafe { (*ta).static_alloc(n) }
    }

    /// Allocate `n` bytes. Null iff out of memory.
    pub fn alloc(n: usize) -> *mut u8 {
        let ta = thread::thread_alloc();
        if ta.is_null() {
            return ptr::null_mut();
        }
        unsafe { (*ta).alloc(n) }
    }

    /// Free `(p, n)`. Null `p` is a no-op.
    ///
    /// # Safety
    /// `p` must come from [`alloc`]/[`realloc`] with size `n`, not freed
    /// before.
    pub unsafe fn free(p: *mut u8, n: usize) {
        if p.is_null() {
            return;
        }
        let ta = thread::thread_alloc();
        if !ta.is_null() {
            (*ta).free(p, n);
        }
    }

    /// Grow `(p, old_size)` to `new_size`. Null iff out of memory, in
    /// which case `p` stays live.
    ///
    /// # Safety
    /// `p` must come from [`alloc`]/[`realloc`] with size `old_size` (or be
    /// null); `new_size` must exceed `old_size` when `p` is non-null and
    /// `old_size` is within the tiers.
    pub unsafe fn realloc(p: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
        let ta = thread::thread_alloc();
        if ta.is_null() {
            return ptr::null_mut();
        }
        (*ta).realloc(p, old_size, new_size)
    }
}

#[cfg(feature = "system-malloc")]
mod imp {
    use crate::platform;

    pub fn static_alloc(n: usize) -> *mut u8 {
        unsafe { platform::sys_alloc(n) }
    }

    pub fn alloc(n: usize) -> *mut u8 {
        unsafe { platform::sys_alloc(n) }
    }

    /// # Safety
    /// Standard free contract; the size is ignored.
    pub unsafe fn free(p: *mut u8, _n: usize) {
        platform::sys_free(p);
    }

    /// # Safety
    /// Standard realloc contract; the old size is ignored.
    pub unsafe fn realloc(p: *mut u8, _old_size: usize, new_size: usize) -> *mut u8 {
        platform::sys_realloc(p, new_size)
    }
}

pub use imp::{alloc, free, realloc, static_alloc};

/// [`alloc`] plus zero fill.
pub fn zalloc(n: usize) -> *mut u8 {
    let p = alloc(n);
    if !p.is_null() {
        unsafe { core::ptr::write_bytes(p, 0, n) };
    }
    p
}
