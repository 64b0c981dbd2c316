//! Virtual-memory collaborator and system-allocator shims.
//!
//! The allocator distinguishes four VM states per range: reserved (address
//! space held, no backing), committed (backed), decommitted (backing
//! returned, reservation kept) and released. Each OS module maps those onto
//! its native primitives.

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "linux")]
pub use linux as sys;

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(target_os = "macos")]
pub use macos as sys;

#[cfg(target_os = "windows")]
pub mod windows;
#[cfg(target_os = "windows")]
pub use windows as sys;

use core::cell::Cell;

thread_local! {
    /// Pending reservation failures injected by tests, per thread so
    /// parallel test binaries do not steal each other's failures.
    static RESERVE_FAILURES: Cell<u32> = const { Cell::new(0) };
}

/// Make the calling thread's next `n` calls to [`reserve`] fail, to
/// exercise the OOM surface without exhausting real address space.
#[doc(hidden)]
pub fn inject_reserve_failures(n: u32) {
    RESERVE_FAILURES.with(|c| c.set(n));
}

/// Reserve `size` bytes of page-aligned address space without backing.
/// Returns null on exhaustion.
///
/// # Safety
/// `size` must be page-aligned and non-zero.
#[inline]
pub unsafe fn reserve(size: usize) -> *mut u8 {
    let injected = RESERVE_FAILURES
        .try_with(|c| {
            let n = c.get();
            if n > 0 {
                c.set(n - 1);
                true
            } else {
                false
            }
        })
        .unwrap_or(false);
    if injected {
        return core::ptr::null_mut();
    }
    sys::reserve(size)
}

/// Back an already-reserved range with storage.
///
/// # Safety
/// `[ptr, ptr + size)` must lie inside a reservation; both page-aligned.
#[inline]
pub unsafe fn commit(ptr: *mut u8, size: usize) {
    sys::commit(ptr, size);
}

/// Return the storage behind a range while keeping the reservation.
///
/// # Safety
/// `[ptr, ptr + size)` must be committed; both page-aligned.
#[inline]
pub unsafe fn decommit(ptr: *mut u8, size: usize) {
    sys::decommit(ptr, size);
}

/// Drop a reservation entirely.
///
/// # Safety
/// `ptr`/`size` must exactly match an earlier [`reserve`].
#[inline]
pub unsafe fn release(ptr: *mut u8, size: usize) {
    sys::release(ptr, size);
}

/// System malloc, for requests above the large tier and for permanent
/// metadata slabs.
///
/// # Safety
/// Standard malloc contract.
#[inline]
pub unsafe fn sys_alloc(size: usize) -> *mut u8 {
    libc::malloc(size) as *mut u8
}

/// # Safety
/// `ptr` must come from [`sys_alloc`] / [`sys_realloc`] (or be null).
#[inline]
pub unsafe fn sys_free(ptr: *mut u8) {
    libc::free(ptr as *mut libc::c_void);
}

/// # Safety
/// Standard realloc contract.
#[inline]
pub unsafe fn sys_realloc(ptr: *mut u8, size: usize) -> *mut u8 {
    libc::realloc(ptr as *mut libc::c_void, size) as *mut u8
}

/// Aligned system allocation, for over-aligned requests the tiers cannot
/// satisfy. Freed with [`sys_free_aligned`].
///
/// # Safety
/// `align` must be a power of two and at least the pointer width.
#[inline]
pub unsafe fn sys_alloc_aligned(align: usize, size: usize) -> *mut u8 {
    sys::alloc_aligned(align, size)
}

/// # Safety
/// `ptr` must come from [`sys_alloc_aligned`] (or be null).
#[inline]
pub unsafe fn sys_free_aligned(ptr: *mut u8) {
    sys::free_aligned(ptr);
}
