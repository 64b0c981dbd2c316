use core::ptr;

/// Darwin has no usable reserve/commit split for anonymous memory; a plain
/// mapping is lazily backed, so reserve hands out the mapping directly and
/// commit is a no-op.
///
/// # Safety
/// `size` must be page-aligned and non-zero.
pub unsafe fn reserve(size: usize) -> *mut u8 {
    let p = libc::mmap(
        ptr::null_mut(),
        size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
    );
    if p == libc::MAP_FAILED {
        ptr::null_mut()
    } else {
        p as *mut u8
    }
}

/// # Safety
/// The range must lie inside a reservation.
pub unsafe fn commit(_ptr: *mut u8, _size: usize) {}

/// Atomically replace the range with fresh zero-fill pages. MADV_DONTNEED
/// is advisory-only on Darwin, so remapping is the reliable way to drop
/// the backing.
///
/// # Safety
/// The range must lie inside a reservation and be page-aligned.
pub unsafe fn decommit(ptr: *mut u8, size: usize) {
    let p = libc::mmap(
        ptr as *mut libc::c_void,
        size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_FIXED,
        -1,
        0,
    );
    debug_assert!(p != libc::MAP_FAILED, "MAP_FIXED decommit failed");
    let _ = p;
}

/// # Safety
/// `ptr`/`size` must exactly match an earlier [`reserve`].
pub unsafe fn release(ptr: *mut u8, size: usize) {
    libc::munmap(ptr as *mut libc::c_void, size);
}

/// # Safety
/// `align` must be a power of two and at least `size_of::<*mut u8>()`.
pub unsafe fn alloc_aligned(align: usize, size: usize) -> *mut u8 {
    let mut p: *mut libc::c_void = ptr::null_mut();
    if libc::posix_memalign(&mut p, align, size) != 0 {
        return ptr::null_mut();
    }
    p as *mut u8
}

/// # Safety
/// `ptr` must come from [`alloc_aligned`] (or be null).
pub unsafe fn free_aligned(ptr: *mut u8) {
    libc::free(ptr as *mut libc::c_void);
}
