use core::ptr;

/// Reserve address space. `MAP_NORESERVE` keeps swap accounting out of the
/// picture; pages are not touched until committed.
///
/// # Safety
/// `size` must be page-aligned and non-zero.
pub unsafe fn reserve(size: usize) -> *mut u8 {
    let p = libc::mmap(
        ptr::null_mut(),
        size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
        -1,
        0,
    );
    if p == libc::MAP_FAILED {
        ptr::null_mut()
    } else {
        p as *mut u8
    }
}

/// Commit a reserved range by remapping it without `MAP_NORESERVE`.
///
/// # Safety
/// The range must lie inside a reservation and be page-aligned.
pub unsafe fn commit(ptr: *mut u8, size: usize) {
    let p = libc::mmap(
        ptr as *mut libc::c_void,
        size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_FIXED,
        -1,
        0,
    );
    debug_assert!(p as *mut u8 == ptr, "MAP_FIXED commit moved the mapping");
    let _ = p;
}

/// Give the pages back by replacing the range with a fresh lazy mapping;
/// the address range stays reserved.
///
/// # Safety
/// The range must lie inside a reservation and be page-aligned.
pub unsafe fn decommit(ptr: *mut u8, size: usize) {
    libc::mmap(
        ptr as *mut libc::c_void,
        size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE | libc::MAP_FIXED,
        -1,
        0,
    );
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
