use core::ffi::c_void;
use core::ptr;
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
};

/// # Safety
/// `size` must be page-aligned and non-zero.
pub unsafe fn reserve(size: usize) -> *mut u8 {
    VirtualAlloc(ptr::null(), size, MEM_RESERVE, PAGE_READWRITE) as *mut u8
}

/// # Safety
/// The range must lie inside a reservation and be page-aligned.
pub unsafe fn commit(ptr: *mut u8, size: usize) {
    let p = VirtualAlloc(ptr as *const c_void, size, MEM_COMMIT, PAGE_READWRITE);
    debug_assert!(p as *mut u8 == ptr, "VirtualAlloc commit failed");
    let _ = p;
}

/// # Safety
/// The range must be committed and page-aligned.
pub unsafe fn decommit(ptr: *mut u8, size: usize) {
    VirtualFree(ptr as *mut c_void, size, MEM_DECOMMIT);
}

/// # Safety
/// `ptr` must be the base of an earlier [`reserve`].
pub unsafe fn release(ptr: *mut u8, _size: usize) {
    VirtualFree(ptr as *mut c_void, 0, MEM_RELEASE);
}

extern "C" {
    fn _aligned_malloc(size: usize, align: usize) -> *mut c_void;
    fn _aligned_free(ptr: *mut c_void);
}

/// # Safety
/// `align` must be a power of two.
pub unsafe fn alloc_aligned(align: usize, size: usize) -> *mut u8 {
    _aligned_malloc(size, align) as *mut u8
}

/// # Safety
/// `ptr` must come from [`alloc_aligned`] (or be null).
pub unsafe fn free_aligned(ptr: *mut u8) {
    _aligned_free(ptr as *mut c_void);
}
