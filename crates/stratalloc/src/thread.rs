//! The per-thread front end.
//!
//! Every OS thread lazily gets one `ThreadAlloc`, found through TLS. All
//! fast paths run on thread-private state; the only locks are inside the
//! back end, and the only cross-thread traffic is the relaxed `xbs` mark
//! left by foreign frees.
//!
//! Routing by request size:
//!
//! * `<= 2 KiB`: 16-byte slots out of the current SmallAlloc, with a
//!   bounded self-organizing search behind it.
//! * `<= 128 KiB`: page slots out of the current LargeAlloc, same scheme.
//! * above that: the system allocator, untouched by the tiers.

use crate::block::LargeBlock;
use crate::bootstrap::StaticAllocator;
use crate::global;
use crate::list;
use crate::platform;
use crate::suballoc::{LargeAlloc, SmallAlloc};
use crate::util::{
    align_down, align_up, LARGE_UNIT, MAX_ALLOC, MAX_SMALL, PAGE_SHIFT, PAGE_SIZE, SLOT_SHIFT,
    SLOT_SIZE, SMALL_UNIT,
};
use core::cell::Cell;
use core::ptr;
use core::sync::atomic::{AtomicU32, Ordering};

/// Non-current SmallAllocs probed (with a drain) before carving a new one.
const SA_SCAN_LIMIT: u32 = 2;

/// Non-current LargeBlocks asked for a Small unit before requesting a
/// fresh one from the back end.
const LB_SCAN_LIMIT: u32 = 4;

/// Non-current LargeAllocs probed before requesting a fresh unit.
const LA_SCAN_LIMIT: u32 = 4;

static NEXT_ALLOC_ID: AtomicU32 = AtomicU32::new(0);

pub struct ThreadAlloc {
    sa: *mut SmallAlloc,
    lb: *mut LargeBlock,
    la: *mut LargeAlloc,
    id: u32,
    boot: StaticAllocator,
}

impl ThreadAlloc {
    fn new() -> Self {
        ThreadAlloc {
            sa: ptr::null_mut(),
            lb: ptr::null_mut(),
            la: ptr::null_mut(),
            id: NEXT_ALLOC_ID.fetch_add(1, Ordering::Relaxed),
            boot: StaticAllocator::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Permanent metadata carve-out; never freed.
    pub fn static_alloc(&mut self, n: usize) -> *mut u8 {
        self.boot.alloc(n)
    }

    /// Allocate `n` bytes: 16-byte aligned under 2 KiB, page aligned up to
    /// 128 KiB, system malloc beyond. Null only on OOM.
    ///
    /// # Safety
    /// Must be called on the owning thread.
    pub unsafe fn alloc(&mut self, n: usize) -> *mut u8 {
        if n <= MAX_SMALL {
            let u = if n > SLOT_SIZE {
                (align_up(n, SLOT_SIZE) >> SLOT_SHIFT) as u32
            } else {
                1
            };
            self.alloc_small(u)
        } else if n <= MAX_ALLOC {
            let u = (align_up(n, PAGE_SIZE) >> PAGE_SHIFT) as u32;
            self.alloc_large(u)
        } else {
            platform::sys_alloc(n)
        }
    }

    unsafe fn alloc_small(&mut self, u: u32) -> *mut u8 {
        if !self.sa.is_null() {
            let p = (*self.sa).alloc(u);
            if !p.is_null() {
                return p;
            }
        }

        // demote the full current SA and probe a couple of others,
        // draining their foreign frees along the way
        let mut scan = list::rotate_scan(&mut self.sa, SA_SCAN_LIMIT);
        while let Some(sa) = scan.next() {
            let p = (*sa).try_hard_alloc(u);
            if !p.is_null() {
                list::move_front(&mut self.sa, sa);
                return p;
            }
        }

        let owner = self as *mut ThreadAlloc;

        // carve a fresh SA out of the current container
        if !self.lb.is_null() {
            let sa = (*self.lb).make_small_alloc(owner);
            if !sa.is_null() {
                list::push_front(&mut self.sa, sa);
                return (*sa).alloc(u);
            }
        }

        // same self-organizing probe one level up
        let mut scan = list::rotate_scan(&mut self.lb, LB_SCAN_LIMIT);
        while let Some(lb) = scan.next() {
            let sa = (*lb).make_small_alloc(owner);
            if !sa.is_null() {
                list::move_front(&mut self.lb, lb);
                list::push_front(&mut self.sa, sa);
                return (*sa).alloc(u);
            }
        }

        // a fresh container from the back end
        let lb = global::pool().make_large_block(self.id);
        if lb.is_null() {
            return ptr::null_mut();
        }
        list::push_front(&mut self.lb, lb);
        let sa = (*lb).make_small_alloc(owner);
        if sa.is_null() {
            return ptr::null_mut();
        }
        list::push_front(&mut self.sa, sa);
        (*sa).alloc(u)
    }

    unsafe fn alloc_large(&mut self, u: u32) -> *mut u8 {
        if !self.la.is_null() {
            let p = (*self.la).alloc(u);
            if !p.is_null() {
                return p;
            }
        }

        let mut scan = list::rotate_scan(&mut self.la, LA_SCAN_LIMIT);
        while let Some(la) = scan.next() {
            let p = (*la).try_hard_alloc(u);
            if !p.is_null() {
                list::move_front(&mut self.la, la);
                return p;
            }
        }

        let la = global::pool().make_large_alloc(self.id, self as *mut ThreadAlloc);
        if la.is_null() {
            return ptr::null_mut();
        }
        list::push_front(&mut self.la, la);
        (*la).alloc(u)
    }

    /// Sized free. `n` must be the size passed to `alloc`/`realloc`; it
    /// selects the tier, and aligning `p` down to that tier's unit size
    /// recovers the owning sub-allocator without any lookup structure.
    ///
    /// # Safety
    /// `(p, n)` must be a live allocation; must be called on a thread with
    /// a front end (any thread, not only the owner).
    pub unsafe fn free(&mut self, p: *mut u8, n: usize) {
        if p.is_null() {
            return;
        }
        if n <= MAX_SMALL {
            let sa = align_down(p as usize, SMALL_UNIT) as *mut SmallAlloc;
            if (*sa).owner() == self as *mut ThreadAlloc {
                if (*sa).free(p) && sa != self.sa {
                    list::erase(&mut self.sa, sa);
                    let lb = (*sa).parent();
                    if (*lb).free(sa as *mut u8) && lb != self.lb {
                        list::erase(&mut self.lb, lb);
                        global::pool().free_unit(lb as *mut u8, (*lb).parent(), self.id);
                    }
                }
            } else {
                (*sa).xfree(p);
            }
        } else if n <= MAX_ALLOC {
            let la = align_down(p as usize, LARGE_UNIT) as *mut LargeAlloc;
            if (*la).owner() == self as *mut ThreadAlloc {
                if (*la).free(p) && la != self.la {
                    list::erase(&mut self.la, la);
                    global::pool().free_unit(la as *mut u8, (*la).parent(), self.id);
                }
            } else {
                (*la).xfree(p);
            }
        } else {
            platform::sys_free(p);
        }
    }

    /// Sized grow-only realloc. Fast path: the rounded old slot already
    /// covers `n`. Next: in-place cursor growth when `p` is the topmost
    /// object of the current sub-allocator. Last resort: alloc-copy-free.
    ///
    /// # Safety
    /// `(p, o)` must be a live allocation owned by this thread (or null
    /// `p`); `n > o`.
    pub unsafe fn realloc(&mut self, p: *mut u8, o: usize, n: usize) -> *mut u8 {
        if p.is_null() {
            return self.alloc(n);
        }
        if o > MAX_ALLOC {
            return platform::sys_realloc(p, n);
        }
        debug_assert!(n > o, "sized realloc only grows");

        if o <= MAX_SMALL {
            let k = if o > SLOT_SIZE {
                align_up(o, SLOT_SIZE)
            } else {
                SLOT_SIZE
            };
            if n <= k {
                return p;
            }
            let sa = align_down(p as usize, SMALL_UNIT) as *mut SmallAlloc;
            if sa == self.sa && n <= MAX_SMALL {
                let nk = align_up(n, SLOT_SIZE);
                let x = (*sa).realloc(p, (k >> SLOT_SHIFT) as u32, (nk >> SLOT_SHIFT) as u32);
                if !x.is_null() {
                    return x;
                }
            }
        } else {
            let k = align_up(o, PAGE_SIZE);
            if n <= k {
                return p;
            }
            let la = align_down(p as usize, LARGE_UNIT) as *mut LargeAlloc;
            if la == self.la && n <= MAX_ALLOC {
                let nk = align_up(n, PAGE_SIZE);
                let x = (*la).realloc(p, (k >> PAGE_SHIFT) as u32, (nk >> PAGE_SHIFT) as u32);
                if !x.is_null() {
                    return x;
                }
            }
        }

        let x = self.alloc(n);
        if !x.is_null() {
            ptr::copy_nonoverlapping(p, x, o);
            self.free(p, o);
        }
        x
    }
}

thread_local! {
    static TLS_ALLOC: Cell<*mut ThreadAlloc> = const { Cell::new(ptr::null_mut()) };
}

fn create_thread_alloc() -> *mut ThreadAlloc {
    unsafe {
        let ta = platform::sys_alloc(core::mem::size_of::<ThreadAlloc>()) as *mut ThreadAlloc;
        if !ta.is_null() {
            ta.write(ThreadAlloc::new());
        }
        ta
    }
}

/// The calling thread's front end, created on first use and kept for the
/// thread's lifetime. During TLS teardown a detached front end is handed
/// out instead: its frees still route correctly (foreign-owned memory goes
/// through `xfree`) at the cost of leaking the detached header.
pub fn thread_alloc() -> *mut ThreadAlloc {
    TLS_ALLOC
        .try_with(|cell| {
            let ta = cell.get();
            if !ta.is_null() {
                return ta;
            }
            let ta = create_thread_alloc();
            cell.set(ta);
            ta
        })
        .unwrap_or_else(|_| create_thread_alloc())
}
