//! Large blocks: Large units repurposed as containers of Small units.
//!
//! The header sits at the unit base and costs the first Small unit; the
//! remaining 63 host SmallAllocs. Same one-word occupancy scheme as the
//! huge block one level up.

use crate::block::HugeBlock;
use crate::list::{Intrusive, Link};
use crate::suballoc::SmallAlloc;
use crate::thread::ThreadAlloc;
use crate::util::{SMALL_SHIFT, UNITS_PER_BLOCK};
use core::cell::Cell;
use core::ptr;

#[repr(C)]
pub struct LargeBlock {
    link: Link,
    parent: *mut HugeBlock,
    /// First Small unit, one unit above the header.
    base: *mut u8,
    bits: Cell<usize>,
}

unsafe impl Intrusive for LargeBlock {}

impl LargeBlock {
    /// Header-initialize a committed Large unit as a container.
    ///
    /// # Safety
    /// `p` must be a committed, Large-unit-aligned unit owned by `parent`.
    pub unsafe fn init(p: *mut u8, parent: *mut HugeBlock) -> *mut LargeBlock {
        let lb = p as *mut LargeBlock;
        lb.write(LargeBlock {
            link: Link::new(),
            parent,
            base: p.add(1 << SMALL_SHIFT),
            bits: Cell::new(0),
        });
        lb
    }

    pub fn parent(&self) -> *mut HugeBlock {
        self.parent
    }

    /// Carve one Small unit, or null when full.
    pub fn alloc(&self) -> *mut u8 {
        let bits = self.bits.get();
        let i = (!bits).trailing_zeros();
        if i < UNITS_PER_BLOCK {
            self.bits.set(bits | (1usize << i));
            unsafe { self.base.add((i as usize) << SMALL_SHIFT) }
        } else {
            ptr::null_mut()
        }
    }

    /// Return a Small unit; true when the container is now empty.
    ///
    /// # Safety
    /// `p` must be a unit base previously returned by [`Self::alloc`].
    pub unsafe fn free(&self, p: *mut u8) -> bool {
        let i = (p.offset_from(self.base) as usize) >> SMALL_SHIFT;
        debug_assert!((i as u32) < UNITS_PER_BLOCK);
        let bits = self.bits.get() & !(1usize << i);
        self.bits.set(bits);
        bits == 0
    }

    /// Carve a Small unit and place a [`SmallAlloc`] owned by `owner` in it.
    /// Null when the container is full.
    ///
    /// # Safety
    /// `self` must be a live container; `owner` must be the calling
    /// thread's front end.
    pub unsafe fn make_small_alloc(&self, owner: *mut ThreadAlloc) -> *mut SmallAlloc {
        let p = self.alloc();
        if p.is_null() {
            return ptr::null_mut();
        }
        SmallAlloc::init(p, self as *const LargeBlock as *mut LargeBlock, owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{LARGE_UNIT, SMALL_UNIT};

    // A fabricated Large unit, word-aligned: unit alignment only matters
    // for the pointer-recovery done one level up, not for the container.
    fn unit() -> Vec<u64> {
        vec![0u64; LARGE_UNIT / 8]
    }

    #[test]
    fn units_start_above_the_header() {
        let mut buf = unit();
        unsafe {
            let lb = LargeBlock::init(buf.as_mut_ptr() as *mut u8, ptr::null_mut());
            let a = (*lb).alloc();
            let b = (*lb).alloc();
            assert_eq!(a as usize - lb as usize, SMALL_UNIT);
            assert_eq!(b as usize - a as usize, SMALL_UNIT);
            assert!(!(*lb).free(a));
            assert!((*lb).free(b));
        }
    }

    #[test]
    fn exhaustion_and_emptiness() {
        let mut buf = unit();
        unsafe {
            let lb = LargeBlock::init(buf.as_mut_ptr() as *mut u8, ptr::null_mut());
            let mut units = Vec::new();
            loop {
                let p = (*lb).alloc();
                if p.is_null() {
                    break;
                }
                units.push(p);
            }
            assert_eq!(units.len(), UNITS_PER_BLOCK as usize);
            while let Some(p) = units.pop() {
                assert_eq!((*lb).free(p), units.is_empty());
            }
        }
    }
}
