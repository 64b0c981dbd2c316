//! Huge blocks: the unit of address-space reservation.
//!
//! A huge block reserves 2^27 bytes (2^25 on 32-bit), keeps its header in
//! the first committed page and carves the rest into Large units on demand.
//! Occupancy is a single word; one slot is sacrificed so the header page
//! never collides with a unit.

use crate::list::{Intrusive, Link};
use crate::platform;
use crate::util::{align_up, HUGE_SIZE, LARGE_SHIFT, LARGE_UNIT, PAGE_SIZE, UNITS_PER_BLOCK};
use core::cell::Cell;
use core::ptr;

#[repr(C)]
pub struct HugeBlock {
    link: Link,
    /// First Large unit; aligned up from the reservation base, skipping one
    /// unit when the base itself is already aligned.
    base: *mut u8,
    bits: Cell<usize>,
}

unsafe impl Intrusive for HugeBlock {}

impl HugeBlock {
    /// Reserve and header-initialize a fresh huge block. Null when the VM
    /// layer is out of address space.
    pub unsafe fn create() -> *mut HugeBlock {
        let raw = platform::reserve(HUGE_SIZE);
        if raw.is_null() {
            return ptr::null_mut();
        }
        platform::commit(raw, PAGE_SIZE);
        let mut base = align_up(raw as usize, LARGE_UNIT) as *mut u8;
        if base == raw {
            base = raw.add(LARGE_UNIT);
        }
        let hb = raw as *mut HugeBlock;
        hb.write(HugeBlock {
            link: Link::new(),
            base,
            bits: Cell::new(0),
        });
        hb
    }

    /// Carve one Large unit: lowest clear occupancy bit, or null when all
    /// usable slots are taken. The unit is returned reserved, not committed.
    pub fn alloc(&self) -> *mut u8 {
        let bits = self.bits.get();
        let i = (!bits).trailing_zeros();
        if i < UNITS_PER_BLOCK {
            self.bits.set(bits | (1usize << i));
            unsafe { self.base.add((i as usize) << LARGE_SHIFT) }
        } else {
            ptr::null_mut()
        }
    }

    /// Return a unit; true when the block is now entirely empty.
    ///
    /// # Safety
    /// `p` must be a unit base previously returned by [`Self::alloc`].
    pub unsafe fn free(&self, p: *mut u8) -> bool {
        let i = (p.offset_from(self.base) as usize) >> LARGE_SHIFT;
        debug_assert!((i as u32) < UNITS_PER_BLOCK);
        let bits = self.bits.get() & !(1usize << i);
        self.bits.set(bits);
        bits == 0
    }
}
