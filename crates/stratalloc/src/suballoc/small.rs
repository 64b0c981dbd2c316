//! SmallAlloc: a 32 KiB Small unit serving 16-byte-granular objects.
//!
//! Layout of the unit:
//!
//! ```text
//! +0     64-byte header
//! +64    bs   (2048 bits, owner-only occupancy)
//! +320   xbs  (2048 bits, foreign-free marks)
//! +576   payload, 16-byte slots addressed by cur_bit
//! ```
//!
//! The 36 slots that would overlap the header region are excluded by
//! `MAX_BIT`, so slot indices and payload addresses line up without any
//! per-object metadata.

use crate::bitset::Bitset;
use crate::block::LargeBlock;
use crate::list::{Intrusive, Link};
use crate::thread::ThreadAlloc;
use crate::util::{SLOT_SHIFT, SMALL_SHIFT, WORD_SHIFT};
use core::cell::Cell;
use core::ptr;

/// Bits per map: one per 16-byte slot of the unit.
const BS_BITS: u32 = 1 << (SMALL_SHIFT - SLOT_SHIFT);

/// Bytes per map.
const BS_BYTES: usize = (BS_BITS as usize) >> 3;

/// Reserved header bytes ahead of the maps.
const HEADER_SIZE: usize = 64;

/// Payload offset: header plus both maps, already a multiple of 16.
const PAYLOAD_OFFSET: usize = HEADER_SIZE + 2 * BS_BYTES;

/// Highest usable cursor value: total slots minus the header's share.
pub const MAX_BIT: u32 = BS_BITS - ((PAYLOAD_OFFSET >> SLOT_SHIFT) as u32);

#[repr(C)]
pub struct SmallAlloc {
    link: Link,
    parent: *mut LargeBlock,
    owner: *mut ThreadAlloc,
    base: *mut u8,
    bs: Bitset,
    xbs: Bitset,
    cur_bit: Cell<u32>,
}

unsafe impl Intrusive for SmallAlloc {}

const _: () = assert!(core::mem::size_of::<SmallAlloc>() <= HEADER_SIZE);
const _: () = assert!(PAYLOAD_OFFSET % 16 == 0);

impl SmallAlloc {
    /// Place a SmallAlloc header at the start of a Small unit.
    ///
    /// # Safety
    /// `p` must be a committed Small unit. Its maps must be zero, which
    /// holds both for freshly committed units and for recycled ones: a unit
    /// is only reclaimed once `bs` is empty, and `bs` cannot empty while
    /// any `xbs` mark is undrained.
    pub unsafe fn init(
        p: *mut u8,
        parent: *mut LargeBlock,
        owner: *mut ThreadAlloc,
    ) -> *mut SmallAlloc {
        let sa = p as *mut SmallAlloc;
        sa.write(SmallAlloc {
            link: Link::new(),
            parent,
            owner,
            base: p.add(PAYLOAD_OFFSET),
            bs: Bitset::new(p.add(HEADER_SIZE)),
            xbs: Bitset::new(p.add(HEADER_SIZE + BS_BYTES)),
            cur_bit: Cell::new(0),
        });
        sa
    }

    pub fn parent(&self) -> *mut LargeBlock {
        self.parent
    }

    pub fn owner(&self) -> *mut ThreadAlloc {
        self.owner
    }

    /// Bump-allocate `n` 16-byte slots. Only the first slot of the span is
    /// recorded; the caller owns the (pointer, size) pair from here on.
    /// Null means the unit is full and the caller escalates.
    ///
    /// # Safety
    /// Owner thread only.
    #[inline]
    pub unsafe fn alloc(&self, n: u32) -> *mut u8 {
        let cur = self.cur_bit.get();
        if cur + n <= MAX_BIT {
            self.bs.set(cur);
            self.cur_bit.set(cur + n);
            self.base.add((cur as usize) << SLOT_SHIFT)
        } else {
            ptr::null_mut()
        }
    }

    /// Slow path: fold foreign frees back into `bs`, retracting the cursor
    /// cell by cell from the top while nothing live remains above, then
    /// retry the bump.
    ///
    /// # Safety
    /// Owner thread only.
    pub unsafe fn try_hard_alloc(&self, n: u32) -> *mut u8 {
        let mut i = (self.cur_bit.get() >> WORD_SHIFT) as i32;
        while i >= 0 {
            let x = self.xbs.load_cell(i as u32);
            if x != 0 {
                self.xbs.atomic_clear_cell(i as u32, x);
                self.bs.clear_cell(i as u32, x);
                let lsb = x.trailing_zeros() + ((i as u32) << WORD_SHIFT);
                let r = self.bs.rfind(self.cur_bit.get());
                if r >= lsb as i32 {
                    break;
                }
                self.cur_bit.set(if r >= 0 { lsb } else { 0 });
                if self.cur_bit.get() == 0 {
                    break;
                }
            }
            i -= 1;
        }
        self.alloc(n)
    }

    /// Owner free. Clears the span's slot and retracts the cursor when the
    /// freed span was above everything still live. True means the unit is
    /// now empty and may be reclaimed (unless it is the current one).
    ///
    /// # Safety
    /// Owner thread only; `p` must be a live span base in this unit.
    pub unsafe fn free(&self, p: *mut u8) -> bool {
        let i = (p.offset_from(self.base) >> SLOT_SHIFT) as i32;
        debug_assert!(i >= 0 && (i as u32) < MAX_BIT);
        let _was_set = self.bs.test_and_unset(i as u32);
        debug_assert!(_was_set, "free of an unallocated small span");
        let r = self.bs.rfind(self.cur_bit.get());
        if r < i {
            let cur = if r >= 0 { i as u32 } else { 0 };
            self.cur_bit.set(cur);
            cur == 0
        } else {
            false
        }
    }

    /// Foreign-thread free: one relaxed atomic mark, nothing else. The
    /// owner reclaims the span on its next slow-path visit.
    ///
    /// # Safety
    /// `p` must be a live span base in this unit.
    #[inline]
    pub unsafe fn xfree(&self, p: *mut u8) {
        let i = (p.offset_from(self.base) >> SLOT_SHIFT) as u32;
        self.xbs.atomic_set(i);
    }

    /// Grow the topmost span in place: legal only when `p + o` is exactly
    /// the cursor. Null tells the caller to fall back to alloc-copy-free.
    ///
    /// # Safety
    /// Owner thread only; `(p, o)` must name a live span in this unit.
    pub unsafe fn realloc(&self, p: *mut u8, o: u32, n: u32) -> *mut u8 {
        let i = (p.offset_from(self.base) >> SLOT_SHIFT) as u32;
        if self.cur_bit.get() == i + o && i + n <= MAX_BIT {
            self.cur_bit.set(i + n);
            return p;
        }
        ptr::null_mut()
    }
}
