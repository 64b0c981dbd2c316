//! The shared back end: sharded pools of huge blocks vending Large units.
//!
//! A thread's id picks its shard, so threads mostly contend only with the
//! few others hashing onto the same slot. Within a shard the huge-block
//! list self-organizes exactly like the front-end lists: try the current
//! head, demote it and probe a bounded handful, else reserve a fresh block.

use crate::block::{HugeBlock, LargeBlock};
use crate::list;
use crate::platform;
use crate::suballoc::LargeAlloc;
use crate::sync::Mutex;
use crate::thread::ThreadAlloc;
use crate::util::{HUGE_SIZE, LARGE_UNIT, SHARD_COUNT};
use core::ptr;

/// Huge blocks probed after the head before giving up and reserving.
const HB_SCAN_LIMIT: u32 = 8;

/// Shard list head. The wrapper exists to carry Send across the mutex.
struct HbList(*mut HugeBlock);

unsafe impl Send for HbList {}

/// Padded to its own cache lines so neighboring shard locks do not
/// false-share.
#[repr(align(128))]
struct Shard {
    list: Mutex<HbList>,
}

pub struct GlobalPool {
    shards: [Shard; SHARD_COUNT],
}

impl GlobalPool {
    pub const fn new() -> Self {
        const SHARD: Shard = Shard {
            list: Mutex::new(HbList(ptr::null_mut())),
        };
        GlobalPool {
            shards: [SHARD; SHARD_COUNT],
        }
    }

    #[inline]
    fn shard(&self, alloc_id: u32) -> &Shard {
        &self.shards[(alloc_id as usize) & (SHARD_COUNT - 1)]
    }

    /// Vend one reserved Large unit and its owning huge block, committing
    /// it outside the shard lock. Null only when reservation fails.
    ///
    /// # Safety
    /// `parent` receives the owning block; the unit must later return via
    /// [`Self::free_unit`] with that same block.
    pub unsafe fn alloc_unit(&self, alloc_id: u32, parent: &mut *mut HugeBlock) -> *mut u8 {
        let shard = self.shard(alloc_id);
        let mut p: *mut u8 = ptr::null_mut();
        {
            let mut head = shard.list.lock();
            if !head.0.is_null() {
                p = (*head.0).alloc();
                if !p.is_null() {
                    *parent = head.0;
                }
            }
            if p.is_null() {
                let mut scan = list::rotate_scan(&mut head.0, HB_SCAN_LIMIT);
                while let Some(hb) = scan.next() {
                    let q = (*hb).alloc();
                    if !q.is_null() {
                        p = q;
                        *parent = hb;
                        list::move_front(&mut head.0, hb);
                        break;
                    }
                }
            }
            if p.is_null() {
                let hb = HugeBlock::create();
                if !hb.is_null() {
                    list::push_front(&mut head.0, hb);
                    p = (*hb).alloc();
                    *parent = hb;
                }
            }
        }
        if !p.is_null() {
            platform::commit(p, LARGE_UNIT);
        }
        p
    }

    /// Vend a Large unit initialized as a container of Small units.
    ///
    /// # Safety
    /// Caller is the owning front end.
    pub unsafe fn make_large_block(&self, alloc_id: u32) -> *mut LargeBlock {
        let mut parent: *mut HugeBlock = ptr::null_mut();
        let p = self.alloc_unit(alloc_id, &mut parent);
        if p.is_null() {
            return ptr::null_mut();
        }
        LargeBlock::init(p, parent)
    }

    /// Vend a Large unit initialized as a page-granular sub-allocator
    /// owned by `owner`.
    ///
    /// # Safety
    /// Caller is the owning front end.
    pub unsafe fn make_large_alloc(&self, alloc_id: u32, owner: *mut ThreadAlloc) -> *mut LargeAlloc {
        let mut parent: *mut HugeBlock = ptr::null_mut();
        let p = self.alloc_unit(alloc_id, &mut parent);
        if p.is_null() {
            return ptr::null_mut();
        }
        LargeAlloc::init(p, parent, owner)
    }

    /// Take a Large unit back: decommit it, clear its occupancy bit and
    /// release the whole huge block once it is empty, unless it is the
    /// shard's current head, which stays behind as a hot cache.
    ///
    /// # Safety
    /// `p` must be a unit vended from `hb` by this pool, with no live
    /// objects inside; `alloc_id` must be the id it was vended under.
    pub unsafe fn free_unit(&self, p: *mut u8, hb: *mut HugeBlock, alloc_id: u32) {
        platform::decommit(p, LARGE_UNIT);
        let shard = self.shard(alloc_id);
        let release = {
            let mut head = shard.list.lock();
            let empty = (*hb).free(p);
            let release = empty && hb != head.0;
            if release {
                list::erase(&mut head.0, hb);
            }
            release
        };
        if release {
            platform::release(hb as *mut u8, HUGE_SIZE);
        }
    }

    #[cfg(test)]
    fn shard_blocks(&self, alloc_id: u32) -> usize {
        let head = self.shard(alloc_id).list.lock();
        let mut n = 0;
        let mut cur = head.0;
        while !cur.is_null() {
            n += 1;
            cur = unsafe { *(cur as *mut *mut HugeBlock) };
        }
        n
    }
}

/// The process-wide pool. Const-constructed, so there is no one-time
/// initialization to race on.
static POOL: GlobalPool = GlobalPool::new();

#[inline]
pub fn pool() -> &'static GlobalPool {
    &POOL
}
