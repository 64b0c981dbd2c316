//! Sized-API behavior tests.
//!
//! Each `#[test]` runs on its own thread and therefore on its own
//! front end, so single-thread placement behavior (cursor movement, slot
//! reuse, in-place realloc) is deterministic per test.

use stratalloc::util::{is_aligned, LARGE_UNIT, MAX_ALLOC};
use stratalloc::{alloc, free, realloc, static_alloc, zalloc};

#[test]
fn free_null_is_a_noop() {
    unsafe {
        free(std::ptr::null_mut(), 16);
        free(std::ptr::null_mut(), 100_000);
    }
}

#[test]
fn freed_slot_is_recycled_immediately() {
    let a = alloc(48);
    assert!(!a.is_null());
    unsafe {
        free(a, 48);
        let b = alloc(48);
        assert_eq!(b, a);
        free(b, 48);
    }
}

// ---------------------------------------------------------------------------
// Alignment per tier
// ---------------------------------------------------------------------------

#[test]
fn small_tier_is_16_byte_aligned() {
    for n in [1usize, 15, 16, 17, 100, 1024, 2048] {
        let p = alloc(n);
        assert!(!p.is_null());
        assert!(is_aligned(p as usize, 16), "alloc({}) misaligned", n);
        unsafe { free(p, n) };
    }
}

#[test]
fn large_tier_is_page_aligned() {
    for n in [2049usize, 4096, 5000, 65_536, MAX_ALLOC] {
        let p = alloc(n);
        assert!(!p.is_null());
        assert!(is_aligned(p as usize, 4096), "alloc({}) misaligned", n);
        unsafe { free(p, n) };
    }
}

#[test]
fn oversized_requests_use_the_system_allocator() {
    let n = MAX_ALLOC + 1;
    let p = alloc(n);
    assert!(!p.is_null());
    unsafe {
        std::ptr::write_bytes(p, 0x42, n);
        let q = realloc(p, n, 2 * n);
        assert!(!q.is_null());
        assert!((0..n).all(|i| q.add(i).read() == 0x42));
        free(q, 2 * n);
    }
}

// ---------------------------------------------------------------------------
// Non-overlap of live allocations
// ---------------------------------------------------------------------------

#[test]
fn live_allocations_never_overlap() {
    let sizes = [16usize, 48, 96, 256, 1000, 2048, 4096, 30_000];
    let mut live: Vec<(*mut u8, usize)> = Vec::new();
    for round in 0..20 {
        for (i, &n) in sizes.iter().enumerate() {
            let p = alloc(n);
            assert!(!p.is_null());
            unsafe { std::ptr::write_bytes(p, (round * 8 + i) as u8, n) };
            live.push((p, n));
        }
    }

    let mut ranges: Vec<(usize, usize)> = live
        .iter()
        .map(|&(p, n)| (p as usize, p as usize + n))
        .collect();
    ranges.sort();
    for w in ranges.windows(2) {
        assert!(w[0].1 <= w[1].0, "overlap: {:x?} vs {:x?}", w[0], w[1]);
    }

    // the fill patterns survived every later allocation
    for (k, &(p, n)) in live.iter().enumerate() {
        let expect = k as u8;
        let slice = unsafe { std::slice::from_raw_parts(p, n) };
        assert!(slice.iter().all(|&b| b == expect));
    }

    for (p, n) in live {
        unsafe { free(p, n) };
    }
}

// ---------------------------------------------------------------------------
// Cursor behavior
// ---------------------------------------------------------------------------

#[test]
fn freeing_a_tail_rewinds_into_it() {
    let a = alloc(16);
    let b = alloc(16);
    let c = alloc(16);
    assert_eq!(b as usize - a as usize, 16);
    assert_eq!(c as usize - b as usize, 16);
    unsafe {
        free(c, 16);
        free(b, 16);
        // the cursor fell back to b's slot, so a 32-byte span lands there
        let d = alloc(32);
        assert_eq!(d, b);
        free(d, 32);
        free(a, 16);
    }
}

#[test]
fn small_churn_stays_inside_one_large_unit() {
    const COUNT: usize = 10_000;
    const SIZE: usize = 48;

    let unit_of = |p: *mut u8| (p as usize) & !(LARGE_UNIT - 1);

    let mut ptrs: Vec<*mut u8> = (0..COUNT)
        .map(|_| {
            let p = alloc(SIZE);
            assert!(!p.is_null());
            p
        })
        .collect();
    let unit = unit_of(ptrs[0]);
    assert!(ptrs.iter().all(|&p| unit_of(p) == unit));

    // free every other object, then churn in more of the same size
    for i in (0..COUNT).step_by(2) {
        unsafe { free(ptrs[i], SIZE) };
    }
    let more: Vec<*mut u8> = (0..COUNT / 2)
        .map(|_| {
            let p = alloc(SIZE);
            assert!(!p.is_null());
            p
        })
        .collect();
    assert!(more.iter().all(|&p| unit_of(p) == unit));

    for i in (1..COUNT).step_by(2) {
        unsafe { free(ptrs[i], SIZE) };
    }
    for p in more {
        unsafe { free(p, SIZE) };
    }
    ptrs.clear();
}

// ---------------------------------------------------------------------------
// Realloc
// ---------------------------------------------------------------------------

#[test]
fn realloc_of_the_topmost_object_stays_in_place() {
    let p = alloc(64);
    assert!(!p.is_null());
    unsafe {
        let q = realloc(p, 64, 512);
        assert_eq!(q, p);
        free(q, 512);
    }
}

#[test]
fn realloc_within_the_rounded_slot_is_free() {
    let p = alloc(40);
    unsafe {
        // 40 rounds to 48, so growth inside the slot keeps the pointer
        let q = realloc(p, 40, 48);
        assert_eq!(q, p);
        free(q, 48);
    }

    let p = alloc(5000);
    unsafe {
        // page rounding: 5000 rounds to 8192
        let q = realloc(p, 5000, 8000);
        assert_eq!(q, p);
        free(q, 8000);
    }
}

#[test]
fn realloc_of_a_buried_object_copies() {
    let a = alloc(64);
    let b = alloc(64);
    unsafe {
        std::ptr::write_bytes(a, 0xAB, 64);
        let q = realloc(a, 64, 128);
        assert!(!q.is_null());
        assert_ne!(q, a, "a buried object cannot grow in place");
        assert!((0..64).all(|i| q.add(i).read() == 0xAB));
        free(q, 128);
        free(b, 64);
    }
}

#[test]
fn realloc_null_is_alloc() {
    unsafe {
        let p = realloc(std::ptr::null_mut(), 0, 96);
        assert!(!p.is_null());
        free(p, 96);
    }
}

#[test]
fn realloc_crossing_into_the_large_tier_copies() {
    let p = alloc(1024);
    unsafe {
        std::ptr::write_bytes(p, 0x77, 1024);
        let q = realloc(p, 1024, 10_000);
        assert!(!q.is_null());
        assert!(is_aligned(q as usize, 4096));
        assert!((0..1024).all(|i| q.add(i).read() == 0x77));
        free(q, 10_000);
    }
}

// ---------------------------------------------------------------------------
// zalloc / static_alloc
// ---------------------------------------------------------------------------

#[test]
fn zalloc_returns_zeroed_memory_even_for_recycled_slots() {
    let p = alloc(256);
    unsafe {
        std::ptr::write_bytes(p, 0xFF, 256);
        free(p, 256);
        let z = zalloc(256);
        assert_eq!(z, p, "expected the dirty slot back");
        assert!((0..256).all(|i| z.add(i).read() == 0));
        free(z, 256);
    }
}

#[test]
fn static_alloc_hands_out_distinct_permanent_chunks() {
    let a = static_alloc(100);
    let b = static_alloc(100);
    assert!(!a.is_null() && !b.is_null());
    assert_ne!(a, b);
    unsafe {
        std::ptr::write_bytes(a, 1, 100);
        std::ptr::write_bytes(b, 2, 100);
        assert!((0..100).all(|i| a.add(i).read() == 1));
    }
}
