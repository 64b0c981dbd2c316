#![no_main]

use libfuzzer_sys::fuzz_target;

/// Interpret the input as a stream of sized-allocator operations.
///
/// Each operation is four bytes:
///   byte 0: opcode (0=alloc, 1=free, 2=realloc-grow, 3=zalloc)
///   byte 1-2: size (little-endian u16, so both tiers and the oversized
///             path beyond them get exercised via realloc growth)
///   byte 3: slot index (which tracked pointer to operate on)
///
/// The harness owns the (pointer, size) pairs, mirroring the sized-free
/// contract real callers carry.
const MAX_SLOTS: usize = 64;

fuzz_target!(|data: &[u8]| {
    let mut slots: [*mut u8; MAX_SLOTS] = [std::ptr::null_mut(); MAX_SLOTS];
    let mut sizes: [usize; MAX_SLOTS] = [0; MAX_SLOTS];

    let mut i = 0;
    while i + 4 <= data.len() {
        let opcode = data[i] & 0x03;
        let size = u16::from_le_bytes([data[i + 1], data[i + 2]]) as usize;
        let slot = (data[i + 3] as usize) % MAX_SLOTS;
        i += 4;

        match opcode {
            0 => {
                if !slots[slot].is_null() {
                    unsafe { stratalloc::free(slots[slot], sizes[slot]) };
                }
                let ptr = stratalloc::alloc(size);
                slots[slot] = ptr;
                sizes[slot] = size;
                if !ptr.is_null() && size > 0 {
                    unsafe {
                        std::ptr::write_bytes(ptr, 0xAA, size.min(256));
                    }
                }
            }
            1 => {
                if !slots[slot].is_null() {
                    unsafe { stratalloc::free(slots[slot], sizes[slot]) };
                    slots[slot] = std::ptr::null_mut();
                    sizes[slot] = 0;
                }
            }
            2 => {
                // grow-only contract: skip non-growing requests
                if slots[slot].is_null() {
                    let ptr = unsafe { stratalloc::realloc(std::ptr::null_mut(), 0, size) };
                    slots[slot] = ptr;
                    sizes[slot] = size;
                } else if size > sizes[slot] {
                    let ptr = unsafe { stratalloc::realloc(slots[slot], sizes[slot], size) };
                    if !ptr.is_null() {
                        slots[slot] = ptr;
                        sizes[slot] = size;
                    }
                    // null keeps the original live at its original size
                }
            }
            3 => {
                if !slots[slot].is_null() {
                    unsafe { stratalloc::free(slots[slot], sizes[slot]) };
                }
                let ptr = stratalloc::zalloc(size);
                slots[slot] = ptr;
                sizes[slot] = size;
                if !ptr.is_null() && size > 0 {
                    let check = size.min(256);
                    for j in 0..check {
                        assert_eq!(
                            unsafe { *ptr.add(j) },
                            0,
                            "zalloc memory not zeroed at offset {}",
                            j
                        );
                    }
                }
            }
            _ => unreachable!(),
        }
    }

    for slot in 0..MAX_SLOTS {
        if !slots[slot].is_null() {
            unsafe { stratalloc::free(slots[slot], sizes[slot]) };
            slots[slot] = std::ptr::null_mut();
        }
    }
});
