/// Single-thread microbenchmarks for the sized API.
///
/// Run with `cargo run --release --bin micro`. Numbers are ns/op over a
/// warmed-up loop; compare against a system-malloc build by enabling the
/// `system-malloc` feature on the stratalloc dependency.
use std::hint::black_box;
use std::time::Instant;

use stratalloc::{alloc, free, realloc};

/// alloc/free latency for a given size.
fn bench_alloc_free(size: usize, iterations: usize) -> f64 {
    for _ in 0..1000 {
        let p = alloc(black_box(size));
        unsafe {
            std::ptr::write_bytes(p, 0xAB, size.min(64));
            free(black_box(p), size);
        }
    }
    let start = Instant::now();
    for _ in 0..iterations {
        let p = alloc(black_box(size));
        unsafe {
            std::ptr::write_bytes(p, 0xAB, size.min(64));
            free(black_box(p), size);
        }
    }
    start.elapsed().as_nanos() as f64 / iterations as f64
}

/// Bump-style growth, the pattern the in-place realloc is built for.
fn bench_realloc_grow(iterations: usize) -> f64 {
    const STEPS: [usize; 6] = [32, 64, 128, 256, 512, 1024];
    let start = Instant::now();
    for _ in 0..iterations {
        let mut p = alloc(black_box(16));
        let mut size = 16;
        for &next in black_box(&STEPS) {
            p = unsafe { realloc(black_box(p), size, next) };
            size = next;
        }
        unsafe { free(black_box(p), size) };
    }
    start.elapsed().as_nanos() as f64 / iterations as f64
}

/// Holding a working set while churning, so frees hit non-current units.
fn bench_working_set(size: usize, live: usize, iterations: usize) -> f64 {
    let mut held: Vec<*mut u8> = (0..live).map(|_| alloc(size)).collect();
    let start = Instant::now();
    for i in 0..iterations {
        let slot = i % live;
        unsafe { free(held[slot], size) };
        held[slot] = alloc(black_box(size));
    }
    let elapsed = start.elapsed().as_nanos() as f64 / iterations as f64;
    for p in held.drain(..) {
        unsafe { free(p, size) };
    }
    elapsed
}

fn main() {
    const ITERS: usize = 1_000_000;

    println!("{:<28}{:>12}", "benchmark", "ns/op");
    for size in [16usize, 48, 256, 1024, 2048] {
        println!(
            "{:<28}{:>12.1}",
            format!("alloc_free_{}", size),
            bench_alloc_free(size, ITERS)
        );
    }
    for size in [4096usize, 32768, 131072] {
        println!(
            "{:<28}{:>12.1}",
            format!("alloc_free_{}", size),
            bench_alloc_free(size, ITERS / 10)
        );
    }
    println!(
        "{:<28}{:>12.1}",
        "realloc_grow_16_to_1024",
        bench_realloc_grow(ITERS / 10)
    );
    println!(
        "{:<28}{:>12.1}",
        "working_set_256x1000",
        bench_working_set(256, 1000, ITERS)
    );
}
