/// Server-style churn benchmark: every thread allocates batches, hands
/// them to its right neighbor and frees what it receives, so a large
/// share of frees are cross-thread. Modeled on the classic Larson
/// workload.
///
/// Usage: `cargo run --release --bin churn [threads] [seconds]`
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use stratalloc::{alloc, free};

const BATCH: usize = 500;
const MIN_SIZE: usize = 16;
const MAX_SIZE: usize = 1024;

/// xorshift, good enough to spread sizes across the small tier.
fn next_size(state: &mut u64) -> usize {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    MIN_SIZE + (*state as usize) % (MAX_SIZE - MIN_SIZE)
}

fn main() {
    let num_threads: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);
    let seconds: u64 = std::env::args()
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    println!("churn: {} threads, {} seconds", num_threads, seconds);

    let stop = Arc::new(AtomicBool::new(false));
    let total_ops = Arc::new(AtomicUsize::new(0));
    let mailboxes: Vec<Arc<Mutex<Vec<(usize, usize)>>>> = (0..num_threads)
        .map(|_| Arc::new(Mutex::new(Vec::new())))
        .collect();

    let start = Instant::now();
    let handles: Vec<_> = (0..num_threads)
        .map(|tid| {
            let stop = Arc::clone(&stop);
            let total_ops = Arc::clone(&total_ops);
            let own = Arc::clone(&mailboxes[tid]);
            let next = Arc::clone(&mailboxes[(tid + 1) % num_threads]);
            thread::spawn(move || {
                let mut rng = 0x9E3779B97F4A7C15u64 ^ (tid as u64 + 1);
                let mut ops = 0usize;
                while !stop.load(Ordering::Relaxed) {
                    let batch: Vec<(usize, usize)> = (0..BATCH)
                        .map(|_| {
                            let n = next_size(&mut rng);
                            let p = alloc(n);
                            assert!(!p.is_null());
                            unsafe { std::ptr::write_bytes(p, tid as u8, n.min(64)) };
                            (p as usize, n)
                        })
                        .collect();
                    next.lock().unwrap().extend(batch);

                    let incoming: Vec<(usize, usize)> = own.lock().unwrap().drain(..).collect();
                    ops += BATCH + incoming.len();
                    for (addr, n) in incoming {
                        unsafe { free(addr as *mut u8, n) };
                    }
                }
                let incoming: Vec<(usize, usize)> = own.lock().unwrap().drain(..).collect();
                for (addr, n) in incoming {
                    unsafe { free(addr as *mut u8, n) };
                }
                total_ops.fetch_add(ops, Ordering::Relaxed);
            })
        })
        .collect();

    thread::sleep(Duration::from_secs(seconds));
    stop.store(true, Ordering::Relaxed);
    for h in handles {
        h.join().unwrap();
    }

    let elapsed = start.elapsed().as_secs_f64();
    let ops = total_ops.load(Ordering::Relaxed);
    println!(
        "{} ops in {:.2}s = {:.0} ops/s/thread",
        ops,
        elapsed,
        ops as f64 / elapsed / num_threads as f64
    );
}
