#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use std::hint::black_box;
use std::time::Instant;

/// Spins for `iterations` rounds, sampling the monotonic clock and discarding it.
///
/// There is no blocking call in the loop, so wall time and CPU time both grow
/// linearly with `iterations`.
pub fn burn(iterations: u64) {
    for _ in 0..iterations {
        black_box(Instant::now());
    }
}
