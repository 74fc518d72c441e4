#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use crate::domain::RetentionList;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Leaked {
    pub block_bytes: usize,
    pub retained_buffers: usize,
    pub retained_bytes: usize,
}

/// Allocates `block_bytes`, writes one byte per `page_stride` so the pages are
/// actually committed, and hands the buffer to `retention`.
pub fn leak(retention: &RetentionList, block_bytes: usize, page_stride: usize) -> Leaked {
    let mut buf = vec![0u8; block_bytes];
    // Non-zero so the store can't be elided against the zeroed allocation.
    for byte in buf.iter_mut().step_by(page_stride.max(1)) {
        *byte = 1;
    }
    let (retained_buffers, retained_bytes) = retention.retain(buf);
    Leaked {
        block_bytes,
        retained_buffers,
        retained_bytes,
    }
}
