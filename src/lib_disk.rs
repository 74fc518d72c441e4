#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::domain::DiskPlan;

const TEMP_PREFIX: &str = "loadtest";

#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    #[error("Failed to create temp file")]
    Create(#[source] io::Error),
    #[error("Disk write error")]
    Write(#[source] io::Error),
    #[error("Seek error")]
    Seek(#[source] io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskReport {
    pub bytes_written: usize,
    pub bytes_read: usize,
    pub elapsed: Duration,
}

/// Writes `plan.total_bytes()` to a fresh temp file, rewinds, and reads it
/// back chunk by chunk with `plan.read_pause` after every non-empty read.
///
/// Blocking; call from a blocking thread.
pub fn run(plan: &DiskPlan) -> Result<DiskReport, DiskError> {
    run_with(plan, |file| file)
}

/// Same as [`run`], but the temp file handle is passed through `wrap` first,
/// which lets callers interpose on the I/O (fault injection, accounting).
///
/// The handle is closed and the file removed on every return path.
pub fn run_with<W, H>(plan: &DiskPlan, wrap: W) -> Result<DiskReport, DiskError>
where
    W: FnOnce(File) -> H,
    H: Read + Write + Seek,
{
    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX);
    let tmp = match &plan.dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(DiskError::Create)?;
    let (file, path) = tmp.into_parts();
    debug!(path = %path.display(), "temp file created");

    let mut handle = wrap(file);
    let result = round_trip(&mut handle, plan);
    drop(handle);
    if let Err(e) = path.close() {
        warn!(error = %e, "temp file removal failed");
    }
    result
}

fn round_trip<H: Read + Write + Seek>(handle: &mut H, plan: &DiskPlan) -> Result<DiskReport, DiskError> {
    let mut data = vec![0u8; plan.chunk_bytes];
    let mut bytes_written = 0;
    for _ in 0..plan.chunks {
        handle.write_all(&data).map_err(DiskError::Write)?;
        bytes_written += data.len();
    }
    handle.flush().map_err(DiskError::Write)?;
    handle.seek(SeekFrom::Start(0)).map_err(DiskError::Seek)?;

    let start = Instant::now();
    let mut bytes_read = 0;
    loop {
        match handle.read(&mut data) {
            Ok(0) => break,
            Ok(n) => {
                bytes_read += n;
                thread::sleep(plan.read_pause);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                // A failed read ends the loop like EOF does; the partial count is reported.
                warn!(error = %e, bytes_read, "disk read stopped early");
                break;
            }
        }
    }
    Ok(DiskReport {
        bytes_written,
        bytes_read,
        elapsed: start.elapsed(),
    })
}
