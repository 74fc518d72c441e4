#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Duration;

use load_demo_server::domain::DiskPlan;
use load_demo_server::lib_disk::{run, run_with, DiskError};

fn plan_in(dir: &Path, chunk_bytes: usize, chunks: usize) -> DiskPlan {
    DiskPlan {
        dir: Some(dir.to_path_buf()),
        chunk_bytes,
        chunks,
        read_pause: Duration::ZERO,
    }
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("read_dir").count()
}

#[derive(Default)]
struct Faults {
    write_after: Option<usize>,
    seek: bool,
    read: bool,
}

struct Faulty {
    inner: File,
    faults: Faults,
    writes: usize,
}

fn injected() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "injected")
}

impl Write for Faulty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.faults.write_after.is_some_and(|n| self.writes >= n) {
            return Err(injected());
        }
        self.writes += 1;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for Faulty {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.faults.seek {
            return Err(injected());
        }
        self.inner.seek(pos)
    }
}

impl Read for Faulty {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.faults.read {
            return Err(injected());
        }
        self.inner.read(buf)
    }
}

#[test]
fn default_plan_reads_back_hundred_mib() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plan = DiskPlan {
        dir: Some(dir.path().to_path_buf()),
        read_pause: Duration::ZERO,
        ..DiskPlan::default()
    };
    assert_eq!(plan.total_bytes(), 104_857_600);
    let report = run(&plan).expect("disk run");
    assert_eq!(report.bytes_written, 104_857_600);
    assert_eq!(report.bytes_read, 104_857_600);
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn read_pause_is_applied_per_chunk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plan = DiskPlan {
        read_pause: Duration::from_millis(5),
        ..plan_in(dir.path(), 4096, 4)
    };
    let report = run(&plan).expect("disk run");
    assert_eq!(report.bytes_read, 4 * 4096);
    assert!(report.elapsed >= Duration::from_millis(20));
}

#[test]
fn write_fault_removes_temp_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plan = plan_in(dir.path(), 4096, 8);
    let res = run_with(&plan, |inner| Faulty {
        inner,
        faults: Faults { write_after: Some(2), ..Faults::default() },
        writes: 0,
    });
    assert!(matches!(res, Err(DiskError::Write(_))));
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn seek_fault_removes_temp_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plan = plan_in(dir.path(), 4096, 2);
    let res = run_with(&plan, |inner| Faulty {
        inner,
        faults: Faults { seek: true, ..Faults::default() },
        writes: 0,
    });
    assert!(matches!(res, Err(DiskError::Seek(_))));
    assert_eq!(res.unwrap_err().to_string(), "Seek error");
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn read_fault_ends_loop_without_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plan = plan_in(dir.path(), 4096, 2);
    let report = run_with(&plan, |inner| Faulty {
        inner,
        faults: Faults { read: true, ..Faults::default() },
        writes: 0,
    })
    .expect("read errors are not reported");
    assert_eq!(report.bytes_read, 0);
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn missing_dir_fails_create() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plan = plan_in(&dir.path().join("absent"), 4096, 1);
    let res = run(&plan);
    assert!(matches!(res, Err(DiskError::Create(_))));
    assert_eq!(res.unwrap_err().to_string(), "Failed to create temp file");
}
