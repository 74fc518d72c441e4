#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use anyhow::{bail, Result as AnyResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::Metrics;
use crate::profiling::ProfileScope;

pub const MIB: usize = 1024 * 1024;

/// The five load shapes served over HTTP.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Slow,
    Fast,
    Memory,
    Disk,
    Network,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 5] = [
        HandlerKind::Slow,
        HandlerKind::Fast,
        HandlerKind::Memory,
        HandlerKind::Disk,
        HandlerKind::Network,
    ];

    /// Tag value attached to the profiling scope and metrics of a request.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            HandlerKind::Slow => "slow",
            HandlerKind::Fast => "fast",
            HandlerKind::Memory => "memory",
            HandlerKind::Disk => "disk",
            HandlerKind::Network => "network",
        }
    }
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for HandlerKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> AnyResult<Self> {
        match s {
            "slow" => Ok(Self::Slow),
            "fast" => Ok(Self::Fast),
            "memory" => Ok(Self::Memory),
            "disk" => Ok(Self::Disk),
            "network" => Ok(Self::Network),
            other => bail!(format!("unknown handler: {other}")),
        }
    }
}

/// Buffers that stay reachable until the process exits.
///
/// Append-only: nothing ever reads the buffers back or removes them, the list
/// only exists so the allocator can never reclaim them.
#[derive(Clone, Default)]
pub struct RetentionList {
    buffers: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RetentionList {
    /// Appends `buf` and returns `(buffer count, total retained bytes)` after the append.
    pub fn retain(&self, buf: Vec<u8>) -> (usize, usize) {
        let mut buffers = self.buffers.lock();
        buffers.push(buf);
        (buffers.len(), buffers.iter().map(Vec::len).sum())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.lock().is_empty()
    }

    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.buffers.lock().iter().map(Vec::len).sum()
    }
}

/// Every literal the handlers run with. `Default` is the production shape.
#[derive(Clone, Debug)]
pub struct WorkloadConfig {
    pub slow_iterations: u64,
    pub fast_iterations: u64,
    pub memory_block_bytes: usize,
    pub page_stride: usize,
    pub disk: DiskPlan,
    pub network: NetworkPlan,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            slow_iterations: 20_000_000,
            fast_iterations: 5_000_000,
            memory_block_bytes: 100 * MIB,
            page_stride: 4096,
            disk: DiskPlan::default(),
            network: NetworkPlan::default(),
        }
    }
}

impl WorkloadConfig {
    #[must_use]
    pub fn iterations(&self, kind: HandlerKind) -> u64 {
        match kind {
            HandlerKind::Fast => self.fast_iterations,
            _ => self.slow_iterations,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DiskPlan {
    /// `None` means the OS temp directory.
    pub dir: Option<std::path::PathBuf>,
    pub chunk_bytes: usize,
    pub chunks: usize,
    pub read_pause: Duration,
}

impl Default for DiskPlan {
    fn default() -> Self {
        Self {
            dir: None,
            chunk_bytes: MIB,
            chunks: 100,
            read_pause: Duration::from_millis(10),
        }
    }
}

impl DiskPlan {
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.chunk_bytes.saturating_mul(self.chunks)
    }
}

#[derive(Clone, Debug)]
pub struct NetworkPlan {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub read_pause: Duration,
    pub buf_bytes: usize,
}

impl Default for NetworkPlan {
    fn default() -> Self {
        Self {
            host: "example.org".to_string(),
            port: 80,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_millis(300),
            read_pause: Duration::from_millis(200),
            buf_bytes: 4096,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub retention: RetentionList,
    pub metrics: Metrics,
    pub scope: Arc<dyn ProfileScope>,
    pub workloads: Arc<WorkloadConfig>,
    pub started_ts_seconds: i64,
}

impl AppState {
    pub fn new(metrics: Metrics, scope: Arc<dyn ProfileScope>, workloads: WorkloadConfig) -> Self {
        Self {
            retention: RetentionList::default(),
            metrics,
            scope,
            workloads: Arc::new(workloads),
            started_ts_seconds: chrono::Utc::now().timestamp(),
        }
    }
}
