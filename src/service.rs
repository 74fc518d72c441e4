#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use std::sync::Arc;

use prometheus::IntGauge;
use serde::Serialize;
use tokio::task::{self, JoinError};
use tracing::{error, info};

use crate::domain::{AppState, HandlerKind, MIB};
use crate::lib_disk::DiskError;
use crate::lib_net::NetworkError;
use crate::profiling::{self, Labels, ProfileScope, ScopeGuard};

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Disk(#[from] DiskError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("worker task failed")]
    Worker(#[from] JoinError),
}

struct InFlight(IntGauge);

impl InFlight {
    fn enter(gauge: IntGauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Labeled scope and in-flight accounting for one request, opened on the
/// blocking thread or task that does the work and closed when that work ends.
struct WorkScope {
    scope: Arc<dyn ProfileScope>,
    labels: Labels,
    in_flight: IntGauge,
}

impl WorkScope {
    fn open(self) -> (ScopeGuard, InFlight) {
        let in_flight = InFlight::enter(self.in_flight);
        (profiling::enter(&self.scope, self.labels), in_flight)
    }
}

#[derive(Clone)]
pub struct LoadRunner {
    state: AppState,
}

impl LoadRunner {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Runs one handler and returns the response body.
    ///
    /// The work itself is detached from the caller: dropping the returned
    /// future (client gone) does not stop the CPU loop, the disk loop or the
    /// network loop, and their profiling scope stays open until they finish.
    pub async fn run(&self, kind: HandlerKind) -> Result<String, HandlerError> {
        let metrics = &self.state.metrics;
        metrics.requests_total.with_label_values(&[kind.label()]).inc();
        info!(handler = %kind, "handling {kind} request");

        let work = WorkScope {
            scope: Arc::clone(&self.state.scope),
            labels: Labels::for_handler(kind),
            in_flight: metrics.in_flight.with_label_values(&[kind.label()]),
        };
        let result = match kind {
            HandlerKind::Slow | HandlerKind::Fast => self.cpu(kind, work).await,
            HandlerKind::Memory => self.memory(work).await,
            HandlerKind::Disk => self.disk(work).await,
            HandlerKind::Network => self.network(work).await,
        };
        if let Err(e) = &result {
            metrics.handler_errors_total.with_label_values(&[kind.label()]).inc();
            error!(handler = %kind, error = %e, source = ?std::error::Error::source(e), "handler failed");
        }
        result
    }

    async fn cpu(&self, kind: HandlerKind, work: WorkScope) -> Result<String, HandlerError> {
        let iterations = self.state.workloads.iterations(kind);
        task::spawn_blocking(move || {
            let _open = work.open();
            crate::lib_cpu::burn(iterations);
        })
        .await?;
        Ok(match kind {
            HandlerKind::Fast => "Fast request handled!\n".to_string(),
            _ => "Slow request handled!\n".to_string(),
        })
    }

    async fn memory(&self, work: WorkScope) -> Result<String, HandlerError> {
        let retention = self.state.retention.clone();
        let block = self.state.workloads.memory_block_bytes;
        let stride = self.state.workloads.page_stride;
        let leaked = task::spawn_blocking(move || {
            let _open = work.open();
            crate::lib_mem::leak(&retention, block, stride)
        })
        .await?;
        self.state
            .metrics
            .set_retention(leaked.retained_buffers, leaked.retained_bytes);
        Ok(format!("Memory leak allocated {}MB!\n", leaked.block_bytes / MIB))
    }

    async fn disk(&self, work: WorkScope) -> Result<String, HandlerError> {
        let plan = self.state.workloads.disk.clone();
        let report = task::spawn_blocking(move || {
            let _open = work.open();
            crate::lib_disk::run(&plan)
        })
        .await??;
        self.state
            .metrics
            .disk_bytes_read_total
            .inc_by(u64::try_from(report.bytes_read).unwrap_or(u64::MAX));
        Ok(format!(
            "Disk read {} bytes in {:?}!\n",
            report.bytes_read, report.elapsed
        ))
    }

    async fn network(&self, work: WorkScope) -> Result<String, HandlerError> {
        let plan = self.state.workloads.network.clone();
        let host = plan.host.clone();
        let report = tokio::spawn(async move {
            let _open = work.open();
            crate::lib_net::round_trip(&plan).await
        })
        .await??;
        // Timeouts and read errors are reported as a normal finish, same as EOF.
        info!(
            host = %host,
            bytes = report.bytes_read,
            reads = report.reads,
            ended_by = ?report.ended_by,
            "network call finished"
        );
        self.state
            .metrics
            .network_bytes_read_total
            .inc_by(u64::try_from(report.bytes_read).unwrap_or(u64::MAX));
        Ok(format!(
            "Network call to {host} finished in {:?}\n",
            report.elapsed
        ))
    }

    pub fn encode_metrics(&self) -> anyhow::Result<Vec<u8>> {
        self.state.metrics.encode_text()
    }

    pub fn health(&self) -> HealthReport {
        let retained_buffers = self.state.retention.len();
        let retained_bytes = self.state.retention.total_bytes();
        let metrics_ok = self.state.metrics.encode_text().is_ok();
        HealthReport {
            status: if metrics_ok { "ok" } else { "degraded" }.to_string(),
            retained_buffers,
            retained_bytes,
            metrics_ok,
            started_ts_seconds: self.state.started_ts_seconds,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub retained_buffers: usize,
    pub retained_bytes: usize,
    pub metrics_ok: bool,
    pub started_ts_seconds: i64,
}
