#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use anyhow::{bail, Context, Result as AnyResult};
use std::net::SocketAddr;

use crate::domain::WorkloadConfig;

pub fn validate_workloads(w: &WorkloadConfig) -> AnyResult<()> {
    if w.page_stride == 0 { bail!("page_stride must be > 0"); }
    if w.disk.chunk_bytes == 0 { bail!("disk chunk_bytes must be > 0"); }
    if w.disk.chunks == 0 { bail!("disk chunks must be > 0"); }
    if w.network.host.trim().is_empty() { bail!("network host is empty"); }
    if w.network.port == 0 { bail!("network port must be > 0"); }
    if w.network.connect_timeout.is_zero() { bail!("network connect_timeout must be > 0"); }
    if w.network.read_timeout.is_zero() { bail!("network read_timeout must be > 0"); }
    Ok(())
}

pub fn validate_bind(bind: &str) -> AnyResult<SocketAddr> {
    bind.parse::<SocketAddr>()
        .with_context(|| format!("invalid bind address: {bind}"))
}
