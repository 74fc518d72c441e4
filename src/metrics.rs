#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use anyhow::{Context, Result as AnyResult};
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::domain::HandlerKind;

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,
    pub requests_total: IntCounterVec,
    pub handler_errors_total: IntCounterVec,
    pub in_flight: IntGaugeVec,
    pub retained_bytes: IntGauge,
    pub retained_buffers: IntGauge,
    pub disk_bytes_read_total: IntCounter,
    pub network_bytes_read_total: IntCounter,
}

impl Metrics {
    pub fn new() -> AnyResult<Self> {
        let registry = Registry::new();
        let requests_total = IntCounterVec::new(
            Opts::new("demo_requests_total", "requests served per handler"),
            &["handler"],
        )
        .context("create requests_total")?;
        let handler_errors_total = IntCounterVec::new(
            Opts::new("demo_handler_errors_total", "requests answered with 500 per handler"),
            &["handler"],
        )
        .context("create handler_errors_total")?;
        let in_flight = IntGaugeVec::new(
            Opts::new("demo_in_flight_requests", "requests currently running per handler"),
            &["handler"],
        )
        .context("create in_flight")?;
        registry
            .register(Box::new(requests_total.clone()))
            .context("register requests_total")?;
        registry
            .register(Box::new(handler_errors_total.clone()))
            .context("register handler_errors_total")?;
        registry
            .register(Box::new(in_flight.clone()))
            .context("register in_flight")?;
        let retained_bytes = IntGauge::with_opts(Opts::new(
            "demo_retained_bytes",
            "bytes held by the retention list",
        ))
        .context("create retained_bytes")?;
        let retained_buffers = IntGauge::with_opts(Opts::new(
            "demo_retained_buffers",
            "buffers held by the retention list",
        ))
        .context("create retained_buffers")?;
        let disk_bytes_read_total = IntCounter::with_opts(Opts::new(
            "demo_disk_bytes_read_total",
            "bytes read back by the disk handler",
        ))
        .context("create disk_bytes_read_total")?;
        let network_bytes_read_total = IntCounter::with_opts(Opts::new(
            "demo_network_bytes_read_total",
            "bytes received by the network handler",
        ))
        .context("create network_bytes_read_total")?;
        registry
            .register(Box::new(retained_bytes.clone()))
            .context("register retained_bytes")?;
        registry
            .register(Box::new(retained_buffers.clone()))
            .context("register retained_buffers")?;
        registry
            .register(Box::new(disk_bytes_read_total.clone()))
            .context("register disk_bytes_read_total")?;
        registry
            .register(Box::new(network_bytes_read_total.clone()))
            .context("register network_bytes_read_total")?;
        for kind in HandlerKind::ALL {
            requests_total.with_label_values(&[kind.label()]);
            handler_errors_total.with_label_values(&[kind.label()]);
            in_flight.with_label_values(&[kind.label()]);
        }
        Ok(Self {
            registry,
            requests_total,
            handler_errors_total,
            in_flight,
            retained_bytes,
            retained_buffers,
            disk_bytes_read_total,
            network_bytes_read_total,
        })
    }

    pub fn set_retention(&self, buffers: usize, bytes: usize) {
        self.retained_buffers
            .set(i64::try_from(buffers).unwrap_or(i64::MAX));
        self.retained_bytes.set(i64::try_from(bytes).unwrap_or(i64::MAX));
    }

    pub fn encode_text(&self) -> AnyResult<Vec<u8>> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf).context("encode metrics")?;
        Ok(buf)
    }
}
