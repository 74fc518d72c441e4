#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use load_demo_server::config::LogFormat;
use load_demo_server::validation::validate_bind;
use load_demo_server::{
    profiling, serve, validate_workloads, AppState, Config, Metrics, NoopScope, ProfileScope,
    TracingScope,
};
use tracing::info;

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => fmt.json().init(),
        LogFormat::Pretty => fmt.init(),
    }
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::parse();
    init_tracing(cfg.log_format);

    validate_bind(&cfg.bind)?;
    let workloads = cfg.workloads();
    validate_workloads(&workloads)?;
    let profiler = cfg.profiler(profiling::local_hostname())?;
    info!(
        app = %profiler.application_name,
        server = %profiler.server_address,
        profile_types = ?profiler.profile_types,
        tags = %profiler.tags,
        "profiler configured"
    );
    let scope: Arc<dyn ProfileScope> = if cfg.no_profiling {
        Arc::new(NoopScope)
    } else {
        Arc::new(TracingScope::new(&profiler))
    };

    let metrics = Metrics::new().context("metrics init")?;
    let state = AppState::new(metrics, scope, workloads);
    info!(bind = %cfg.bind, "starting server");
    serve(&cfg.bind, state).await?;
    Ok(())
}
