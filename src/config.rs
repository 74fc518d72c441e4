#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use anyhow::{Context, Result as AnyResult};
use clap::{Parser, ValueEnum};

use crate::domain::WorkloadConfig;
use crate::profiling::{Labels, ProfileType, ProfilerConfig};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Demo server producing CPU, memory, disk and network load for a profiler.
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "LOAD_DEMO_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Application name reported to the profiler
    #[arg(long, env = "LOAD_DEMO_APP_NAME", default_value = "load-demo-server")]
    pub app_name: String,

    /// Profiler collector address
    #[arg(
        long,
        env = "LOAD_DEMO_PROFILER_SERVER",
        default_value = "http://pyroscope-server:4040"
    )]
    pub profiler_server: String,

    /// Profile type to enable; repeat for several. All of them when omitted
    #[arg(long = "profile-type", value_name = "TYPE")]
    pub profile_types: Vec<String>,

    /// Extra global profiler tag as key=value; repeatable
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,

    /// Host dialed by /network
    #[arg(long, env = "LOAD_DEMO_NETWORK_HOST", default_value = "example.org")]
    pub network_host: String,

    /// Port dialed by /network
    #[arg(long, env = "LOAD_DEMO_NETWORK_PORT", default_value_t = 80)]
    pub network_port: u16,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Don't open labeled profiling scopes
    #[arg(long)]
    pub no_profiling: bool,
}

impl Config {
    pub fn workloads(&self) -> WorkloadConfig {
        let mut w = WorkloadConfig::default();
        w.network.host.clone_from(&self.network_host);
        w.network.port = self.network_port;
        w
    }

    /// Builds the profiler configuration, adding `hostname` to the global tags.
    pub fn profiler(&self, hostname: Option<String>) -> AnyResult<ProfilerConfig> {
        let mut tags = Labels::default();
        for raw in &self.tags {
            let (k, v) = parse_tag(raw)?;
            tags = tags.with(k, v);
        }
        let profile_types = if self.profile_types.is_empty() {
            ProfileType::ALL.to_vec()
        } else {
            self.profile_types
                .iter()
                .map(|s| s.parse::<ProfileType>())
                .collect::<AnyResult<Vec<_>>>()
                .context("parse --profile-type")?
        };
        Ok(ProfilerConfig {
            application_name: self.app_name.clone(),
            server_address: self.profiler_server.clone(),
            profile_types,
            tags,
        }
        .with_hostname(hostname))
    }
}

pub fn parse_tag(raw: &str) -> AnyResult<(&str, &str)> {
    let (k, v) = raw
        .split_once('=')
        .with_context(|| format!("tag {raw:?} is not key=value"))?;
    let k = k.trim();
    if k.is_empty() {
        anyhow::bail!("tag {raw:?} has an empty key");
    }
    Ok((k, v.trim()))
}
