#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod domain;
pub mod http;
pub mod lib_cpu;
pub mod lib_disk;
pub mod lib_mem;
pub mod lib_net;
pub mod metrics;
pub mod profiling;
pub mod service;
pub mod validation;

pub use config::Config;
pub use domain::{AppState, HandlerKind, RetentionList, WorkloadConfig};
pub use http::{routes, serve};
pub use http::{disk, fast, healthz, memory, network, scrape_metrics, slow};
pub use metrics::Metrics;
pub use profiling::{NoopScope, ProfileScope, TracingScope};
pub use service::{HandlerError, LoadRunner};
pub use validation::validate_workloads;
