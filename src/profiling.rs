#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

//! Labeled request scopes for an external profiler.
//!
//! Handlers never talk to a collector. The dispatch layer opens a scope per
//! request through whatever [`ProfileScope`] it was given, and the scope is
//! closed when the returned [`ScopeGuard`] drops.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Result as AnyResult};
use serde::Serialize;
use tracing::debug;

use crate::domain::HandlerKind;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    #[must_use]
    pub fn for_handler(kind: HandlerKind) -> Self {
        Self::default().with("handler", kind.label())
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Request labels layered over `base`; request labels win on conflict.
    #[must_use]
    pub fn merged_over(&self, base: &Labels) -> Labels {
        let mut out = base.clone();
        for (k, v) in &self.0 {
            out.0.insert(k.clone(), v.clone());
        }
        out
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

pub trait ProfileScope: Send + Sync {
    fn start(&self, labels: &Labels);
    fn stop(&self, labels: &Labels);
}

/// Closes its scope exactly once, on drop.
pub struct ScopeGuard {
    scope: Arc<dyn ProfileScope>,
    labels: Labels,
}

impl ScopeGuard {
    #[must_use]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.scope.stop(&self.labels);
    }
}

pub fn enter(scope: &Arc<dyn ProfileScope>, labels: Labels) -> ScopeGuard {
    scope.start(&labels);
    ScopeGuard {
        scope: Arc::clone(scope),
        labels,
    }
}

pub struct NoopScope;

impl ProfileScope for NoopScope {
    fn start(&self, _labels: &Labels) {}
    fn stop(&self, _labels: &Labels) {}
}

/// Emits scope boundaries as tracing events, tagged with the profiler's
/// application name and global tags.
pub struct TracingScope {
    app_name: String,
    tags: Labels,
}

impl TracingScope {
    #[must_use]
    pub fn new(cfg: &ProfilerConfig) -> Self {
        Self {
            app_name: cfg.application_name.clone(),
            tags: cfg.tags.clone(),
        }
    }
}

impl ProfileScope for TracingScope {
    fn start(&self, labels: &Labels) {
        debug!(app = %self.app_name, labels = %labels.merged_over(&self.tags), "profile scope start");
    }

    fn stop(&self, labels: &Labels) {
        debug!(app = %self.app_name, labels = %labels.merged_over(&self.tags), "profile scope stop");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileType {
    Cpu,
    AllocObjects,
    AllocSpace,
    InuseObjects,
    InuseSpace,
}

impl ProfileType {
    pub const ALL: [ProfileType; 5] = [
        ProfileType::Cpu,
        ProfileType::AllocObjects,
        ProfileType::AllocSpace,
        ProfileType::InuseObjects,
        ProfileType::InuseSpace,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileType::Cpu => "cpu",
            ProfileType::AllocObjects => "alloc_objects",
            ProfileType::AllocSpace => "alloc_space",
            ProfileType::InuseObjects => "inuse_objects",
            ProfileType::InuseSpace => "inuse_space",
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileType {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> AnyResult<Self> {
        match ProfileType::ALL.iter().find(|t| t.as_str() == s) {
            Some(t) => Ok(*t),
            None => bail!(format!("unknown profile type: {s}")),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ProfilerConfig {
    pub application_name: String,
    pub server_address: String,
    pub profile_types: Vec<ProfileType>,
    pub tags: Labels,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            application_name: "load-demo-server".to_string(),
            server_address: "http://pyroscope-server:4040".to_string(),
            profile_types: ProfileType::ALL.to_vec(),
            tags: Labels::default(),
        }
    }
}

impl ProfilerConfig {
    /// Adds the `hostname` tag unless one was given explicitly.
    #[must_use]
    pub fn with_hostname(mut self, hostname: Option<String>) -> Self {
        if self.tags.get("hostname").is_none() {
            if let Some(h) = hostname {
                self.tags = self.tags.with("hostname", h);
            }
        }
        self
    }
}

#[must_use]
pub fn local_hostname() -> Option<String> {
    sysinfo::System::host_name()
}
