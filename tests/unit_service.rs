#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use load_demo_server::domain::DiskPlan;
use load_demo_server::profiling::{Labels, ProfileScope};
use load_demo_server::{AppState, HandlerKind, LoadRunner, Metrics, WorkloadConfig};
use parking_lot::Mutex;

#[derive(Default)]
struct Timeline {
    events: Mutex<Vec<(&'static str, String, Instant)>>,
}

impl Timeline {
    fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|(name, _, _)| *name).collect()
    }
}

impl ProfileScope for Timeline {
    fn start(&self, labels: &Labels) {
        let h = labels.get("handler").unwrap_or_default().to_string();
        self.events.lock().push(("start", h, Instant::now()));
    }
    fn stop(&self, labels: &Labels) {
        let h = labels.get("handler").unwrap_or_default().to_string();
        self.events.lock().push(("stop", h, Instant::now()));
    }
}

fn slow_disk(dir: &std::path::Path) -> WorkloadConfig {
    WorkloadConfig {
        disk: DiskPlan {
            dir: Some(dir.to_path_buf()),
            chunk_bytes: 4096,
            chunks: 8,
            read_pause: Duration::from_millis(50),
        },
        ..WorkloadConfig::default()
    }
}

#[tokio::test]
async fn scope_stays_open_until_detached_work_ends() {
    let dir = tempfile::tempdir().unwrap();
    let timeline = Arc::new(Timeline::default());
    let state = AppState::new(Metrics::new().expect("metrics"), timeline.clone(), slow_disk(dir.path()));
    let metrics = state.metrics.clone();
    let runner = LoadRunner::new(state);

    let requested = Instant::now();
    let dropped = tokio::time::timeout(Duration::from_millis(100), runner.run(HandlerKind::Disk)).await;
    assert!(dropped.is_err(), "request should still be running");

    // The client is gone but eight paced reads (>= 400ms) are still in progress.
    assert_eq!(timeline.names(), vec!["start"]);
    assert_eq!(metrics.in_flight.with_label_values(&["disk"]).get(), 1);

    let deadline = Instant::now() + Duration::from_secs(10);
    while timeline.names().len() < 2 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let events = timeline.events.lock().clone();
    assert_eq!(events.len(), 2, "scope never closed");
    assert_eq!((events[0].0, events[0].1.as_str()), ("start", "disk"));
    assert_eq!((events[1].0, events[1].1.as_str()), ("stop", "disk"));
    assert!(events[1].2.duration_since(requested) >= Duration::from_millis(400));
    assert_eq!(metrics.in_flight.with_label_values(&["disk"]).get(), 0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn scope_closes_after_completed_request() {
    let dir = tempfile::tempdir().unwrap();
    let timeline = Arc::new(Timeline::default());
    let mut workloads = slow_disk(dir.path());
    workloads.fast_iterations = 1_000;
    let state = AppState::new(Metrics::new().expect("metrics"), timeline.clone(), workloads);
    let runner = LoadRunner::new(state);

    let body = runner.run(HandlerKind::Fast).await.expect("fast");
    assert_eq!(body, "Fast request handled!\n");
    assert_eq!(timeline.names(), vec!["start", "stop"]);
}
