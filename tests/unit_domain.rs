#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use std::str::FromStr;
use std::time::Duration;

use load_demo_server::domain::{HandlerKind, WorkloadConfig, MIB};

#[test]
fn labels_round_trip() {
    for kind in HandlerKind::ALL {
        assert_eq!(HandlerKind::from_str(kind.label()).expect("known"), kind);
        assert_eq!(kind.to_string(), kind.label());
    }
}

#[test]
fn unknown_label_rejected() {
    assert!(HandlerKind::from_str("cpu").is_err());
    assert!(HandlerKind::from_str("Slow").is_err());
}

#[test]
fn defaults_match_production_shape() {
    let w = WorkloadConfig::default();
    assert_eq!(w.iterations(HandlerKind::Slow), 20_000_000);
    assert_eq!(w.iterations(HandlerKind::Fast), 5_000_000);
    assert_eq!(w.memory_block_bytes, 100 * MIB);
    assert_eq!(w.page_stride, 4096);
    assert_eq!(w.disk.chunk_bytes, MIB);
    assert_eq!(w.disk.chunks, 100);
    assert_eq!(w.disk.read_pause, Duration::from_millis(10));
    assert!(w.disk.dir.is_none());
    assert_eq!(w.network.host, "example.org");
    assert_eq!(w.network.port, 80);
    assert_eq!(w.network.connect_timeout, Duration::from_secs(5));
    assert_eq!(w.network.read_timeout, Duration::from_millis(300));
    assert_eq!(w.network.read_pause, Duration::from_millis(200));
}
