#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use std::future::Future;
use std::io;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::domain::NetworkPlan;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Network dial error")]
    Dial(#[source] io::Error),
    #[error("Network dial error")]
    DialTimeout(Duration),
}

/// Why the read loop stopped. All three count as a finished call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadEnd {
    Eof,
    Timeout,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkReport {
    pub bytes_read: usize,
    pub reads: usize,
    pub ended_by: ReadEnd,
    pub elapsed: Duration,
}

#[must_use]
pub fn request_for(host: &str) -> String {
    format!("GET / HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n")
}

/// Dials `plan.host:plan.port`, sends a bare GET and drains the reply slowly:
/// every read gets a fresh `read_timeout` deadline and is followed by a
/// `read_pause` sleep. Only the dial can fail; anything after it ends the loop.
pub async fn round_trip(plan: &NetworkPlan) -> Result<NetworkReport, NetworkError> {
    round_trip_via(plan, |host, port| async move {
        TcpStream::connect((host.as_str(), port)).await
    })
    .await
}

/// [`round_trip`] with the dial supplied by the caller. `connect` gets the
/// plan's host and port and is bounded by `plan.connect_timeout`.
pub async fn round_trip_via<C, F>(plan: &NetworkPlan, connect: C) -> Result<NetworkReport, NetworkError>
where
    C: FnOnce(String, u16) -> F,
    F: Future<Output = io::Result<TcpStream>>,
{
    let start = Instant::now();
    let mut stream = match timeout(plan.connect_timeout, connect(plan.host.clone(), plan.port)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(NetworkError::Dial(e)),
        Err(_) => return Err(NetworkError::DialTimeout(plan.connect_timeout)),
    };
    debug!(host = %plan.host, port = plan.port, "connected");

    if let Err(e) = stream.write_all(request_for(&plan.host).as_bytes()).await {
        warn!(error = %e, "request write failed");
    }

    let mut buf = vec![0u8; plan.buf_bytes.max(1)];
    let mut bytes_read = 0;
    let mut reads = 0;
    let ended_by = loop {
        match timeout(plan.read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => break ReadEnd::Eof,
            Ok(Ok(n)) => {
                bytes_read += n;
                reads += 1;
                sleep(plan.read_pause).await;
            }
            Ok(Err(e)) => {
                debug!(error = %e, "read failed");
                break ReadEnd::Error;
            }
            Err(_) => break ReadEnd::Timeout,
        }
    };

    Ok(NetworkReport {
        bytes_read,
        reads,
        ended_by,
        elapsed: start.elapsed(),
    })
}
