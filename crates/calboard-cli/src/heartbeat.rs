//! Liveness logging, independent of the sync loop.
//!
//! Every beat logs at `info`. When a check address is configured the beat
//! also attempts a TCP connect to it, and a run of failed checks is
//! reported as lost connectivity.

use std::time::{Duration, Instant};

use calboard_core::config::HeartbeatConfig;
use tokio::net::TcpStream;
use tracing::{info, warn};

/// Open and immediately drop a TCP connection to `addr`.
pub async fn check_connectivity(addr: &str, timeout: Duration) -> std::io::Result<Duration> {
    let started = Instant::now();
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => Ok(started.elapsed()),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "connectivity check timed out",
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Up,
    Degraded(u32),
    Down(u32),
}

/// Consecutive-failure counter.
#[derive(Debug)]
pub struct Tracker {
    failures: u32,
    max_failures: u32,
}

impl Tracker {
    pub fn new(max_failures: u32) -> Self {
        Self {
            failures: 0,
            max_failures: max_failures.max(1),
        }
    }

    pub fn record(&mut self, ok: bool) -> Link {
        if ok {
            self.failures = 0;
            return Link::Up;
        }
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.max_failures {
            Link::Down(self.failures)
        } else {
            Link::Degraded(self.failures)
        }
    }
}

/// Beat forever. Intended to be spawned and aborted on shutdown.
pub async fn run(config: HeartbeatConfig) {
    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));
    let timeout = Duration::from_millis(config.check_timeout_ms);
    let mut tracker = Tracker::new(config.max_failures);
    let mut beats: u64 = 0;

    loop {
        ticker.tick().await;
        beats += 1;

        let Some(addr) = config.check_addr.as_deref() else {
            info!(beats, "heartbeat");
            continue;
        };

        match check_connectivity(addr, timeout).await {
            Ok(latency) => {
                tracker.record(true);
                info!(beats, target = addr, latency_ms = latency.as_millis() as u64, "heartbeat");
            }
            Err(e) => match tracker.record(false) {
                Link::Down(failures) => {
                    warn!(beats, target = addr, failures, error = %e, "connectivity lost")
                }
                _ => info!(beats, target = addr, error = %e, "connectivity check failed"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_goes_down_after_max_failures_and_recovers() {
        let mut tracker = Tracker::new(3);
        assert_eq!(tracker.record(false), Link::Degraded(1));
        assert_eq!(tracker.record(false), Link::Degraded(2));
        assert_eq!(tracker.record(false), Link::Down(3));
        assert_eq!(tracker.record(false), Link::Down(4));
        assert_eq!(tracker.record(true), Link::Up);
        assert_eq!(tracker.record(false), Link::Degraded(1));
    }

    #[tokio::test]
    async fn connectivity_check_reaches_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        assert!(check_connectivity(&addr, Duration::from_secs(2)).await.is_ok());
    }

    #[tokio::test]
    async fn connectivity_check_fails_on_closed_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(check_connectivity(&addr, Duration::from_secs(2)).await.is_err());
    }
}
