//! Keep-alive ticker
//!
//! Runs on its own thread and sends a `GCS` packet with code 0 every
//! keep-alive period so the arm controller can detect link loss. The loop
//! polls a monotonic clock and sleeps for one poll interval between checks,
//! so keep-alives go out up to one poll interval late.
//!
//! A failed send stops the ticker for good; there is no retry. The
//! dispatcher keeps running and is not told.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use super::ShutdownFlag;
use crate::link::protocol::ControlPacket;
use crate::link::Link;

/// What the ticker did before it stopped
#[derive(Debug)]
pub struct KeepAliveReport {
    /// Keep-alive packets successfully sent
    pub sent: u64,
    /// The send failure that stopped the ticker, if any
    pub error: Option<io::Error>,
}

#[derive(Debug, Clone, Copy)]
pub struct KeepAlive {
    period: Duration,
    poll_interval: Duration,
}

impl KeepAlive {
    pub fn new(period: Duration, poll_interval: Duration) -> Self {
        Self {
            period,
            poll_interval,
        }
    }

    /// Run until `shutdown` is requested or a send fails
    pub fn run(&self, link: &Link, shutdown: &ShutdownFlag) -> KeepAliveReport {
        info!(
            "Keep-alive ticker started (period {:?}, poll {:?})",
            self.period, self.poll_interval
        );

        let mut report = KeepAliveReport {
            sent: 0,
            error: None,
        };
        let mut last = Instant::now();

        while !shutdown.is_requested() {
            let elapsed = last.elapsed();
            if elapsed < self.period {
                thread::sleep(self.poll_interval);
                continue;
            }

            if let Err(e) = link.send(&ControlPacket::keep_alive()) {
                error!("Keep-alive send to {} failed: {}", link.destination(), e);
                report.error = Some(e);
                break;
            }
            report.sent += 1;
            debug!(
                "Keep-alive #{} after {:.3}s",
                report.sent,
                elapsed.as_secs_f64()
            );

            last = Instant::now();
        }

        info!("Keep-alive ticker stopped after {} packet(s)", report.sent);
        report
    }
}
