pub mod dispatcher;
pub mod keepalive;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use tracing::{error, info};

use crate::config::StationConfig;
use crate::link::Link;
use dispatcher::{CommandSource, DispatchSummary, Dispatcher};
use keepalive::KeepAlive;

/// One-way shutdown signal shared by the dispatcher and the ticker
///
/// Set once by the dispatcher, never cleared.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Run the station until the operator terminates
///
/// Starts the keep-alive ticker, gives it the startup grace period, runs the
/// dispatcher on the calling thread, then waits for the ticker to exit before
/// the link is closed.
pub fn run(
    link: Link,
    config: &StationConfig,
    source: &mut dyn CommandSource,
) -> anyhow::Result<DispatchSummary> {
    let link = Arc::new(link);
    let shutdown = ShutdownFlag::new();

    let ticker = {
        let link = link.clone();
        let shutdown = shutdown.clone();
        let keep_alive = KeepAlive::new(config.keep_alive_period(), config.poll_interval());
        thread::Builder::new()
            .name("keep-alive".to_string())
            .spawn(move || keep_alive.run(&link, &shutdown))
            .context("could not create keep alive thread")?
    };

    thread::sleep(config.startup_grace());

    let dispatcher = Dispatcher::new(config.termination_spacing());
    let outcome = dispatcher.run(source, &link, &shutdown);

    match ticker.join() {
        Ok(report) => {
            if let Some(e) = report.error {
                error!(
                    "Keep-alives stopped early after {} packet(s): {}",
                    report.sent, e
                );
            }
        }
        Err(_) => error!("Keep-alive thread panicked"),
    }

    drop(link);
    info!("Link closed");

    let summary = outcome?;
    info!(
        "Dispatched {} packet(s), {} failed",
        summary.sent, summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::dispatcher::Command;
    use super::*;
    use crate::link::test_support::{link_to, Receiver};
    use std::time::Duration;

    /// Holds each command back for `delay` to emulate a slow operator
    struct Paced {
        commands: Vec<Command>,
        delay: Duration,
    }

    impl CommandSource for Paced {
        fn next_command(&mut self) -> anyhow::Result<Command> {
            thread::sleep(self.delay);
            if self.commands.is_empty() {
                return Ok(Command::Terminate);
            }
            Ok(self.commands.remove(0))
        }
    }

    #[test]
    fn test_shutdown_flag() {
        let flag = ShutdownFlag::new();
        let seen_by_other = flag.clone();
        assert!(!seen_by_other.is_requested());

        flag.request();
        assert!(seen_by_other.is_requested());

        flag.request();
        assert!(flag.is_requested());
    }

    #[test]
    fn test_shutdown_flag_crosses_threads() {
        let flag = ShutdownFlag::new();
        let waiter = {
            let flag = flag.clone();
            thread::spawn(move || {
                while !flag.is_requested() {
                    thread::sleep(Duration::from_millis(1));
                }
            })
        };
        flag.request();
        waiter.join().unwrap();
    }

    #[test]
    fn test_full_session() {
        let receiver = Receiver::spawn();
        let link = link_to(receiver.addr);
        let config = StationConfig::default();

        let mut source = Paced {
            commands: vec![Command::Code(5), Command::Code(7)],
            delay: Duration::from_millis(400),
        };
        let summary = run(link, &config, &mut source).unwrap();
        assert_eq!(summary.sent, 5);

        // Nothing arrives once the burst is over
        let seen = receiver.drain(Duration::from_millis(700));

        let operator: Vec<i32> = seen.iter().map(|p| p.code).filter(|&c| c != 0).collect();
        assert_eq!(operator, vec![5, 7, -1, -1, -1]);

        let keep_alives = seen.iter().filter(|p| p.code == 0).count();
        assert!(keep_alives >= 2, "expected keep-alives, got {}", keep_alives);

        assert!(seen.iter().all(|p| &p.header == b"GCS"));

        // A keep-alive that passed its flag check just before shutdown may
        // still land right after the first termination packet, but none
        // follow it by more than a poll interval plus scheduling slack.
        let first_terminate = seen.iter().find(|p| p.code == -1).unwrap().at;
        let late: Vec<_> = seen
            .iter()
            .filter(|p| p.code == 0 && p.at > first_terminate)
            .collect();
        assert!(late.len() <= 1, "{} keep-alives after shutdown", late.len());
        for packet in late {
            assert!(packet.at.duration_since(first_terminate) < Duration::from_millis(50));
        }
    }

    #[test]
    fn test_input_error_still_terminates_and_joins_ticker() {
        struct Failing;

        impl CommandSource for Failing {
            fn next_command(&mut self) -> anyhow::Result<Command> {
                Err(anyhow::anyhow!("stdin closed abruptly"))
            }
        }

        let receiver = Receiver::spawn();
        let link = link_to(receiver.addr);

        let result = run(link, &StationConfig::default(), &mut Failing);
        assert!(result.is_err());

        let codes: Vec<i32> = receiver
            .drain(Duration::from_millis(50))
            .iter()
            .map(|p| p.code)
            .collect();
        assert_eq!(codes, vec![-1, -1, -1]);
    }
}
