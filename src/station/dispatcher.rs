//! Operator command dispatcher
//!
//! Reads integer codes from the operator and sends one `GCS` packet per
//! code. A negative code (or end of input) requests shutdown and sends the
//! termination burst.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use super::ShutdownFlag;
use crate::link::protocol::{ControlPacket, TERMINATION_REPEATS};
use crate::link::Link;

/// What the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Send this code to the controller
    Code(i32),
    /// Shut the link down
    Terminate,
}

impl From<i32> for Command {
    fn from(code: i32) -> Self {
        if code < 0 {
            Command::Terminate
        } else {
            Command::Code(code)
        }
    }
}

/// Blocking source of operator commands, one per call
pub trait CommandSource {
    fn next_command(&mut self) -> anyhow::Result<Command>;
}

/// Line-oriented command source: prompts on `prompt`, reads from `input`
///
/// Each line may hold several whitespace-separated codes; they are handed
/// out one per call and the prompt is only repeated once the line is used
/// up. Tokens that are not a 32-bit integer, and whole lines that are not
/// UTF-8, are rejected with a warning. End of input counts as a termination
/// request.
pub struct LineSource<R, W> {
    input: R,
    prompt: W,
    line: Vec<u8>,
    pending: VecDeque<Command>,
}

impl<R: BufRead, W: Write> LineSource<R, W> {
    pub fn new(input: R, prompt: W) -> Self {
        Self {
            input,
            prompt,
            line: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn queue_line(&mut self) {
        let text = match std::str::from_utf8(&self.line) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Ignoring line that is not valid UTF-8 [{}]: {}",
                    hex::encode(&self.line),
                    e
                );
                return;
            }
        };

        for token in text.split_whitespace() {
            match token.parse::<i32>() {
                Ok(code) => self.pending.push_back(Command::from(code)),
                Err(e) => warn!("Ignoring invalid code {:?}: {}", token, e),
            }
        }
    }
}

impl LineSource<io::StdinLock<'static>, io::Stdout> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> CommandSource for LineSource<R, W> {
    fn next_command(&mut self) -> anyhow::Result<Command> {
        loop {
            if let Some(command) = self.pending.pop_front() {
                return Ok(command);
            }

            write!(self.prompt, "Code: ")?;
            self.prompt.flush()?;

            self.line.clear();
            if self.input.read_until(b'\n', &mut self.line)? == 0 {
                info!("End of operator input");
                return Ok(Command::Terminate);
            }

            self.queue_line();
        }
    }
}

/// Packets the dispatcher handed to the link
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    termination_spacing: Duration,
}

impl Dispatcher {
    pub fn new(termination_spacing: Duration) -> Self {
        Self {
            termination_spacing,
        }
    }

    /// Read and send commands until the operator terminates
    ///
    /// Send failures are logged and the loop carries on. An input error
    /// ends the session like a negative code does (shutdown requested,
    /// termination burst sent) and is then returned.
    pub fn run(
        &self,
        source: &mut dyn CommandSource,
        link: &Link,
        shutdown: &ShutdownFlag,
    ) -> anyhow::Result<DispatchSummary> {
        let mut summary = DispatchSummary::default();

        loop {
            let command = match source.next_command() {
                Ok(command) => command,
                Err(e) => {
                    error!("Could not read operator input: {:#}", e);
                    shutdown.request();
                    self.terminate(link, &mut summary);
                    return Err(e.context("could not read operator input"));
                }
            };

            match command {
                Command::Code(code) => {
                    self.send(link, ControlPacket::command(code), &mut summary);
                }
                Command::Terminate => {
                    shutdown.request();
                    self.terminate(link, &mut summary);
                    return Ok(summary);
                }
            }
        }
    }

    /// Termination burst: sent every time regardless of individual failures
    fn terminate(&self, link: &Link, summary: &mut DispatchSummary) {
        info!(
            "Sending termination code ({} times, {:?} apart)...",
            TERMINATION_REPEATS, self.termination_spacing
        );
        for _ in 0..TERMINATION_REPEATS {
            self.send(link, ControlPacket::terminate(), summary);
            thread::sleep(self.termination_spacing);
        }
    }

    fn send(&self, link: &Link, packet: ControlPacket, summary: &mut DispatchSummary) {
        match link.send(&packet) {
            Ok(()) => summary.sent += 1,
            Err(e) => {
                error!("Failed to send {} to {}: {}", packet, link.destination(), e);
                summary.failed += 1;
            }
        }
    }
}
