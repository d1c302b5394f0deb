//! Session Driver.
//!
//! Owns the parsing mode, the lines collected since the last prompt and the
//! pending-command slot. Output chunks go in, [`ShellEvent`]s come out, and
//! answers are delivered to the waiter registered for them.
//!
//! The mode changes in exactly two places: [`SessionDriver::begin_command`]
//! sets it when a command goes out, and answer completion resets it to
//! [`ParsingMode::Waiting`].
//!
//! A notice that arrives while nothing is in flight stays open until a line
//! that cannot belong to it, since its position lines may come in a later
//! read. [`SessionDriver::flush_idle`] closes it from outside.

use log::{debug, info, trace, warn};
use serde::Serialize;
use tokio::sync::oneshot;

use super::line_buffer::LineBuffer;
use super::pending::{AnswerResult, PendingCommands};
use crate::error::{BridgeError, BridgeResult};
use crate::protocol::{
    ClassifiedLine, Interrupt, LineKind, OutOfBandPosition, ParsingMode, classify_after, merge,
};

/// Something the shell did that no command asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ShellEvent {
    /// The startup banner finished; commands may be sent
    Ready,
    /// Unsolicited run-state change, e.g. a breakpoint hit
    Interrupt(Interrupt),
    /// Text that is neither an answer nor a notice
    Output(String),
    Stderr(String),
    /// Standard output closed
    Exited,
}

#[derive(Debug)]
pub struct SessionDriver {
    mode: ParsingMode,
    stdout: LineBuffer,
    stderr: LineBuffer,
    lines: Vec<ClassifiedLine>,
    pending: PendingCommands,
    idle_interrupt: Option<Interrupt>,
    /// Events closed outside a feed, delivered with the next one
    backlog: Vec<ShellEvent>,
    last_position: Option<OutOfBandPosition>,
    exited: bool,
}

impl Default for SessionDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionDriver {
    /// A driver for a freshly spawned shell, which starts with its banner.
    pub fn new() -> Self {
        Self::with_mode(ParsingMode::Banner)
    }

    /// A driver attached to a shell that is already at its prompt.
    pub fn ready() -> Self {
        Self::with_mode(ParsingMode::Waiting)
    }

    fn with_mode(mode: ParsingMode) -> Self {
        Self {
            mode,
            stdout: LineBuffer::new(),
            stderr: LineBuffer::new(),
            lines: Vec::new(),
            pending: PendingCommands::new(),
            idle_interrupt: None,
            backlog: Vec::new(),
            last_position: None,
            exited: false,
        }
    }

    pub fn mode(&self) -> ParsingMode {
        self.mode
    }

    /// The banner is over and the shell accepts commands.
    pub fn is_ready(&self) -> bool {
        self.mode != ParsingMode::Banner && !self.exited
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_busy()
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }

    /// An unsolicited notice is open or waiting to be published.
    pub fn holds_idle_notice(&self) -> bool {
        self.idle_interrupt.is_some() || !self.backlog.is_empty()
    }

    /// Command text of the answer in flight.
    pub fn pending_command(&self) -> Option<&str> {
        self.pending.pending_command()
    }

    /// Register `command` and switch to the mode its answer is read in.
    pub(crate) fn begin_command(
        &mut self,
        mode: ParsingMode,
        command: &str,
        suppress_failure: bool,
    ) -> BridgeResult<oneshot::Receiver<AnswerResult>> {
        if self.exited {
            return Err(BridgeError::ShellExited);
        }
        if self.mode == ParsingMode::Banner {
            return Err(BridgeError::NotReady);
        }
        let rx = self.pending.register(mode, command, suppress_failure)?;
        if let Some(event) = self.take_idle_interrupt() {
            self.backlog.push(event);
        }
        self.mode = mode;
        self.lines.clear();
        Ok(rx)
    }

    /// Undo [`Self::begin_command`] after the command could not be written.
    pub(crate) fn abort_command(&mut self) {
        if let Some(pending) = self.pending.remove() {
            debug!(
                target: "xsdb_bridge::driver",
                "Withdrawing '{}' before it reached the shell",
                pending.command()
            );
        }
        self.mode = ParsingMode::Waiting;
        self.lines.clear();
    }

    /// Reject the command in flight, e.g. when its line could not be written.
    pub(crate) fn fail_command(&mut self, error: BridgeError) {
        if let Some(pending) = self.pending.remove() {
            warn!(
                target: "xsdb_bridge::driver",
                "Failing '{}': {}",
                pending.command(),
                error
            );
            pending.reject(error);
            self.mode = ParsingMode::Waiting;
            self.lines.clear();
        }
    }

    /// Feed a chunk of standard output.
    pub fn feed_stdout(&mut self, chunk: &[u8]) -> Vec<ShellEvent> {
        let mut events = std::mem::take(&mut self.backlog);
        for line in self.stdout.push_bytes(chunk) {
            self.handle_line(&line, &mut events);
        }
        events
    }

    /// Publish the open idle notice without waiting for more of it.
    pub fn flush_idle(&mut self) -> Vec<ShellEvent> {
        let mut events = std::mem::take(&mut self.backlog);
        events.extend(self.take_idle_interrupt());
        events
    }

    /// Feed a chunk of standard error. Every complete line becomes an event.
    pub fn feed_stderr(&mut self, chunk: &[u8]) -> Vec<ShellEvent> {
        self.stderr
            .push_bytes(chunk)
            .into_iter()
            .map(|line| {
                warn!(target: "xsdb_bridge::shell", "stderr: {}", line);
                ShellEvent::Stderr(line)
            })
            .collect()
    }

    /// Standard output closed: drain buffers and fail the waiter.
    pub fn finish(&mut self) -> Vec<ShellEvent> {
        if self.exited {
            return Vec::new();
        }
        let mut events = std::mem::take(&mut self.backlog);
        if let Some(line) = self.stdout.flush() {
            self.handle_line(&line, &mut events);
        }
        if let Some(line) = self.stderr.flush() {
            events.push(ShellEvent::Stderr(line));
        }
        events.extend(self.take_idle_interrupt());

        let failed = self.pending.fail_all(|| BridgeError::ShellExited);
        if failed > 0 {
            warn!(
                target: "xsdb_bridge::driver",
                "Shell exited with {} command(s) awaiting an answer",
                failed
            );
        }
        self.lines.clear();
        self.last_position = None;
        self.mode = ParsingMode::Waiting;
        self.exited = true;
        events.push(ShellEvent::Exited);
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<ShellEvent>) {
        let classified = classify_after(line, self.mode, self.last_position.as_ref());
        self.last_position = classified.numbered_position().cloned();
        trace!(
            target: "xsdb_bridge::driver",
            "[{}] {:?} <- {:?}",
            self.mode,
            classified.kind,
            line
        );

        if self.mode == ParsingMode::Waiting && !self.pending.is_busy() {
            self.handle_idle(line, classified, events);
            return;
        }
        if self.mode == ParsingMode::Banner && !classified.is_prompt() {
            events.push(ShellEvent::Output(line.to_string()));
        }

        let at_prompt = classified.is_prompt();
        self.lines.push(classified);
        if at_prompt {
            self.complete_answer(events);
        }
    }

    fn complete_answer(&mut self, events: &mut Vec<ShellEvent>) {
        let answer = merge(&self.lines, self.mode);
        if !answer.complete {
            debug!(
                target: "xsdb_bridge::driver",
                "Answer for {} not complete yet, keep reading",
                self.mode
            );
            return;
        }
        self.lines.clear();
        let driving = std::mem::replace(&mut self.mode, ParsingMode::Waiting);

        if driving == ParsingMode::Banner {
            debug!(target: "xsdb_bridge::driver", "Banner finished, shell ready");
            events.push(ShellEvent::Ready);
            return;
        }

        match self.pending.take_for(driving) {
            Some(pending) => {
                debug!(
                    target: "xsdb_bridge::driver",
                    "Answer for '{}' complete as {}",
                    pending.command(),
                    answer.mode
                );
                if !pending.settle(answer) {
                    debug!(target: "xsdb_bridge::driver", "Waiter went away before its answer");
                }
            }
            None => match answer.interrupt {
                Some(interrupt) => events.push(ShellEvent::Interrupt(interrupt)),
                None => debug!(
                    target: "xsdb_bridge::driver",
                    "Dropping {} answer nobody waited for",
                    answer.mode
                ),
            },
        }
    }

    /// Lines that arrive while nothing is in flight.
    fn handle_idle(&mut self, line: &str, classified: ClassifiedLine, events: &mut Vec<ShellEvent>) {
        match classified.kind {
            LineKind::Prompt => events.extend(self.take_idle_interrupt()),
            LineKind::OutOfBand(record) => {
                events.extend(self.take_idle_interrupt());
                self.idle_interrupt = Some(Interrupt::from_record(record));
            }
            LineKind::Position(position) => match self.idle_interrupt.as_mut() {
                Some(interrupt) => interrupt.append_position(position),
                None => stray_output(line, events),
            },
            LineKind::Facts(facts) if facts.is_empty() => {}
            _ => {
                events.extend(self.take_idle_interrupt());
                stray_output(line, events);
            }
        }
    }

    fn take_idle_interrupt(&mut self) -> Option<ShellEvent> {
        let interrupt = self.idle_interrupt.take()?;
        debug!(
            target: "xsdb_bridge::driver",
            "Unsolicited interrupt from {} (target {}): {:?}",
            interrupt.core,
            interrupt.target,
            interrupt.kind()
        );
        Some(ShellEvent::Interrupt(interrupt))
    }
}

fn stray_output(line: &str, events: &mut Vec<ShellEvent>) {
    info!(target: "xsdb_bridge::shell", "{}", line);
    events.push(ShellEvent::Output(line.to_string()));
}
