//! Registry of the command awaiting its answer.
//!
//! The shell runs one command at a time, so the registry holds a single
//! slot. Registering while the slot is taken fails with
//! [`BridgeError::ChannelBusy`] instead of replacing the earlier waiter.
//!
//! Registration happens before the command text is written so the answer
//! can always be routed when its prompt arrives.

use log::warn;
use tokio::sync::oneshot;

use crate::error::{BridgeError, BridgeResult, CommandError};
use crate::protocol::{Answer, ParsingMode};

/// What a caller of `send` eventually receives.
pub type AnswerResult = BridgeResult<Answer>;

/// A sent command and the waiter for its answer.
#[derive(Debug)]
pub struct PendingCommand {
    mode: ParsingMode,
    command: String,
    suppress_failure: bool,
    responder: oneshot::Sender<AnswerResult>,
}

impl PendingCommand {
    pub fn mode(&self) -> ParsingMode {
        self.mode
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Deliver a finished answer.
    ///
    /// Error answers reject the waiter with a [`CommandError`] unless the
    /// caller asked for failures to be suppressed, in which case the error
    /// answer is delivered as a value and a warning is logged.
    ///
    /// Returns false when the waiter has gone away.
    pub fn settle(self, answer: Answer) -> bool {
        let result = if answer.is_error() {
            let message = answer
                .value
                .error_message()
                .unwrap_or("Internal error")
                .to_string();
            if self.suppress_failure {
                warn!(
                    target: "xsdb_bridge::dispatch",
                    "Error executing command '{}': {}",
                    self.command,
                    message
                );
                Ok(answer)
            } else {
                Err(BridgeError::Command(CommandError::new(message, self.command)))
            }
        } else {
            Ok(answer)
        };
        self.responder.send(result).is_ok()
    }

    /// Fail the waiter without an answer.
    pub fn reject(self, error: BridgeError) -> bool {
        self.responder.send(Err(error)).is_ok()
    }
}

#[derive(Debug, Default)]
pub struct PendingCommands {
    slot: Option<PendingCommand>,
}

impl PendingCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command and return the receiver for its answer.
    pub fn register(
        &mut self,
        mode: ParsingMode,
        command: impl Into<String>,
        suppress_failure: bool,
    ) -> BridgeResult<oneshot::Receiver<AnswerResult>> {
        if let Some(pending) = &self.slot {
            return Err(BridgeError::channel_busy(pending.command.clone()));
        }
        let (responder, rx) = oneshot::channel();
        self.slot = Some(PendingCommand {
            mode,
            command: command.into(),
            suppress_failure,
            responder,
        });
        Ok(rx)
    }

    /// Take the waiter registered for `mode`, if any.
    pub fn take_for(&mut self, mode: ParsingMode) -> Option<PendingCommand> {
        if self.slot.as_ref().is_some_and(|pending| pending.mode == mode) {
            self.slot.take()
        } else {
            None
        }
    }

    /// Remove the waiter unconditionally, e.g. when the write failed.
    pub fn remove(&mut self) -> Option<PendingCommand> {
        self.slot.take()
    }

    pub fn is_busy(&self) -> bool {
        self.slot.is_some()
    }

    pub fn pending_command(&self) -> Option<&str> {
        self.slot.as_ref().map(PendingCommand::command)
    }

    /// Reject every waiter, returning how many were failed.
    pub fn fail_all(&mut self, error: impl Fn() -> BridgeError) -> usize {
        match self.slot.take() {
            Some(pending) => {
                pending.reject(error());
                1
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AnswerValue;

    fn value_answer(value: &str) -> Answer {
        Answer {
            mode: ParsingMode::WaitingForValue,
            value: AnswerValue::SimpleValue(value.to_string()),
            interrupt: None,
            complete: true,
        }
    }

    #[test]
    fn second_registration_is_rejected() {
        let mut pending = PendingCommands::new();
        let _rx = pending.register(ParsingMode::ListingTarget, "targets", false).unwrap();

        let err = pending
            .register(ParsingMode::ListingBacktrace, "bt", false)
            .unwrap_err();
        assert!(matches!(err, BridgeError::ChannelBusy { ref pending } if pending == "targets"));
        assert_eq!(pending.pending_command(), Some("targets"));
    }

    #[test]
    fn take_for_requires_matching_mode() {
        let mut pending = PendingCommands::new();
        let _rx = pending.register(ParsingMode::ListingMemory, "mrd 0 4", false).unwrap();

        assert!(pending.take_for(ParsingMode::ListingTarget).is_none());
        assert!(pending.is_busy());
        let taken = pending.take_for(ParsingMode::ListingMemory).unwrap();
        assert_eq!(taken.command(), "mrd 0 4");
        assert!(!pending.is_busy());
    }

    #[tokio::test]
    async fn settle_resolves_success() {
        let mut pending = PendingCommands::new();
        let rx = pending.register(ParsingMode::WaitingForValue, "connect", false).unwrap();

        let command = pending.take_for(ParsingMode::WaitingForValue).unwrap();
        assert!(command.settle(value_answer("tcfchan#0")));

        let answer = rx.await.unwrap().unwrap();
        assert_eq!(answer.value, AnswerValue::SimpleValue("tcfchan#0".to_string()));
    }

    #[tokio::test]
    async fn settle_rejects_error_answers() {
        let mut pending = PendingCommands::new();
        let rx = pending.register(ParsingMode::Waiting, "stop", false).unwrap();

        let command = pending.take_for(ParsingMode::Waiting).unwrap();
        command.settle(Answer::error("Unexpected line: Already stopped", true));

        match rx.await.unwrap() {
            Err(BridgeError::Command(err)) => {
                assert_eq!(err.command, "stop");
                assert_eq!(err.message, "Unexpected line: Already stopped");
            }
            other => panic!("expected command error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn suppressed_failures_resolve_with_error_payload() {
        let mut pending = PendingCommands::new();
        let rx = pending.register(ParsingMode::WaitingForValue, "connect", true).unwrap();

        let command = pending.take_for(ParsingMode::WaitingForValue).unwrap();
        command.settle(Answer::error("Unexpected empty line", true));

        let answer = rx.await.unwrap().unwrap();
        assert!(answer.is_error());
    }

    #[tokio::test]
    async fn fail_all_rejects_waiter() {
        let mut pending = PendingCommands::new();
        let rx = pending.register(ParsingMode::ListingTarget, "targets", false).unwrap();

        assert_eq!(pending.fail_all(|| BridgeError::ShellExited), 1);
        assert_eq!(pending.fail_all(|| BridgeError::ShellExited), 0);
        assert!(matches!(rx.await.unwrap(), Err(BridgeError::ShellExited)));
    }

    #[test]
    fn settle_reports_dropped_waiter() {
        let mut pending = PendingCommands::new();
        drop(pending.register(ParsingMode::WaitingForValue, "version", false).unwrap());
        let command = pending.remove().unwrap();
        assert!(!command.settle(value_answer("2023.2")));
    }
}
