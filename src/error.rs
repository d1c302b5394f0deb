//! Error handling types for xsdb-bridge
//!
//! This module provides the error taxonomy shared by the session core and
//! the async process bridge.

use std::sync::PoisonError;

use serde::Serialize;
use thiserror::Error;

use crate::protocol::ParsingMode;

/// A command the shell answered with an error.
///
/// Carries the message of the failing answer together with the command text
/// that triggered it, so callers can report which request went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("Error executing '{command}': {message}")]
pub struct CommandError {
    pub message: String,
    pub command: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            command: command.into(),
        }
    }
}

/// Comprehensive error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Another command is still waiting for its answer
    #[error("Shell channel busy: '{pending}' is still awaiting its answer")]
    ChannelBusy { pending: String },

    /// The startup banner has not finished yet
    #[error("Shell not ready: startup banner still in progress")]
    NotReady,

    /// The shell reported an error for a command
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The answer payload did not have the requested shape
    #[error("Unexpected answer: expected {expected}, got {actual}")]
    UnexpectedAnswer {
        expected: ParsingMode,
        actual: ParsingMode,
    },

    /// The shell process went away before answering
    #[error("Shell exited")]
    ShellExited,

    /// The shell process could not be started
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The outbound command queue rejected a line
    #[error("Outbound queue error: {message}")]
    Outbound { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Helper trait to convert PoisonError to BridgeError
pub trait LockResultExt<T> {
    /// Recover the guard from a poisoned lock, logging which operation hit it.
    fn recover_poison(self, context: &str) -> Result<T, BridgeError>;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> Result<T, BridgeError> {
        match self {
            Ok(guard) => Ok(guard),
            Err(poisoned) => {
                log::warn!(
                    target: "xsdb_bridge::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                Ok(poisoned.into_inner())
            }
        }
    }
}

/// Helper functions for common error patterns
impl BridgeError {
    /// Create a channel busy error
    pub fn channel_busy(pending: impl Into<String>) -> Self {
        BridgeError::ChannelBusy {
            pending: pending.into(),
        }
    }

    /// Create an outbound queue error
    pub fn outbound(message: impl Into<String>) -> Self {
        BridgeError::Outbound {
            message: message.into(),
        }
    }

    /// Create an unexpected answer error
    pub fn unexpected_answer(expected: ParsingMode, actual: ParsingMode) -> Self {
        BridgeError::UnexpectedAnswer { expected, actual }
    }

    /// Whether the shell rejected the command (as opposed to a transport problem).
    pub fn is_command_failure(&self) -> bool {
        matches!(self, BridgeError::Command(_))
    }
}
