//! Synchronous session core: line reassembly, the pending-command slot,
//! the driver state machine and command dispatch.
//!
//! Nothing here performs I/O. The async bridge feeds output chunks in and
//! forwards dispatched command lines to the shell.

pub mod dispatcher;
pub mod driver;
pub mod line_buffer;
pub mod pending;

pub use dispatcher::{CommandSink, dispatch, mode_for_command};
pub use driver::{SessionDriver, ShellEvent};
pub use line_buffer::LineBuffer;
pub use pending::{AnswerResult, PendingCommand, PendingCommands};
