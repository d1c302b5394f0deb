pub mod bridge;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod values;

pub use bridge::{BreakpointLocation, ShellState, XsdbBridge};
pub use config::{BridgeConfig, BridgeSettings, load_settings};
pub use error::{BridgeError, BridgeResult, CommandError};
pub use protocol::{Answer, AnswerValue, Interrupt, InterruptKind, ParsingMode, classify, merge};
pub use session::{SessionDriver, ShellEvent, dispatch, mode_for_command};
pub use values::LocalValue;
