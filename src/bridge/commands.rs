//! Typed helpers over [`XsdbBridge::send`].
//!
//! Each helper builds the command line, sends it and unwraps the aggregate
//! its mode produces. An answer of any other shape is reported as
//! [`BridgeError::UnexpectedAnswer`].

use serde::Serialize;

use super::XsdbBridge;
use crate::error::{BridgeError, BridgeResult};
use crate::protocol::line::{
    BreakpointEntry, Instruction, LocalDefinition, LocalEntry, MemoryWord, Register, TargetEntry,
};
use crate::protocol::{AddedBreakpoint, Answer, AnswerValue, Backtrace, ParsingMode};

/// Where `bpadd` should place a breakpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakpointLocation {
    Source { file: String, line: u32 },
    Function(String),
    Address(u64),
}

impl BreakpointLocation {
    pub fn command(&self) -> String {
        match self {
            BreakpointLocation::Source { file, line } => {
                format!("bpadd -file {} -line {}", file, line)
            }
            BreakpointLocation::Function(name) => format!("bpadd -addr &{}", name),
            BreakpointLocation::Address(address) => format!("bpadd -addr 0x{:x}", address),
        }
    }
}

fn unexpected(expected: ParsingMode, answer: &Answer) -> BridgeError {
    BridgeError::unexpected_answer(expected, answer.mode)
}

impl XsdbBridge {
    /// Connect to the hardware server; returns the channel name.
    pub async fn connect(&self) -> BridgeResult<String> {
        let answer = self.send("connect", false).await?;
        match answer.value {
            AnswerValue::SimpleValue(channel) => Ok(channel),
            _ => Err(unexpected(ParsingMode::WaitingForValue, &answer)),
        }
    }

    /// List targets, narrowed by the configured filter when there is one.
    pub async fn targets(&self) -> BridgeResult<Vec<TargetEntry>> {
        let command = match &self.settings().target_filter {
            Some(filter) => format!("targets -filter {{{}}}", filter),
            None => "targets".to_string(),
        };
        let answer = self.send(&command, false).await?;
        match answer.value {
            AnswerValue::Targets(targets) => Ok(targets),
            _ => Err(unexpected(ParsingMode::ListingTarget, &answer)),
        }
    }

    pub async fn select_target(&self, id: u32) -> BridgeResult<()> {
        self.send(&format!("targets {}", id), false).await.map(drop)
    }

    pub async fn backtrace(&self) -> BridgeResult<Backtrace> {
        let answer = self.send("bt", false).await?;
        match answer.value {
            AnswerValue::Backtrace(backtrace) => Ok(backtrace),
            _ => Err(unexpected(ParsingMode::ListingBacktrace, &answer)),
        }
    }

    pub async fn registers(&self) -> BridgeResult<Vec<Register>> {
        let answer = self.send("rrd", false).await?;
        match answer.value {
            AnswerValue::Registers(registers) => Ok(registers),
            _ => Err(unexpected(ParsingMode::ListingRegister, &answer)),
        }
    }

    /// Read `words` 32-bit words starting at `address`.
    pub async fn read_memory(&self, address: u64, words: usize) -> BridgeResult<Vec<MemoryWord>> {
        let answer = self
            .send(&format!("mrd 0x{:x} {}", address, words), false)
            .await?;
        match answer.value {
            AnswerValue::Memory(memory) => Ok(memory),
            _ => Err(unexpected(ParsingMode::ListingMemory, &answer)),
        }
    }

    pub async fn breakpoints(&self) -> BridgeResult<Vec<BreakpointEntry>> {
        let answer = self.send("bplist", false).await?;
        match answer.value {
            AnswerValue::Breakpoints(breakpoints) => Ok(breakpoints),
            _ => Err(unexpected(ParsingMode::ListingBreakpoints, &answer)),
        }
    }

    pub async fn add_breakpoint(
        &self,
        location: &BreakpointLocation,
    ) -> BridgeResult<AddedBreakpoint> {
        let answer = self.send(&location.command(), false).await?;
        match answer.value {
            AnswerValue::AddedBreakpoint(added) => Ok(added),
            _ => Err(unexpected(ParsingMode::AddingBreakpoint, &answer)),
        }
    }

    pub async fn remove_breakpoint(&self, id: u32) -> BridgeResult<()> {
        self.send(&format!("bpremove {}", id), false).await.map(drop)
    }

    pub async fn locals(&self) -> BridgeResult<Vec<LocalEntry>> {
        let answer = self.send("locals", false).await?;
        match answer.value {
            AnswerValue::Locals(locals) => Ok(locals),
            _ => Err(unexpected(ParsingMode::ListingLocals, &answer)),
        }
    }

    pub async fn local_definitions(&self) -> BridgeResult<Vec<LocalDefinition>> {
        let answer = self.send("locals -defs", false).await?;
        match answer.value {
            AnswerValue::LocalsDef(definitions) => Ok(definitions),
            _ => Err(unexpected(ParsingMode::ListingLocalsDef, &answer)),
        }
    }

    pub async fn set_local(&self, name: &str, value: &str) -> BridgeResult<()> {
        self.send(&format!("locals {} {}", name, value), false)
            .await
            .map(drop)
    }

    /// Disassemble `count` instructions starting at `address`.
    pub async fn disassemble(&self, address: u64, count: usize) -> BridgeResult<Vec<Instruction>> {
        let answer = self
            .send(&format!("dis 0x{:x} {}", address, count), false)
            .await?;
        match answer.value {
            AnswerValue::Disassembly(instructions) => Ok(instructions),
            _ => Err(unexpected(ParsingMode::ListingDisassembly, &answer)),
        }
    }

    /// Resume the selected target.
    ///
    /// The returned answer carries the run-state notice when the shell
    /// printed one before its prompt.
    pub async fn resume(&self) -> BridgeResult<Answer> {
        self.send("con", false).await
    }

    pub async fn suspend(&self) -> BridgeResult<Answer> {
        self.send("stop", false).await
    }

    pub async fn step_into(&self) -> BridgeResult<Answer> {
        self.send("stp", false).await
    }

    pub async fn step_over(&self) -> BridgeResult<Answer> {
        self.send("nxt", false).await
    }

    pub async fn step_out(&self) -> BridgeResult<Answer> {
        self.send("stpout", false).await
    }
}
