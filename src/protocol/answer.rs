//! Assembled answers and their per-mode aggregates.

use serde::Serialize;

use super::ParsingMode;
use super::line::{
    BacktraceContext, BacktraceFrame, BreakpointEntry, Instruction, LocalDefinition, LocalEntry,
    MemoryWord, ModeFact, OutOfBandPosition, OutOfBandRecord, Register, ResolvedBreakpoint,
    TargetEntry,
};

/// What an interrupt means for the run state of the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptKind {
    Running,
    /// Running with a `Disabled` status: the program finished
    Exited,
    /// Halted, usually on a breakpoint
    Stopped,
}

/// Asynchronous notices collected over one answer span.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Interrupt {
    pub core: String,
    pub target: u32,
    pub running: bool,
    pub pc: u64,
    pub status: String,
    pub source_lines: Vec<OutOfBandPosition>,
}

impl Interrupt {
    pub fn from_record(record: OutOfBandRecord) -> Self {
        let mut interrupt = Self::default();
        interrupt.append_record(record);
        interrupt
    }

    /// A later record overrides the run state of an earlier one.
    pub fn append_record(&mut self, record: OutOfBandRecord) {
        self.core = record.core;
        self.target = record.target;
        self.running = record.running;
        self.pc = record.pc;
        self.status = record.status;
    }

    pub fn append_position(&mut self, position: OutOfBandPosition) {
        self.source_lines.push(position);
    }

    pub fn kind(&self) -> InterruptKind {
        match (self.running, self.status.as_str()) {
            (true, "Disabled") => InterruptKind::Exited,
            (true, _) => InterruptKind::Running,
            (false, _) => InterruptKind::Stopped,
        }
    }

    /// First source position that names a file and line.
    pub fn location(&self) -> Option<&OutOfBandPosition> {
        self.source_lines
            .iter()
            .find(|pos| pos.file.is_some() && pos.line.is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Backtrace {
    pub context: Option<BacktraceContext>,
    pub frames: Vec<BacktraceFrame>,
}

impl Backtrace {
    fn append(&mut self, fact: ModeFact) -> Result<(), ModeFact> {
        match fact {
            ModeFact::BacktraceContext(context) => self.context = Some(context),
            ModeFact::BacktraceFrame(frame) => self.frames.push(frame),
            other => return Err(other),
        }
        Ok(())
    }
}

/// Result of `bpadd`, filled from up to three lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddedBreakpoint {
    pub id: Option<u32>,
    pub target: Option<u32>,
    pub address: Option<u64>,
    pub kind: Option<String>,
}

impl AddedBreakpoint {
    fn append(&mut self, fact: ModeFact) -> Result<(), ModeFact> {
        match fact {
            ModeFact::BreakpointId(id) => self.id = Some(id),
            ModeFact::BreakpointResolved(ResolvedBreakpoint {
                target,
                address,
                kind,
            }) => {
                self.target = Some(target);
                self.address = address;
                self.kind = kind;
            }
            other => return Err(other),
        }
        Ok(())
    }

    /// The id is known but the shell has not reported where it landed.
    pub fn awaiting_descriptor(&self) -> bool {
        self.id.is_some() && self.target.is_none()
    }
}

/// Payload of an [`Answer`], one variant per aggregate shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AnswerValue {
    Empty,
    Targets(Vec<TargetEntry>),
    Registers(Vec<Register>),
    Memory(Vec<MemoryWord>),
    Breakpoints(Vec<BreakpointEntry>),
    Locals(Vec<LocalEntry>),
    LocalsDef(Vec<LocalDefinition>),
    Disassembly(Vec<Instruction>),
    Backtrace(Backtrace),
    SimpleValue(String),
    AddedBreakpoint(AddedBreakpoint),
    Error { message: String },
}

impl AnswerValue {
    /// The empty aggregate a mode folds its facts into.
    pub fn empty_for(mode: ParsingMode) -> Self {
        match mode {
            ParsingMode::ListingTarget => AnswerValue::Targets(Vec::new()),
            ParsingMode::ListingRegister => AnswerValue::Registers(Vec::new()),
            ParsingMode::ListingMemory => AnswerValue::Memory(Vec::new()),
            ParsingMode::ListingBreakpoints => AnswerValue::Breakpoints(Vec::new()),
            ParsingMode::ListingLocals => AnswerValue::Locals(Vec::new()),
            ParsingMode::ListingLocalsDef => AnswerValue::LocalsDef(Vec::new()),
            ParsingMode::ListingDisassembly => AnswerValue::Disassembly(Vec::new()),
            ParsingMode::ListingBacktrace => AnswerValue::Backtrace(Backtrace::default()),
            ParsingMode::WaitingForValue => AnswerValue::SimpleValue(String::new()),
            ParsingMode::AddingBreakpoint => {
                AnswerValue::AddedBreakpoint(AddedBreakpoint::default())
            }
            ParsingMode::Waiting | ParsingMode::Banner => AnswerValue::Empty,
            ParsingMode::Error | ParsingMode::Prompt => AnswerValue::Error {
                message: format!("No answer can be assembled for mode {}", mode),
            },
        }
    }

    /// Fold one fact into the aggregate.
    ///
    /// Hands the fact back when it does not belong to this aggregate.
    pub fn append(&mut self, fact: ModeFact) -> Result<(), ModeFact> {
        match (self, fact) {
            (AnswerValue::Targets(rows), ModeFact::Target(row)) => rows.push(row),
            (AnswerValue::Registers(rows), ModeFact::Register(row)) => rows.push(row),
            (AnswerValue::Memory(rows), ModeFact::Memory(row)) => rows.push(row),
            (AnswerValue::Breakpoints(rows), ModeFact::Breakpoint(row)) => rows.push(row),
            (AnswerValue::Locals(rows), ModeFact::Local(row)) => rows.push(row),
            (AnswerValue::LocalsDef(rows), ModeFact::LocalDef(row)) => rows.push(row),
            (AnswerValue::Disassembly(rows), ModeFact::Instruction(row)) => rows.push(row),
            (AnswerValue::Backtrace(backtrace), fact) => return backtrace.append(fact),
            (AnswerValue::AddedBreakpoint(added), fact) => return added.append(fact),
            (AnswerValue::SimpleValue(value), ModeFact::Value(line)) => {
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(&line);
            }
            (_, fact) => return Err(fact),
        }
        Ok(())
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AnswerValue::Error { message } => Some(message),
            _ => None,
        }
    }
}

/// The typed result of one command, spanning from send to settling prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub mode: ParsingMode,
    pub value: AnswerValue,
    pub interrupt: Option<Interrupt>,
    pub complete: bool,
}

impl Answer {
    pub fn error(message: impl Into<String>, complete: bool) -> Self {
        Self {
            mode: ParsingMode::Error,
            value: AnswerValue::Error {
                message: message.into(),
            },
            interrupt: None,
            complete,
        }
    }

    pub fn is_error(&self) -> bool {
        self.mode == ParsingMode::Error
    }

    /// No payload, only asynchronous notices.
    pub fn is_interrupt_only(&self) -> bool {
        self.interrupt.is_some() && self.value == AnswerValue::Empty
    }
}
