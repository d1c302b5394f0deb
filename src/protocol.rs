//! XSDB line protocol.
//!
//! The shell has no message framing: answers end when the idle prompt
//! reappears, and asynchronous notices can interleave with any answer.
//! This module turns raw lines into typed facts ([`classify`]) and folds the
//! facts of one answer span into an [`Answer`] ([`merge`]).

pub mod answer;
pub mod assemble;
pub mod classify;
pub mod line;
pub mod mode;
pub mod patterns;

pub use answer::{AddedBreakpoint, Answer, AnswerValue, Backtrace, Interrupt, InterruptKind};
pub use assemble::merge;
pub use classify::{classify, classify_after, classify_lines};
pub use line::{
    BacktraceContext, BacktraceFrame, BreakpointEntry, ClassifiedLine, CorePosition, Instruction,
    LineKind, LocalDefinition, LocalEntry, MemoryWord, ModeFact, OutOfBandPosition,
    OutOfBandRecord, Register, ResolvedBreakpoint, TargetEntry,
};
pub use mode::{ParsingMode, UnknownMode};
pub use patterns::PROMPT;
