//! Classified lines and the records they carry.
//!
//! A [`ClassifiedLine`] is the unit handed from the classifier to the
//! assembler. Asynchronous notices ([`OutOfBandRecord`], [`OutOfBandPosition`])
//! never share a line with mode-specific facts.

use serde::Serialize;

use super::ParsingMode;

/// Asynchronous run-state notice, e.g.
/// `Info: core[23,0] (target 16) Stopped at 0x420 (Breakpoint)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutOfBandRecord {
    pub core: String,
    pub target: u32,
    pub running: bool,
    pub pc: u64,
    pub status: String,
}

/// Asynchronous source-location annotation, e.g. `main() at hello.c: 12`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutOfBandPosition {
    pub key: String,
    pub value: String,
    pub func: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// Where a core sits: a simple `#n` slot or an AI engine `[row,col]` tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorePosition {
    Index(u32),
    Tile { row: u32, col: u32 },
}

/// One row of `targets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetEntry {
    pub id: u32,
    pub name: String,
    pub pos: Option<CorePosition>,
    pub state: Option<String>,
    /// The row carried the `*` marker of the active target
    pub selected: bool,
}

/// One `name: value` column of `rrd`. `value` is `None` for `N/A`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Register {
    pub name: String,
    pub raw: String,
    pub value: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryWord {
    pub address: u64,
    pub value: u64,
}

/// One row of `bplist`.
///
/// Rows whose status column is not resolved keep `target`, `address` and
/// `hit_count` empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakpointEntry {
    pub id: u32,
    pub enabled: bool,
    pub location: String,
    pub target: Option<u32>,
    pub address: Option<u64>,
    pub hit_count: Option<u32>,
}

/// `name : value` as printed by `locals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalEntry {
    pub name: String,
    pub value: String,
}

/// One row of `locals -defs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalDefinition {
    pub name: String,
    pub type_name: String,
    pub address: Option<u64>,
    pub size: u32,
    pub flags: Option<String>,
}

/// One line of `dis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub address: u64,
    /// Byte dump as printed, e.g. `0x00 0x01`
    pub raw: String,
    pub text: String,
}

impl Instruction {
    /// Decode the byte dump. Malformed bytes are skipped.
    pub fn bytes(&self) -> Vec<u8> {
        self.raw
            .split_whitespace()
            .filter_map(|byte| {
                let digits = byte.trim_start_matches("0x").trim_start_matches("0X");
                u8::from_str_radix(digits, 16).ok()
            })
            .collect()
    }
}

/// `Context <core> state: <state>` header of `bt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BacktraceContext {
    pub core: String,
    pub pos: Option<CorePosition>,
    /// Slot number for `#n` cores, 0 otherwise
    pub target: u32,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BacktraceFrame {
    pub index: u32,
    pub address: u64,
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// `target N: {Address: 0x110 Type: Hardware}` reported after `bpadd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBreakpoint {
    pub target: u32,
    pub address: Option<u64>,
    pub kind: Option<String>,
}

/// A mode-specific structured record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeFact {
    Target(TargetEntry),
    Register(Register),
    Memory(MemoryWord),
    Breakpoint(BreakpointEntry),
    Local(LocalEntry),
    LocalDef(LocalDefinition),
    Instruction(Instruction),
    BacktraceContext(BacktraceContext),
    BacktraceFrame(BacktraceFrame),
    Value(String),
    BreakpointId(u32),
    BreakpointResolved(ResolvedBreakpoint),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    OutOfBand(OutOfBandRecord),
    Position(OutOfBandPosition),
    /// Zero or more facts; empty for headers, separators and banner text
    Facts(Vec<ModeFact>),
    Prompt,
    Error(String),
}

/// One line of shell output together with the mode it was read in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedLine {
    pub mode: ParsingMode,
    pub kind: LineKind,
}

impl ClassifiedLine {
    pub fn new(mode: ParsingMode, kind: LineKind) -> Self {
        Self { mode, kind }
    }

    pub fn prompt() -> Self {
        Self::new(ParsingMode::Prompt, LineKind::Prompt)
    }

    pub fn facts(mode: ParsingMode, facts: Vec<ModeFact>) -> Self {
        Self::new(mode, LineKind::Facts(facts))
    }

    pub fn no_facts(mode: ParsingMode) -> Self {
        Self::facts(mode, Vec::new())
    }

    pub fn error(mode: ParsingMode, message: impl Into<String>) -> Self {
        Self::new(mode, LineKind::Error(message.into()))
    }

    /// The position this line carries, when it names a source line.
    pub fn numbered_position(&self) -> Option<&OutOfBandPosition> {
        match &self.kind {
            LineKind::Position(position) if position.line.is_some() => Some(position),
            _ => None,
        }
    }

    pub fn is_prompt(&self) -> bool {
        matches!(self.kind, LineKind::Prompt)
    }

    /// Out-of-band records and positions ride alongside any answer.
    pub fn is_out_of_band(&self) -> bool {
        matches!(self.kind, LineKind::OutOfBand(_) | LineKind::Position(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_bytes_decodes_dump() {
        let insn = Instruction {
            address: 0x274,
            raw: "0x4a    0xd6 0x18 0x03".to_string(),
            text: "NOP".to_string(),
        };
        assert_eq!(insn.bytes(), vec![0x4a, 0xd6, 0x18, 0x03]);
    }

    #[test]
    fn instruction_bytes_skips_garbage() {
        let insn = Instruction {
            address: 0,
            raw: "0x00 zz 0x01".to_string(),
            text: String::new(),
        };
        assert_eq!(insn.bytes(), vec![0x00, 0x01]);
    }

    #[test]
    fn out_of_band_predicate() {
        let position = ClassifiedLine::new(
            ParsingMode::ListingBacktrace,
            LineKind::Position(OutOfBandPosition {
                key: "900".to_string(),
                value: "x".to_string(),
                func: None,
                file: None,
                line: None,
            }),
        );
        assert!(position.is_out_of_band());
        assert!(!ClassifiedLine::prompt().is_out_of_band());
        assert!(!ClassifiedLine::no_facts(ParsingMode::Waiting).is_out_of_band());
    }
}
