//! Named matchers for every line shape the shell prints.
//!
//! Each matcher looks at one line and returns the structured record it
//! describes, or `None` when the line has some other shape. None of them
//! know about parsing modes; [`super::classify`] decides which to try.

use std::sync::LazyLock;

use regex::Regex;

use super::line::{
    BacktraceContext, BacktraceFrame, BreakpointEntry, CorePosition, Instruction, LocalDefinition,
    LocalEntry, MemoryWord, OutOfBandPosition, OutOfBandRecord, Register, ResolvedBreakpoint,
    TargetEntry,
};

/// The idle prompt, printed without a trailing newline.
pub const PROMPT: &str = "xsdb% ";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("line grammar regex is a compile-time constant and must be valid")
}

static OUT_OF_BAND: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^Info: (.+?) \(target (\d+)\) ([^(]+)\(([^)]*)\)\s*$"));
static FUNC_AT_FILE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^([_a-zA-Z][_a-zA-Z0-9]*)\(\) at ([^:]+): *(\d+)\s*$"));
static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| compile(r"^\s*([^:]+?)\s*:\s*(.+?)\s*$"));
static TCL_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^(?:invalid command name |wrong # args|can't read |bad option |unknown option |ambiguous option )")
});
static TARGET_ROW: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^\s*(\d+)(?:(\*)\s*|\s+)((?:[-_a-zA-Z0-9] ?)+)(?:#(\d+)|\[(\d+),(\d+)\])?\s*(?:\(([^)]*)\))?.*$")
});
static REGISTER: LazyLock<Regex> =
    LazyLock::new(|| compile(r"([_a-zA-Z0-9]+): (N/A|[0-9A-Fa-f]+)"));
static MEMORY_WORD: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*([0-9A-Fa-f]+):\s*([0-9A-Fa-f]+)"));
static BREAKPOINT_ROW: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^\s*(\d+)\s+([01])\s+(\S+)(?:\s+target (\d+): \{Address ([xX0-9a-fA-F]+) HitCount (\d+)\})?",
    )
});
static LOCAL_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^\s*([_a-zA-Z][_a-zA-Z0-9]*)\s+(.+?)\s+(0[xX][0-9a-fA-F]+|N/A)\s+(\d+)(?:\s+(\S.*?))?\s*$")
});
static INSTRUCTION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^([0-9A-Fa-f]+): ((?:0x[0-9a-fA-F]{2} *)+)(.*)$"));
static BACKTRACE_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"Context ((?:[-_a-zA-Z0-9] ?)+)(?:#(\d+)|\[(\d+),(\d+)\])? state: ([A-Za-z ]+)")
});
static BACKTRACE_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^\s+(\d+)\s+(0x[0-9a-fA-F]+|[0-9a-fA-F]+) ([_a-zA-Z0-9]+)\(\)(?:\+[0-9]+: ([-_./a-zA-Z0-9]+), line (\d+))?",
    )
});
static BREAKPOINT_ID: LazyLock<Regex> = LazyLock::new(|| compile(r"^\s*(\d+)\s*$"));
static BREAKPOINT_RESOLVED: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^\s*target (\d+): \{(?:Address: ([xX0-9a-fA-F]+)\s*)?(?:Type: ([a-zA-Z]+))?[^}]*\}\s*$",
    )
});
static BREAKPOINT_STATUS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*Info: Breakpoint (\d+) status:\s*$"));

/// Parse hexadecimal text with or without a `0x` prefix.
pub fn parse_hex(text: &str) -> Option<u64> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).ok()
}

/// Whole-line idle prompt, tolerating trailing whitespace and line endings.
pub fn is_prompt(line: &str) -> bool {
    line.trim_end() == PROMPT.trim_end()
}

/// Text following a leading prompt, as in `xsdb% Info: Breakpoint 15 status:`.
pub fn strip_prompt_prefix(line: &str) -> Option<&str> {
    line.strip_prefix(PROMPT).filter(|rest| !rest.is_empty())
}

pub fn out_of_band_record(line: &str) -> Option<OutOfBandRecord> {
    let caps = OUT_OF_BAND.captures(line)?;
    let state = &caps[3];
    let running = state.contains("Running");
    let pc = if running {
        0
    } else {
        state
            .rfind("0x")
            .map(|at| {
                let hex: String = state[at + 2..]
                    .chars()
                    .take_while(char::is_ascii_hexdigit)
                    .collect();
                u64::from_str_radix(&hex, 16).unwrap_or(0)
            })
            .unwrap_or(0)
    };

    Some(OutOfBandRecord {
        core: caps[1].to_string(),
        target: caps[2].parse().ok()?,
        running,
        pc,
        status: caps[4].trim().to_string(),
    })
}

/// Generic `key : value` split at the first colon.
pub fn key_value(line: &str) -> Option<(String, String)> {
    let caps = KEY_VALUE.captures(line)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// `<func>() at <file>: <line>` position notice.
pub fn source_position(line: &str) -> Option<OutOfBandPosition> {
    let caps = FUNC_AT_FILE.captures(line.trim_end())?;
    let (key, value) = key_value(line)?;
    Some(OutOfBandPosition {
        key,
        value,
        func: Some(caps[1].to_string()),
        file: Some(caps[2].trim().to_string()),
        line: caps[3].parse().ok(),
    })
}

/// Bare `key : value` notice, e.g. the source excerpt printed after a stop.
pub fn bare_position(line: &str) -> Option<OutOfBandPosition> {
    let (key, value) = key_value(line)?;
    Some(OutOfBandPosition {
        key,
        value,
        func: None,
        file: None,
        line: None,
    })
}

/// `N: <source>` excerpt printed right after a position naming line `N`.
pub fn source_excerpt(line: &str, after: &OutOfBandPosition) -> Option<OutOfBandPosition> {
    let number = after.line?;
    let excerpt = bare_position(line)?;
    (excerpt.key.parse::<u32>().ok()? == number).then_some(excerpt)
}

/// Messages the Tcl interpreter prints for malformed commands.
pub fn is_tcl_error(line: &str) -> bool {
    TCL_ERROR.is_match(line.trim_start())
}

fn core_position(
    index: Option<regex::Match<'_>>,
    row: Option<regex::Match<'_>>,
    col: Option<regex::Match<'_>>,
) -> Option<CorePosition> {
    if let Some(index) = index {
        return index.as_str().parse().ok().map(CorePosition::Index);
    }
    let row = row?.as_str().parse().ok()?;
    let col = col?.as_str().parse().ok()?;
    Some(CorePosition::Tile { row, col })
}

pub fn target_row(line: &str) -> Option<TargetEntry> {
    let caps = TARGET_ROW.captures(line)?;
    Some(TargetEntry {
        id: caps[1].parse().ok()?,
        name: caps[3].trim().to_string(),
        pos: core_position(caps.get(4), caps.get(5), caps.get(6)),
        state: caps.get(7).map(|m| m.as_str().trim().to_string()),
        selected: caps.get(2).is_some(),
    })
}

/// All `name: value` register columns on one line, left to right.
pub fn registers(line: &str) -> Vec<Register> {
    REGISTER
        .captures_iter(line)
        .map(|caps| {
            let raw = caps[2].to_string();
            let value = if raw == "N/A" { None } else { parse_hex(&raw) };
            Register {
                name: caps[1].to_string(),
                raw,
                value,
            }
        })
        .collect()
}

pub fn memory_word(line: &str) -> Option<MemoryWord> {
    let caps = MEMORY_WORD.captures(line)?;
    Some(MemoryWord {
        address: parse_hex(&caps[1])?,
        value: parse_hex(&caps[2])?,
    })
}

pub fn breakpoint_row(line: &str) -> Option<BreakpointEntry> {
    let caps = BREAKPOINT_ROW.captures(line)?;
    Some(BreakpointEntry {
        id: caps[1].parse().ok()?,
        enabled: &caps[2] == "1",
        location: caps[3].to_string(),
        target: caps.get(4).and_then(|m| m.as_str().parse().ok()),
        address: caps.get(5).and_then(|m| parse_hex(m.as_str())),
        hit_count: caps.get(6).and_then(|m| m.as_str().parse().ok()),
    })
}

pub fn local_entry(line: &str) -> Option<LocalEntry> {
    let (name, value) = key_value(line)?;
    Some(LocalEntry { name, value })
}

pub fn local_definition(line: &str) -> Option<LocalDefinition> {
    let caps = LOCAL_DEFINITION.captures(line)?;
    Some(LocalDefinition {
        name: caps[1].to_string(),
        type_name: caps[2].to_string(),
        address: parse_hex(&caps[3]),
        size: caps[4].parse().ok()?,
        flags: caps.get(5).map(|m| m.as_str().to_string()),
    })
}

pub fn instruction(line: &str) -> Option<Instruction> {
    let caps = INSTRUCTION.captures(line.trim_end())?;
    Some(Instruction {
        address: parse_hex(&caps[1])?,
        raw: caps[2].trim().to_string(),
        text: caps[3].trim().to_string(),
    })
}

pub fn backtrace_context(line: &str) -> Option<BacktraceContext> {
    let caps = BACKTRACE_CONTEXT.captures(line)?;
    Some(BacktraceContext {
        core: caps[1].trim().to_string(),
        pos: core_position(caps.get(2), caps.get(3), caps.get(4)),
        target: caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0),
        state: caps[5].trim().to_string(),
    })
}

pub fn backtrace_frame(line: &str) -> Option<BacktraceFrame> {
    let caps = BACKTRACE_FRAME.captures(line)?;
    Some(BacktraceFrame {
        index: caps[1].parse().ok()?,
        address: parse_hex(&caps[2])?,
        function: caps[3].to_string(),
        file: caps.get(4).map(|m| m.as_str().to_string()),
        line: caps.get(5).and_then(|m| m.as_str().parse().ok()),
    })
}

pub fn breakpoint_id(line: &str) -> Option<u32> {
    BREAKPOINT_ID.captures(line)?[1].parse().ok()
}

pub fn breakpoint_resolved(line: &str) -> Option<ResolvedBreakpoint> {
    let caps = BREAKPOINT_RESOLVED.captures(line)?;
    Some(ResolvedBreakpoint {
        target: caps[1].parse().ok()?,
        address: caps.get(2).and_then(|m| parse_hex(m.as_str())),
        kind: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

/// `Info: Breakpoint N status:` echo that precedes the resolved descriptor.
pub fn is_breakpoint_status(line: &str) -> bool {
    BREAKPOINT_STATUS.is_match(line)
}
