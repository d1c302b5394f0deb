//! Line Classifier.
//!
//! Turns one line of shell output into a [`ClassifiedLine`] given the mode
//! that is currently active. Pure and synchronous.
//!
//! Priority order:
//! 1. The idle prompt, in every mode.
//! 2. Banner text, which carries nothing.
//! 3. Asynchronous notices (run-state records and `func() at file: line`),
//!    which can interleave with any answer.
//! 4. Blank lines, which are only an error when a value is expected.
//! 5. The grammar of the active mode.
//!
//! A stop notice ends with `N: <source>`, which only reads as a notice in
//! context. [`classify_after`] takes the position printed just before it.

use super::line::{ClassifiedLine, LineKind, ModeFact, OutOfBandPosition};
use super::{ParsingMode, patterns};

/// Classify a single line of shell output.
pub fn classify(line: &str, mode: ParsingMode) -> ClassifiedLine {
    let text = line.trim_end_matches(['\r', '\n']);

    if patterns::is_prompt(text) {
        return ClassifiedLine::prompt();
    }
    if mode == ParsingMode::Banner {
        return ClassifiedLine::no_facts(mode);
    }
    if let Some(record) = patterns::out_of_band_record(text) {
        return ClassifiedLine::new(mode, LineKind::OutOfBand(record));
    }
    if let Some(position) = patterns::source_position(text) {
        return ClassifiedLine::new(mode, LineKind::Position(position));
    }
    if text.trim().is_empty() {
        return match mode {
            ParsingMode::WaitingForValue => ClassifiedLine::error(mode, "Unexpected empty line"),
            _ => ClassifiedLine::no_facts(mode),
        };
    }

    match mode {
        ParsingMode::Waiting => classify_waiting(text),
        ParsingMode::WaitingForValue => {
            ClassifiedLine::facts(mode, vec![ModeFact::Value(text.trim().to_string())])
        }
        ParsingMode::ListingTarget => match patterns::target_row(text) {
            Some(target) => ClassifiedLine::facts(mode, vec![ModeFact::Target(target)]),
            None => unexpected(mode, text),
        },
        ParsingMode::ListingRegister => ClassifiedLine::facts(
            mode,
            patterns::registers(text)
                .into_iter()
                .map(ModeFact::Register)
                .collect(),
        ),
        ParsingMode::ListingMemory => {
            optional_fact(mode, patterns::memory_word(text).map(ModeFact::Memory))
        }
        ParsingMode::ListingBreakpoints => {
            optional_fact(mode, patterns::breakpoint_row(text).map(ModeFact::Breakpoint))
        }
        ParsingMode::ListingLocals => match patterns::local_entry(text) {
            Some(local) => ClassifiedLine::facts(mode, vec![ModeFact::Local(local)]),
            None => unexpected(mode, text),
        },
        ParsingMode::ListingLocalsDef => {
            optional_fact(mode, patterns::local_definition(text).map(ModeFact::LocalDef))
        }
        ParsingMode::ListingDisassembly => {
            optional_fact(mode, patterns::instruction(text).map(ModeFact::Instruction))
        }
        ParsingMode::ListingBacktrace => {
            let fact = patterns::backtrace_context(text)
                .map(ModeFact::BacktraceContext)
                .or_else(|| patterns::backtrace_frame(text).map(ModeFact::BacktraceFrame));
            optional_fact(mode, fact)
        }
        ParsingMode::AddingBreakpoint => classify_breakpoint_add(text),
        ParsingMode::Banner | ParsingMode::Error | ParsingMode::Prompt => unexpected(mode, text),
    }
}

/// Classify a line that follows `previous`, the position notice printed just
/// before it, if any.
///
/// The source excerpt of a position is out-of-band in every mode.
pub fn classify_after(
    line: &str,
    mode: ParsingMode,
    previous: Option<&OutOfBandPosition>,
) -> ClassifiedLine {
    let text = line.trim_end_matches(['\r', '\n']);
    if mode != ParsingMode::Banner
        && let Some(excerpt) = previous.and_then(|position| patterns::source_excerpt(text, position))
    {
        return ClassifiedLine::new(mode, LineKind::Position(excerpt));
    }
    classify(line, mode)
}

/// Classify consecutive lines of one stream, carrying position context.
pub fn classify_lines<'a>(
    lines: impl IntoIterator<Item = &'a str>,
    mode: ParsingMode,
) -> Vec<ClassifiedLine> {
    let mut previous: Option<OutOfBandPosition> = None;
    lines
        .into_iter()
        .map(|line| {
            let classified = classify_after(line, mode, previous.as_ref());
            previous = classified.numbered_position().cloned();
            classified
        })
        .collect()
}

fn unexpected(mode: ParsingMode, text: &str) -> ClassifiedLine {
    ClassifiedLine::error(mode, format!("Unexpected line: {}", text))
}

fn optional_fact(mode: ParsingMode, fact: Option<ModeFact>) -> ClassifiedLine {
    ClassifiedLine::facts(mode, fact.into_iter().collect())
}

fn classify_waiting(text: &str) -> ClassifiedLine {
    let mode = ParsingMode::Waiting;
    if patterns::is_tcl_error(text) {
        return unexpected(mode, text);
    }
    match patterns::bare_position(text) {
        Some(position) => ClassifiedLine::new(mode, LineKind::Position(position)),
        None => unexpected(mode, text),
    }
}

fn classify_breakpoint_add(text: &str) -> ClassifiedLine {
    let mode = ParsingMode::AddingBreakpoint;
    if let Some(id) = patterns::breakpoint_id(text) {
        return ClassifiedLine::facts(mode, vec![ModeFact::BreakpointId(id)]);
    }
    if let Some(resolved) = patterns::breakpoint_resolved(text) {
        return ClassifiedLine::facts(mode, vec![ModeFact::BreakpointResolved(resolved)]);
    }
    if patterns::is_breakpoint_status(text) {
        return ClassifiedLine::no_facts(mode);
    }
    unexpected(mode, text)
}
