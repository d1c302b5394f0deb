//! Parsing modes of the XSDB session.
//!
//! The mode decides which grammar applies to the next line of shell output.
//! It is set by the dispatcher when a command goes out and reset to
//! [`ParsingMode::Waiting`] when the answer completes.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Grammar context for the next unclassified line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ParsingMode {
    /// No command in flight
    #[default]
    Waiting,
    /// Startup splash, up to the first prompt
    Banner,
    ListingTarget,
    ListingRegister,
    ListingMemory,
    ListingBreakpoints,
    ListingLocals,
    ListingLocalsDef,
    ListingDisassembly,
    ListingBacktrace,
    /// A single scalar line is expected
    WaitingForValue,
    AddingBreakpoint,
    /// Assigned by the assembler to failed answers
    Error,
    /// Marks an idle shell; never a driving mode
    Prompt,
}

impl ParsingMode {
    /// Every mode, in declaration order.
    pub const ALL: [ParsingMode; 14] = [
        ParsingMode::Waiting,
        ParsingMode::Banner,
        ParsingMode::ListingTarget,
        ParsingMode::ListingRegister,
        ParsingMode::ListingMemory,
        ParsingMode::ListingBreakpoints,
        ParsingMode::ListingLocals,
        ParsingMode::ListingLocalsDef,
        ParsingMode::ListingDisassembly,
        ParsingMode::ListingBacktrace,
        ParsingMode::WaitingForValue,
        ParsingMode::AddingBreakpoint,
        ParsingMode::Error,
        ParsingMode::Prompt,
    ];

    /// Kebab-case name used in logs and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ParsingMode::Waiting => "waiting",
            ParsingMode::Banner => "banner",
            ParsingMode::ListingTarget => "listing-target",
            ParsingMode::ListingRegister => "listing-register",
            ParsingMode::ListingMemory => "listing-memory",
            ParsingMode::ListingBreakpoints => "listing-breakpoints",
            ParsingMode::ListingLocals => "listing-locals",
            ParsingMode::ListingLocalsDef => "listing-locals-def",
            ParsingMode::ListingDisassembly => "listing-disassembly",
            ParsingMode::ListingBacktrace => "listing-backtrace",
            ParsingMode::WaitingForValue => "waiting-for-value",
            ParsingMode::AddingBreakpoint => "adding-breakpoint",
            ParsingMode::Error => "error",
            ParsingMode::Prompt => "prompt",
        }
    }

    /// Whether a command can put the session into this mode.
    pub fn is_driving(self) -> bool {
        !matches!(self, ParsingMode::Error | ParsingMode::Prompt)
    }
}

impl fmt::Display for ParsingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a mode name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown parsing mode '{0}'")]
pub struct UnknownMode(pub String);

impl FromStr for ParsingMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ParsingMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn names_round_trip_through_from_str() {
        for mode in ParsingMode::ALL {
            assert_eq!(mode.as_str().parse::<ParsingMode>(), Ok(mode));
        }
    }

    #[rstest]
    #[case::snake_case("listing_target", ParsingMode::ListingTarget)]
    #[case::upper("WAITING-FOR-VALUE", ParsingMode::WaitingForValue)]
    #[case::padded("  banner ", ParsingMode::Banner)]
    fn from_str_is_lenient(#[case] input: &str, #[case] expected: ParsingMode) {
        assert_eq!(input.parse::<ParsingMode>(), Ok(expected));
    }

    #[test]
    fn from_str_rejects_unknown() {
        assert_eq!(
            "listing-threads".parse::<ParsingMode>(),
            Err(UnknownMode("listing-threads".to_string()))
        );
    }

    #[test]
    fn error_and_prompt_are_not_driving_modes() {
        assert!(!ParsingMode::Error.is_driving());
        assert!(!ParsingMode::Prompt.is_driving());
        assert!(ParsingMode::AddingBreakpoint.is_driving());
    }

    #[test]
    fn serializes_as_kebab_case() {
        let json = serde_json::to_string(&ParsingMode::ListingLocalsDef).unwrap();
        assert_eq!(json, "\"listing-locals-def\"");
    }
}
