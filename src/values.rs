//! Best-effort interpretation of the raw value text printed by `locals`.
//!
//! The shell prints values as Tcl text. Only scalars and flat arrays are
//! recognised; anything else stays text.

use serde::Serialize;

use crate::protocol::patterns::parse_hex;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LocalValue {
    /// `N/A`: optimised out or not readable
    Unavailable,
    Integer(i64),
    Address(u64),
    Float(f64),
    Array(Vec<LocalValue>),
    Text(String),
}

impl LocalValue {
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();

        if text == "N/A" {
            return LocalValue::Unavailable;
        }
        if let Some(inner) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            return LocalValue::Array(split_elements(inner).into_iter().map(LocalValue::parse).collect());
        }
        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            if let Some(address) = parse_hex(hex) {
                return LocalValue::Address(address);
            }
        }
        if let Ok(integer) = text.parse::<i64>() {
            return LocalValue::Integer(integer);
        }
        if looks_numeric(text) {
            if let Ok(float) = text.parse::<f64>() {
                return LocalValue::Float(float);
            }
        }
        if let Some(unquoted) = text
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .or_else(|| text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')))
        {
            return LocalValue::Text(unquoted.to_string());
        }
        LocalValue::Text(text.to_string())
    }

    pub fn is_array(&self) -> bool {
        matches!(self, LocalValue::Array(_))
    }
}

// `str::parse::<f64>` also takes "inf" and "NaN", which are identifiers here.
fn looks_numeric(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        && text.chars().any(|c| c.is_ascii_digit())
}

/// Split the inside of `{...}` on top-level commas.
fn split_elements(inner: &str) -> Vec<&str> {
    let mut depth = 0usize;
    let mut start = 0;
    let mut parts = Vec::new();
    for (index, c) in inner.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}
