//! Reassembly of whole lines from arbitrarily chunked shell output.
//!
//! Chunks can split lines and even multi-byte characters. A trailing
//! partial line is held until its terminator arrives, except for the idle
//! prompt, which the shell prints without a newline.

use crate::protocol::PROMPT;
use crate::protocol::patterns::strip_prompt_prefix;

#[derive(Debug, Default)]
pub struct LineBuffer {
    /// Decoded text not yet terminated by a newline
    partial: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    carry: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every line completed by them.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(bytes);
        let decoded = self.decode_carry();
        self.push_str(&decoded)
    }

    /// Feed decoded text and return every line completed by it.
    pub fn push_str(&mut self, text: &str) -> Vec<String> {
        self.partial.push_str(text);
        let mut lines = Vec::new();

        while let Some(newline) = self.partial.find('\n') {
            let rest = self.partial.split_off(newline + 1);
            let mut line = std::mem::replace(&mut self.partial, rest);
            line.truncate(line.trim_end_matches(['\r', '\n']).len());
            split_prompts(line, &mut lines);
        }

        // Prompts arrive without a newline; release them immediately.
        while self.partial.starts_with(PROMPT) {
            lines.push(PROMPT.to_string());
            self.partial.drain(..PROMPT.len());
        }

        lines
    }

    /// Text received after the last newline.
    pub fn partial(&self) -> &str {
        &self.partial
    }

    /// Release whatever is left, used when the stream ends.
    pub fn flush(&mut self) -> Option<String> {
        if !self.carry.is_empty() {
            let tail = String::from_utf8_lossy(&self.carry).into_owned();
            self.partial.push_str(&tail);
            self.carry.clear();
        }
        if self.partial.is_empty() {
            None
        } else {
            let line = std::mem::take(&mut self.partial);
            Some(line.trim_end_matches('\r').to_string())
        }
    }

    fn decode_carry(&mut self) -> String {
        let mut decoded = String::new();
        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(text) => {
                    decoded.push_str(text);
                    self.carry.clear();
                    return decoded;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    decoded.push_str(&String::from_utf8_lossy(&self.carry[..valid]));
                    match err.error_len() {
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.carry.drain(..valid);
                            return decoded;
                        }
                        Some(bad) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            self.carry.drain(..valid + bad);
                        }
                    }
                }
            }
        }
    }
}

/// `xsdb% Info: ...` carries a prompt followed by a real line.
fn split_prompts(mut line: String, out: &mut Vec<String>) {
    while let Some(rest) = strip_prompt_prefix(&line) {
        let rest = rest.to_string();
        out.push(PROMPT.to_string());
        line = rest;
    }
    out.push(line);
}
