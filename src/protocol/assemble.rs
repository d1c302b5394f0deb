//! Answer Assembler.
//!
//! Folds the classified lines gathered since the last prompt into one
//! [`Answer`]. Asynchronous notices go to [`Answer::interrupt`] wherever they
//! appear; every other line feeds the aggregate of the driving mode.

use super::ParsingMode;
use super::answer::{Answer, AnswerValue, Interrupt};
use super::line::{ClassifiedLine, LineKind};

/// Assemble an answer for `mode` from `lines`.
///
/// The answer is `complete` once a terminal prompt is found. For
/// [`ParsingMode::AddingBreakpoint`] the first prompt after the breakpoint id
/// is an echo and does not end the answer while the descriptor is missing.
pub fn merge(lines: &[ClassifiedLine], mode: ParsingMode) -> Answer {
    if lines.is_empty() {
        return Answer::error("Empty answer", false);
    }
    if mode == ParsingMode::Banner {
        return merge_banner(lines);
    }

    let mut answer = Answer {
        mode,
        value: AnswerValue::empty_for(mode),
        interrupt: None,
        complete: false,
    };
    if !mode.is_driving() {
        answer.mode = ParsingMode::Error;
    }
    let mut prompts = 0usize;

    for line in lines {
        match &line.kind {
            LineKind::Prompt => {
                prompts += 1;
                if swallows_prompt(&answer, prompts) {
                    continue;
                }
                answer.complete = true;
                break;
            }
            _ if answer.is_error() => {}
            LineKind::OutOfBand(record) => match answer.interrupt.as_mut() {
                Some(interrupt) => interrupt.append_record(record.clone()),
                None => answer.interrupt = Some(Interrupt::from_record(record.clone())),
            },
            LineKind::Position(position) => answer
                .interrupt
                .get_or_insert_with(Interrupt::default)
                .append_position(position.clone()),
            LineKind::Error(message) => fail(&mut answer, message.clone()),
            LineKind::Facts(_) if line.mode != mode => {
                fail(&mut answer, wrong_line(line, mode));
            }
            LineKind::Facts(facts) => {
                for fact in facts {
                    if answer.value.append(fact.clone()).is_err() {
                        fail(&mut answer, wrong_line(line, mode));
                        break;
                    }
                }
            }
        }
    }

    answer
}

fn merge_banner(lines: &[ClassifiedLine]) -> Answer {
    if lines.iter().any(ClassifiedLine::is_prompt) {
        Answer {
            mode: ParsingMode::Banner,
            value: AnswerValue::Empty,
            interrupt: None,
            complete: true,
        }
    } else {
        Answer::error("Unended banner", false)
    }
}

fn swallows_prompt(answer: &Answer, prompts: usize) -> bool {
    prompts == 1
        && matches!(&answer.value, AnswerValue::AddedBreakpoint(added) if added.awaiting_descriptor())
}

fn fail(answer: &mut Answer, message: String) {
    answer.mode = ParsingMode::Error;
    answer.value = AnswerValue::Error { message };
}

fn wrong_line(line: &ClassifiedLine, mode: ParsingMode) -> String {
    format!("Wrong answer line {:?} for mode {}", line.kind, mode)
}
