//! Replays captured shell transcripts through the session driver.
//!
//! Each transcript is fed in every possible two-chunk split, so answers must
//! not depend on where the pipe happened to break the output.

use xsdb_bridge::protocol::{AnswerValue, InterruptKind};
use xsdb_bridge::session::{SessionDriver, ShellEvent, dispatch};
use xsdb_bridge::{Answer, BridgeError};

const BPLIST: &str = include_str!("fixtures/bplist.txt");
const RRD: &str = include_str!("fixtures/rrd.txt");
const BPADD: &str = include_str!("fixtures/bpadd.txt");
const TARGETS: &str = include_str!("fixtures/targets.txt");
const LOCALS: &str = include_str!("fixtures/locals.txt");

/// Send `command` on a ready driver and feed `chunks` as its output.
fn replay(command: &str, chunks: &[&[u8]]) -> (Result<Answer, BridgeError>, Vec<ShellEvent>) {
    let mut driver = SessionDriver::ready();
    let mut written: Vec<String> = Vec::new();
    let mut rx = dispatch(&mut driver, &mut written, command, false).expect("dispatch");
    assert_eq!(written, vec![format!("{}\n", command)]);

    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(driver.feed_stdout(chunk));
    }
    let result = rx.try_recv().expect("answer settled");
    assert!(!driver.is_busy());
    (result, events)
}

fn replay_every_split(command: &str, transcript: &str) -> Answer {
    let bytes = transcript.as_bytes();
    let (whole, _) = replay(command, &[bytes]);
    let whole = whole.expect("answer");

    for split in 1..bytes.len() {
        let (head, tail) = bytes.split_at(split);
        let (answer, events) = replay(command, &[head, tail]);
        assert_eq!(answer.expect("answer"), whole, "split at byte {}", split);
        assert!(events.is_empty(), "split at byte {}: {:?}", split, events);
    }
    whole
}

#[test]
fn breakpoint_listing_round_trips() {
    let answer = replay_every_split("bplist", BPLIST);
    let AnswerValue::Breakpoints(rows) = answer.value else {
        panic!("expected breakpoints, got {:?}", answer.value);
    };

    let summary: Vec<(u32, Option<u32>, &str, Option<u64>, bool)> = rows
        .iter()
        .map(|row| {
            (
                row.id,
                row.target,
                row.location.as_str(),
                row.address,
                row.enabled,
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (12, Some(19), "0x4D8", Some(0x4d8), true),
            (13, Some(17), "main", Some(0x110), true),
            (14, Some(17), "0x420", Some(0x420), true),
        ]
    );
    assert_eq!(rows[2].hit_count, Some(2));
    assert!(answer.complete);
}

#[test]
fn register_columns_are_split() {
    let answer = replay_every_split("rrd", RRD);
    let AnswerValue::Registers(registers) = answer.value else {
        panic!("expected registers, got {:?}", answer.value);
    };
    let parsed: Vec<(&str, &str, Option<u64>)> = registers
        .iter()
        .map(|r| (r.name.as_str(), r.raw.as_str(), r.value))
        .collect();
    assert_eq!(
        parsed,
        vec![
            ("r0", "N/A", None),
            ("r1", "N/A", None),
            ("sp", "00030020", Some(0x30020)),
            ("lr", "00000260", Some(0x260)),
        ]
    );
}

#[test]
fn breakpoint_add_survives_echoed_prompt() {
    let answer = replay_every_split("bpadd -addr &main", BPADD);
    let AnswerValue::AddedBreakpoint(added) = answer.value else {
        panic!("expected added breakpoint, got {:?}", answer.value);
    };
    assert_eq!(added.id, Some(15));
    assert_eq!(added.target, Some(6));
    assert_eq!(added.address, Some(0x4d8));
    assert_eq!(added.kind.as_deref(), Some("Hardware"));
}

#[test]
fn interleaved_notice_is_siphoned_from_listing() {
    let answer = replay_every_split("targets", TARGETS);

    let AnswerValue::Targets(targets) = &answer.value else {
        panic!("expected targets, got {:?}", answer.value);
    };
    let ids: Vec<u32> = targets.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 16]);

    let interrupt = answer.interrupt.expect("interrupt collected");
    assert_eq!(interrupt.kind(), InterruptKind::Stopped);
    assert_eq!(interrupt.target, 3);
    assert_eq!(interrupt.pc, 0x420);
    let location = interrupt.location().expect("source position");
    assert_eq!(location.file.as_deref(), Some("main.c"));
    assert_eq!(location.line, Some(12));
    let excerpt = interrupt.source_lines.last().expect("source excerpt");
    assert_eq!((excerpt.key.as_str(), excerpt.value.as_str()), ("12", "x++;"));
}

#[test]
fn interleaved_notice_is_siphoned_from_locals() {
    let answer = replay_every_split("locals", LOCALS);

    let AnswerValue::Locals(locals) = &answer.value else {
        panic!("expected locals, got {:?}", answer.value);
    };
    let names: Vec<&str> = locals.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["count", "w"]);

    let interrupt = answer.interrupt.expect("interrupt collected");
    assert_eq!(interrupt.target, 16);
    assert_eq!(interrupt.source_lines.len(), 2);
}

#[test]
fn idle_notice_survives_every_split() {
    let notice = "Info: core[23,0] (target 16) Stopped at 0x420 (Breakpoint)\n\
                  main() at main.c: 12\n\
                  12:   x++;\n\
                  xsdb% ";
    let bytes = notice.as_bytes();
    for split in 1..bytes.len() {
        let (head, tail) = bytes.split_at(split);
        let mut driver = SessionDriver::ready();
        let mut events = driver.feed_stdout(head);
        events.extend(driver.feed_stdout(tail));

        let [ShellEvent::Interrupt(interrupt)] = &events[..] else {
            panic!("split at byte {}: {:?}", split, events);
        };
        assert_eq!(interrupt.pc, 0x420, "split at byte {}", split);
        assert_eq!(interrupt.source_lines.len(), 2, "split at byte {}", split);
    }
}

#[test]
fn malformed_listing_rejects_the_command() {
    let (result, _) = replay("targets", &[b"  1  Versal xcvc1902\n???\nxsdb% "]);
    match result {
        Err(BridgeError::Command(err)) => {
            assert_eq!(err.command, "targets");
            assert_eq!(err.message, "Unexpected line: ???");
        }
        other => panic!("expected command failure, got {:?}", other),
    }
}

#[test]
fn digit_led_garbage_in_targets_is_not_a_row() {
    let (result, _) = replay("targets", &[b"  1  Versal xcvc1902\n12:   x++;\nxsdb% "]);
    match result {
        Err(BridgeError::Command(err)) => {
            assert_eq!(err.message, "Unexpected line: 12:   x++;");
        }
        other => panic!("expected command failure, got {:?}", other),
    }
}
