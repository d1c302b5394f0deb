//! Command Dispatcher.
//!
//! Picks the parsing mode a command's answer is read in, registers the
//! waiter with the driver and hands the command line to a sink.

use log::debug;
use tokio::sync::{mpsc, oneshot};

use super::driver::SessionDriver;
use super::pending::AnswerResult;
use crate::error::{BridgeError, BridgeResult};
use crate::protocol::ParsingMode;

/// Mode that governs the answer to `command`, from its leading verb.
pub fn mode_for_command(command: &str) -> ParsingMode {
    let mut words = command.split_whitespace();
    let Some(verb) = words.next() else {
        return ParsingMode::Waiting;
    };
    let args: Vec<&str> = words.collect();

    match (verb, args.as_slice()) {
        ("targets" | "ta", [first, ..]) if first.parse::<u32>().is_ok() => ParsingMode::Waiting,
        ("targets" | "ta", _) => ParsingMode::ListingTarget,
        ("bt" | "backtrace", _) => ParsingMode::ListingBacktrace,
        ("rrd", _) => ParsingMode::ListingRegister,
        ("mrd", _) => ParsingMode::ListingMemory,
        ("bplist", _) => ParsingMode::ListingBreakpoints,
        ("bpadd", _) => ParsingMode::AddingBreakpoint,
        ("dis" | "disassemble", _) => ParsingMode::ListingDisassembly,
        ("locals", []) => ParsingMode::ListingLocals,
        ("locals", ["-defs", ..]) => ParsingMode::ListingLocalsDef,
        ("locals", [_]) => ParsingMode::ListingLocals,
        ("locals", _) => ParsingMode::Waiting,
        ("print", _) => ParsingMode::ListingLocals,
        ("connect" | "version", _) => ParsingMode::WaitingForValue,
        _ => ParsingMode::Waiting,
    }
}

/// Destination for whole command lines.
pub trait CommandSink {
    fn send_line(&mut self, line: String) -> BridgeResult<()>;
}

/// Collects lines in memory, for replay and tests.
impl CommandSink for Vec<String> {
    fn send_line(&mut self, line: String) -> BridgeResult<()> {
        self.push(line);
        Ok(())
    }
}

/// Feeds the writer task's outbound queue without waiting.
impl CommandSink for mpsc::Sender<String> {
    fn send_line(&mut self, line: String) -> BridgeResult<()> {
        self.try_send(line).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => BridgeError::outbound("queue full"),
            mpsc::error::TrySendError::Closed(_) => BridgeError::outbound("writer stopped"),
        })
    }
}

/// Send `command` and return the receiver its answer will arrive on.
///
/// The waiter is registered before the line is written. If the sink
/// refuses the line the registration is withdrawn and the mode restored.
pub fn dispatch(
    driver: &mut SessionDriver,
    sink: &mut impl CommandSink,
    command: &str,
    suppress_failure: bool,
) -> BridgeResult<oneshot::Receiver<AnswerResult>> {
    let command = command.trim();
    let mode = mode_for_command(command);
    let rx = driver.begin_command(mode, command, suppress_failure)?;

    debug!(
        target: "xsdb_bridge::dispatch",
        "Sending '{}' (answer read as {})",
        command,
        mode
    );
    if let Err(err) = sink.send_line(format!("{}\n", command)) {
        driver.abort_command();
        return Err(err);
    }
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AnswerValue;
    use rstest::rstest;

    #[rstest]
    #[case::targets("targets", ParsingMode::ListingTarget)]
    #[case::targets_alias("ta", ParsingMode::ListingTarget)]
    #[case::targets_filter("targets -filter {name =~ \"core*\"}", ParsingMode::ListingTarget)]
    #[case::select_target("targets 16", ParsingMode::Waiting)]
    #[case::backtrace("bt", ParsingMode::ListingBacktrace)]
    #[case::registers("rrd", ParsingMode::ListingRegister)]
    #[case::memory("mrd 0x0 4", ParsingMode::ListingMemory)]
    #[case::breakpoints("bplist", ParsingMode::ListingBreakpoints)]
    #[case::add_breakpoint("bpadd -file main.c -line 12", ParsingMode::AddingBreakpoint)]
    #[case::disassemble("dis 0x260 8", ParsingMode::ListingDisassembly)]
    #[case::locals("locals", ParsingMode::ListingLocals)]
    #[case::locals_defs("locals -defs", ParsingMode::ListingLocalsDef)]
    #[case::one_local("locals count", ParsingMode::ListingLocals)]
    #[case::set_local("locals count 5", ParsingMode::Waiting)]
    #[case::print("print count", ParsingMode::ListingLocals)]
    #[case::connect("connect", ParsingMode::WaitingForValue)]
    #[case::resume("con", ParsingMode::Waiting)]
    #[case::padded("   bt  ", ParsingMode::ListingBacktrace)]
    #[case::empty("", ParsingMode::Waiting)]
    fn verb_table(#[case] command: &str, #[case] expected: ParsingMode) {
        assert_eq!(mode_for_command(command), expected);
    }

    fn ready_driver() -> SessionDriver {
        let mut driver = SessionDriver::new();
        driver.feed_stdout(b"xsdb% ");
        driver
    }

    #[tokio::test]
    async fn dispatch_writes_line_and_routes_answer() {
        let mut driver = ready_driver();
        let mut sink: Vec<String> = Vec::new();

        let rx = dispatch(&mut driver, &mut sink, "  mrd 0 4 ", false).unwrap();
        assert_eq!(sink, vec!["mrd 0 4\n"]);
        assert_eq!(driver.mode(), ParsingMode::ListingMemory);

        driver.feed_stdout(b"       0:   4A66260B\n       4:   4003C003\nxsdb% ");
        match rx.await.unwrap().unwrap().value {
            AnswerValue::Memory(words) => assert_eq!(words.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn busy_channel_writes_nothing() {
        let mut driver = ready_driver();
        let mut sink: Vec<String> = Vec::new();
        let _rx = dispatch(&mut driver, &mut sink, "targets", false).unwrap();

        let err = dispatch(&mut driver, &mut sink, "bt", false).unwrap_err();
        assert!(matches!(err, BridgeError::ChannelBusy { .. }));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn not_ready_writes_nothing() {
        let mut driver = SessionDriver::new();
        let mut sink: Vec<String> = Vec::new();
        let err = dispatch(&mut driver, &mut sink, "connect", true).unwrap_err();
        assert!(matches!(err, BridgeError::NotReady));
        assert!(sink.is_empty());
    }

    #[test]
    fn failed_write_rolls_back_registration() {
        let mut driver = ready_driver();
        let (mut tx, rx) = mpsc::channel::<String>(1);
        drop(rx);

        let err = dispatch(&mut driver, &mut tx, "targets", false).unwrap_err();
        assert!(matches!(err, BridgeError::Outbound { .. }));
        assert!(!driver.is_busy());
        assert_eq!(driver.mode(), ParsingMode::Waiting);
    }

    #[test]
    fn full_queue_is_reported() {
        let mut driver = ready_driver();
        let (mut tx, _rx) = mpsc::channel::<String>(1);
        tx.try_send("con\n".to_string()).unwrap();

        let err = dispatch(&mut driver, &mut tx, "stop", false).unwrap_err();
        assert_eq!(err.to_string(), "Outbound queue error: queue full");
    }
}
