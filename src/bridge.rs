//! Async process bridge to a running XSDB shell.
//!
//! [`XsdbBridge`] owns the child process and three background tasks:
//!
//! - a stdout reader feeding the shared [`SessionDriver`],
//! - a stderr reader publishing [`ShellEvent::Stderr`],
//! - a writer draining the outbound command queue into stdin.
//!
//! Callers use [`XsdbBridge::send`], or the typed helpers in [`commands`].
//! A command gate serialises callers, so only one command is ever in flight
//! and callers queue instead of seeing `ChannelBusy`.

pub mod commands;
pub(crate) mod reader;
pub(crate) mod writer;

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};

use self::reader::{EventSink, ReaderTaskHandle, Stream, spawn_reader_task};
use self::writer::{OUTBOUND_QUEUE_CAPACITY, WriterTaskHandle, spawn_writer_task};
use crate::config::BridgeSettings;
use crate::error::{BridgeError, BridgeResult, LockResultExt};
use crate::protocol::Answer;
use crate::session::{SessionDriver, ShellEvent, dispatch};

pub use self::commands::BreakpointLocation;

/// Coarse lifecycle of the shell process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellState {
    /// Printing its banner
    Starting,
    Ready,
    Exited,
}

pub struct XsdbBridge {
    driver: Arc<Mutex<SessionDriver>>,
    outbound: mpsc::Sender<String>,
    state: watch::Receiver<ShellState>,
    events: Mutex<Option<mpsc::UnboundedReceiver<ShellEvent>>>,
    /// Serialises `send` callers
    gate: tokio::sync::Mutex<()>,
    child: tokio::sync::Mutex<Option<Child>>,
    settings: BridgeSettings,
    stdout_reader: ReaderTaskHandle,
    stderr_reader: Option<ReaderTaskHandle>,
    writer: tokio::sync::Mutex<WriterTaskHandle>,
}

impl std::fmt::Debug for XsdbBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XsdbBridge")
            .field("state", &*self.state.borrow())
            .field("xsdb_path", &self.settings.xsdb_path)
            .finish()
    }
}

impl XsdbBridge {
    /// Spawn the shell described by `settings` and start the I/O tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(settings: BridgeSettings) -> BridgeResult<Self> {
        let program = settings.xsdb_path.clone();
        let mut command = Command::new(&program);
        command
            .args(&settings.args)
            .envs(&settings.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| BridgeError::Spawn {
            program: program.clone(),
            source,
        })?;
        info!(
            target: "xsdb_bridge::shell",
            "Spawned {} {:?} (pid {:?})",
            program,
            settings.args,
            child.id()
        );

        let stdin = child.stdin.take().ok_or_else(|| missing_pipe(&program, "stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe(&program, "stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe(&program, "stderr"))?;

        let mut bridge = Self::attach(stdout, Some(stderr), stdin, SessionDriver::new(), settings);
        *bridge.child.get_mut() = Some(child);
        Ok(bridge)
    }

    /// Run a bridge over already-open streams.
    ///
    /// `driver` decides whether a banner is expected first
    /// ([`SessionDriver::new`]) or the shell is already at its prompt
    /// ([`SessionDriver::ready`]).
    pub fn attach<R, E, W>(
        stdout: R,
        stderr: Option<E>,
        stdin: W,
        driver: SessionDriver,
        settings: BridgeSettings,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let initial = if driver.is_ready() {
            ShellState::Ready
        } else {
            ShellState::Starting
        };
        let driver = Arc::new(Mutex::new(driver));
        let (state_tx, state_rx) = watch::channel(initial);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let sink = EventSink::new(events_tx, Arc::new(state_tx));

        let stdout_reader = spawn_reader_task(stdout, Stream::Stdout, driver.clone(), sink.clone());
        let stderr_reader =
            stderr.map(|stderr| spawn_reader_task(stderr, Stream::Stderr, driver.clone(), sink));
        let writer = spawn_writer_task(stdin, outbound_rx, driver.clone());

        Self {
            driver,
            outbound: outbound_tx,
            state: state_rx,
            events: Mutex::new(Some(events_rx)),
            gate: tokio::sync::Mutex::new(()),
            child: tokio::sync::Mutex::new(None),
            settings,
            stdout_reader,
            stderr_reader,
            writer: tokio::sync::Mutex::new(writer),
        }
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    pub fn state(&self) -> ShellState {
        *self.state.borrow()
    }

    /// Take the receiver of unsolicited events. Only the first call gets it.
    pub fn events(&self) -> Option<mpsc::UnboundedReceiver<ShellEvent>> {
        self.events
            .lock()
            .recover_poison("XsdbBridge::events")
            .ok()
            .and_then(|mut slot| slot.take())
    }

    /// Wait until the banner has finished.
    pub async fn wait_ready(&self) -> BridgeResult<()> {
        let mut state = self.state.clone();
        let reached = *state
            .wait_for(|state| *state != ShellState::Starting)
            .await
            .map_err(|_| BridgeError::ShellExited)?;
        match reached {
            ShellState::Exited => Err(BridgeError::ShellExited),
            _ => Ok(()),
        }
    }

    /// Send one command and wait for its answer.
    ///
    /// With `suppress_failure` an error answer is returned as a value
    /// instead of a [`BridgeError::Command`].
    pub async fn send(&self, command: &str, suppress_failure: bool) -> BridgeResult<Answer> {
        let _turn = self.gate.lock().await;
        self.wait_ready().await?;

        let rx = {
            let mut driver = self.driver.lock().recover_poison("XsdbBridge::send")?;
            let mut sink = self.outbound.clone();
            dispatch(&mut driver, &mut sink, command, suppress_failure)?
        };
        rx.await.map_err(|_| BridgeError::ShellExited)?
    }

    /// Run the configured start-up commands, tolerating their failures.
    pub async fn initialize(&self) -> BridgeResult<Vec<Answer>> {
        let mut answers = Vec::with_capacity(self.settings.init_commands.len());
        for command in &self.settings.init_commands {
            let answer = self.send(command, true).await?;
            if answer.is_error() {
                warn!(
                    target: "xsdb_bridge::shell",
                    "Start-up command '{}' failed, continuing",
                    command
                );
            }
            answers.push(answer);
        }
        Ok(answers)
    }

    /// Ask the shell to quit, then make sure it does.
    ///
    /// Sends `disconnect` and `exit`, waits up to the configured grace
    /// period, then terminates the process. Returns the exit status when the
    /// bridge owns the process.
    pub async fn shutdown(&self) -> BridgeResult<Option<ExitStatus>> {
        let grace = Duration::from_millis(self.settings.shutdown_timeout_ms);

        if self.state() == ShellState::Ready {
            match tokio::time::timeout(grace, self.send("disconnect", true)).await {
                Ok(Ok(_)) => debug!(target: "xsdb_bridge::shell", "Disconnected"),
                Ok(Err(e)) => debug!(target: "xsdb_bridge::shell", "disconnect failed: {}", e),
                Err(_) => debug!(target: "xsdb_bridge::shell", "disconnect timed out"),
            }
        }
        if let Err(e) = self.outbound.try_send("exit\n".to_string()) {
            debug!(target: "xsdb_bridge::shell", "Could not queue exit: {}", e);
        }

        let status = {
            let mut child = self.child.lock().await;
            match child.as_mut() {
                Some(child) => Some(wait_or_terminate(child, grace).await?),
                None => None,
            }
        };

        self.stdout_reader.cancel();
        if let Some(stderr_reader) = &self.stderr_reader {
            stderr_reader.cancel();
        }
        let mut writer = self.writer.lock().await;
        writer.cancel();
        writer.join().await;

        Ok(status)
    }
}

fn missing_pipe(program: &str, pipe: &str) -> BridgeError {
    BridgeError::Io(std::io::Error::other(format!(
        "{} was spawned without a {} pipe",
        program, pipe
    )))
}

/// Wait for a graceful exit, escalating to SIGTERM and then a kill.
async fn wait_or_terminate(child: &mut Child, grace: Duration) -> BridgeResult<ExitStatus> {
    if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
        return Ok(status?);
    }

    #[cfg(unix)]
    {
        send_sigterm(child);
        if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
            return Ok(status?);
        }
    }

    warn!(target: "xsdb_bridge::shell", "Shell did not exit, killing it");
    child.kill().await?;
    Ok(child.wait().await?)
}

#[cfg(unix)]
fn send_sigterm(child: &Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    debug!(target: "xsdb_bridge::shell", "Sending SIGTERM to {}", pid);
    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
        debug!(target: "xsdb_bridge::shell", "SIGTERM failed: {}", e);
    }
}
