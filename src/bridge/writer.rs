//! Writer task for the shell's stdin.
//!
//! A single task drains the outbound queue and writes each command line to
//! the shell, so writes from concurrent callers never interleave. When a
//! write fails the command in flight is rejected and the task stops, which
//! closes the queue for later senders.

use std::sync::{Arc, Mutex};

use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{BridgeError, LockResultExt};
use crate::session::SessionDriver;

/// Capacity of the outbound command queue.
///
/// The shell answers one command at a time, so only a handful of lines can
/// legitimately be queued (a command plus shutdown lines).
pub(crate) const OUTBOUND_QUEUE_CAPACITY: usize = 16;

/// Handle to the running writer task. Dropping it stops the task.
pub(crate) struct WriterTaskHandle {
    join_handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl WriterTaskHandle {
    /// Wait for the task to drain the queue and exit.
    ///
    /// The task only exits once every sender is gone or it was cancelled.
    pub(crate) async fn join(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.await {
                warn!(target: "xsdb_bridge::writer", "Writer task ended abnormally: {}", e);
            }
        }
    }

    pub(crate) fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for WriterTaskHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

pub(crate) fn spawn_writer_task<W>(
    writer: W,
    rx: mpsc::Receiver<String>,
    driver: Arc<Mutex<SessionDriver>>,
) -> WriterTaskHandle
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let cancel_token = CancellationToken::new();
    let join_handle = tokio::spawn(writer_loop(writer, rx, driver, cancel_token.clone()));

    WriterTaskHandle {
        join_handle: Some(join_handle),
        cancel_token,
    }
}

async fn writer_loop<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<String>,
    driver: Arc<Mutex<SessionDriver>>,
    cancel_token: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                debug!(target: "xsdb_bridge::writer", "Writer task cancelled, shutting down");
                break;
            }

            line = rx.recv() => {
                let Some(line) = line else {
                    debug!(target: "xsdb_bridge::writer", "Outbound queue closed");
                    break;
                };
                if let Err(e) = write_line(&mut writer, &line).await {
                    warn!(
                        target: "xsdb_bridge::writer",
                        "Write error: {}, failing command in flight",
                        e
                    );
                    if let Ok(mut driver) = driver.lock().recover_poison("writer_loop") {
                        driver.fail_command(BridgeError::outbound(format!("write failed: {}", e)));
                    }
                    break;
                }
            }
        }
    }

    // Closing stdin lets the shell see end of input.
    let _ = writer.shutdown().await;
}

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
