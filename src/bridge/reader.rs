//! Reader tasks for the shell's stdout and stderr.
//!
//! Each task reads raw chunks from one stream and feeds them to the shared
//! [`SessionDriver`]. The driver settles pending commands itself; the events
//! it returns are published on the bridge's event channel.
//!
//! A notice printed while nothing is in flight is held by the driver until
//! its position lines stop arriving. The stdout task publishes it once the
//! stream has been quiet for [`IDLE_NOTICE_GRACE`].
//!
//! A task stops on EOF, on a read error, or when its handle is dropped.
//! When stdout ends the driver is finished, which rejects any command still
//! waiting and publishes [`ShellEvent::Exited`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use super::ShellState;
use crate::error::LockResultExt;
use crate::session::{SessionDriver, ShellEvent};

/// Bytes requested per read.
const READ_CHUNK_SIZE: usize = 4096;

/// Quiet time after which an open idle notice is published.
pub(crate) const IDLE_NOTICE_GRACE: Duration = Duration::from_millis(50);

/// Which pipe a reader task consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stream {
    Stdout,
    Stderr,
}

/// Publishes driver events and keeps the shell state in sync with them.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    events: mpsc::UnboundedSender<ShellEvent>,
    state: Arc<watch::Sender<ShellState>>,
}

impl EventSink {
    pub(crate) fn new(
        events: mpsc::UnboundedSender<ShellEvent>,
        state: Arc<watch::Sender<ShellState>>,
    ) -> Self {
        Self { events, state }
    }

    pub(crate) fn publish(&self, events: Vec<ShellEvent>) {
        for event in events {
            match event {
                ShellEvent::Ready => {
                    self.state.send_replace(ShellState::Ready);
                }
                ShellEvent::Exited => {
                    self.state.send_replace(ShellState::Exited);
                }
                _ => {}
            }
            // Nobody listening is fine; events are advisory.
            let _ = self.events.send(event);
        }
    }
}

/// Handle to a running reader task. Dropping it stops the task.
pub(crate) struct ReaderTaskHandle {
    _join_handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl ReaderTaskHandle {
    pub(crate) fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for ReaderTaskHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

pub(crate) fn spawn_reader_task<R>(
    reader: R,
    stream: Stream,
    driver: Arc<Mutex<SessionDriver>>,
    sink: EventSink,
) -> ReaderTaskHandle
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let cancel_token = CancellationToken::new();
    let join_handle = tokio::spawn(reader_loop(
        reader,
        stream,
        driver,
        sink,
        cancel_token.clone(),
    ));

    ReaderTaskHandle {
        _join_handle: join_handle,
        cancel_token,
    }
}

async fn reader_loop<R>(
    mut reader: R,
    stream: Stream,
    driver: Arc<Mutex<SessionDriver>>,
    sink: EventSink,
    cancel_token: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let idle_flush = sleep(IDLE_NOTICE_GRACE);
    tokio::pin!(idle_flush);
    let mut notice_open = false;

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                debug!(
                    target: "xsdb_bridge::reader",
                    "{:?} reader cancelled, shutting down",
                    stream
                );
                return;
            }

            result = reader.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!(target: "xsdb_bridge::reader", "{:?} reached EOF", stream);
                        break;
                    }
                    Ok(n) => {
                        notice_open = feed(&driver, &sink, stream, &buf[..n]);
                        if notice_open {
                            idle_flush.as_mut().reset(Instant::now() + IDLE_NOTICE_GRACE);
                        }
                    }
                    Err(e) => {
                        warn!(
                            target: "xsdb_bridge::reader",
                            "{:?} read error: {}, treating as end of stream",
                            stream,
                            e
                        );
                        break;
                    }
                }
            }

            _ = &mut idle_flush, if notice_open => {
                notice_open = false;
                flush_idle(&driver, &sink);
            }
        }
    }

    if stream == Stream::Stdout {
        let events = match driver.lock().recover_poison("reader_loop finish") {
            Ok(mut driver) => driver.finish(),
            Err(_) => vec![ShellEvent::Exited],
        };
        sink.publish(events);
    }
}

/// Feed one chunk; returns whether the driver now holds an idle notice.
fn feed(driver: &Mutex<SessionDriver>, sink: &EventSink, stream: Stream, chunk: &[u8]) -> bool {
    let (events, notice_open) = match driver.lock().recover_poison("reader_loop feed") {
        Ok(mut driver) => match stream {
            Stream::Stdout => (driver.feed_stdout(chunk), driver.holds_idle_notice()),
            Stream::Stderr => (driver.feed_stderr(chunk), false),
        },
        Err(e) => {
            warn!(target: "xsdb_bridge::reader", "Dropping output: {}", e);
            return false;
        }
    };
    sink.publish(events);
    notice_open
}

fn flush_idle(driver: &Mutex<SessionDriver>, sink: &EventSink) {
    let events = match driver.lock().recover_poison("reader_loop flush") {
        Ok(mut driver) => driver.flush_idle(),
        Err(e) => {
            warn!(target: "xsdb_bridge::reader", "Dropping idle notice: {}", e);
            return;
        }
    };
    sink.publish(events);
}
