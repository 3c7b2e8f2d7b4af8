//! Per-session output pump
//!
//! One background task per session reads PTY output and broadcasts it
//! to the session's listeners. The pump:
//! - reads in a blocking manner (via spawn_blocking)
//! - coalesces output, flushing on newline, size, or timeout
//! - feeds the session's screen mirror with exactly the chunks it
//!   delivers, so checkpoints match what viewers rendered
//! - captures periodic checkpoints while the session is live
//! - on process exit, reaps the status code, broadcasts one exit
//!   event, clears the listener table, and unregisters the session
//!
//! The pump's lifetime is bound to the session's cancellation token;
//! cancelling it is how shutdown stops reads before EOF.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use wtmux_protocol::SessionEvent;

use crate::config::CoreConfig;
use crate::session::{Session, SessionDirectory};

/// Read buffer size for PTY reads
const READ_BUFFER_SIZE: usize = 4096;

/// Pump tuning derived from [`CoreConfig`]
#[derive(Debug, Clone)]
pub(crate) struct PumpConfig {
    pub flush_timeout: Duration,
    pub max_chunk_bytes: usize,
    pub checkpoint_interval: Duration,
}

impl From<&CoreConfig> for PumpConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            flush_timeout: config.flush_timeout(),
            max_chunk_bytes: config.max_chunk_bytes,
            checkpoint_interval: config.checkpoint_interval(),
        }
    }
}

/// Result of one blocking PTY read
#[derive(Debug)]
enum ReadOutcome {
    /// Output bytes
    Data(Vec<u8>),
    /// The process exited with this status code
    Eof(i32),
    /// Read failed for a reason other than process exit
    Failed(String),
}

/// Reads one session's PTY output and fans it out
pub(crate) struct OutputPump {
    session: Arc<Session>,
    directory: Arc<SessionDirectory>,
    buffer: Vec<u8>,
    config: PumpConfig,
    last_data: Instant,
}

impl OutputPump {
    /// Start the pump task for a freshly spawned session
    pub(crate) fn spawn(
        session: Arc<Session>,
        directory: Arc<SessionDirectory>,
        config: PumpConfig,
    ) -> tokio::task::JoinHandle<()> {
        let pump = Self {
            buffer: Vec::with_capacity(config.max_chunk_bytes),
            last_data: Instant::now(),
            session,
            directory,
            config,
        };
        tokio::spawn(pump.run())
    }

    async fn run(mut self) {
        self.session.mark_live();
        info!(
            key = %self.session.key(),
            process_id = %self.session.process_id(),
            "Output pump started"
        );

        let (data_tx, mut data_rx) = mpsc::channel::<ReadOutcome>(16);
        tokio::spawn(blocking_reader(
            self.session.clone(),
            data_tx,
        ));

        let mut flush_tick = interval(self.config.flush_timeout);
        flush_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // First checkpoint one full interval in; nothing visible yet at t=0
        let mut checkpoint_tick = interval_at(
            Instant::now() + self.config.checkpoint_interval,
            self.config.checkpoint_interval,
        );
        checkpoint_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let cancel = self.session.cancel_token();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(key = %self.session.key(), "Pump cancelled");
                    self.flush();
                    self.finish(None);
                    return;
                }

                outcome = data_rx.recv() => {
                    match outcome {
                        Some(ReadOutcome::Data(data)) => {
                            self.buffer.extend_from_slice(&data);
                            self.last_data = Instant::now();
                            if self.should_flush() {
                                self.flush();
                            }
                        }
                        Some(ReadOutcome::Eof(code)) => {
                            debug!(key = %self.session.key(), code, "PTY EOF");
                            self.flush();
                            self.finish(Some(code));
                            return;
                        }
                        Some(ReadOutcome::Failed(e)) => {
                            error!(key = %self.session.key(), error = %e, "PTY read error");
                            self.flush();
                            let code = self
                                .session
                                .handle()
                                .try_wait()
                                .ok()
                                .flatten()
                                .unwrap_or(-1);
                            self.finish(Some(code));
                            return;
                        }
                        None => {
                            debug!(key = %self.session.key(), "Reader channel closed");
                            self.flush();
                            self.finish(None);
                            return;
                        }
                    }
                }

                _ = flush_tick.tick() => {
                    if !self.buffer.is_empty()
                        && self.last_data.elapsed() >= self.config.flush_timeout
                    {
                        self.flush();
                    }
                }

                _ = checkpoint_tick.tick() => {
                    self.session.capture_checkpoint();
                    trace!(key = %self.session.key(), "Periodic checkpoint captured");
                }
            }
        }
    }

    fn should_flush(&self) -> bool {
        self.buffer.len() >= self.config.max_chunk_bytes || self.buffer.contains(&b'\n')
    }

    /// Deliver the buffered output as one chunk
    ///
    /// The screen mirror sees the exact chunk listeners receive;
    /// clear-screen detection is per delivered chunk on both sides.
    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let data = std::mem::take(&mut self.buffer);
        self.buffer = Vec::with_capacity(self.config.max_chunk_bytes);

        self.session.apply_output(&data);

        let delivered = self.session.listeners().broadcast(&SessionEvent::Output {
            process_id: self.session.process_id(),
            data,
        });
        trace!(
            key = %self.session.key(),
            delivered,
            "Flushed output chunk"
        );
    }

    /// Tear the session down exactly once
    ///
    /// `code` is `Some` when the process was observed to exit; `None`
    /// on cancellation, where no exit event is owed.
    fn finish(self, code: Option<i32>) {
        if self.session.mark_exited() {
            if let Some(exit_code) = code {
                let delivered = self.session.listeners().broadcast(&SessionEvent::Exited {
                    process_id: self.session.process_id(),
                    exit_code,
                });
                debug!(
                    key = %self.session.key(),
                    exit_code,
                    delivered,
                    "Broadcast exit event"
                );
            }
        }

        self.session.listeners().clear();
        self.directory.unregister(&self.session);

        info!(
            key = %self.session.key(),
            process_id = %self.session.process_id(),
            "Output pump exiting"
        );
    }
}

/// Blocking read loop feeding the pump
///
/// Runs reads through spawn_blocking so the PTY's blocking reader
/// never stalls the runtime. Ends after EOF, a read failure, or
/// cancellation.
async fn blocking_reader(session: Arc<Session>, data_tx: mpsc::Sender<ReadOutcome>) {
    let cancel = session.cancel_token();
    loop {
        if cancel.is_cancelled() {
            trace!(key = %session.key(), "Blocking reader cancelled");
            return;
        }

        let read_session = session.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut buf = [0u8; READ_BUFFER_SIZE];
            match read_session.handle().read(&mut buf) {
                Ok(0) => ReadOutcome::Eof(reap_exit_code(&read_session)),
                Ok(n) => ReadOutcome::Data(buf[..n].to_vec()),
                Err(e) => {
                    // PTY reads surface process exit as pipe errors on
                    // some platforms
                    let msg = e.to_string();
                    if msg.contains("Broken pipe") || msg.contains("Input/output error") {
                        ReadOutcome::Eof(reap_exit_code(&read_session))
                    } else {
                        ReadOutcome::Failed(msg)
                    }
                }
            }
        })
        .await;

        match result {
            Ok(outcome) => {
                let is_terminal = matches!(outcome, ReadOutcome::Eof(_) | ReadOutcome::Failed(_));
                if data_tx.send(outcome).await.is_err() {
                    trace!(key = %session.key(), "Pump gone, reader exiting");
                    return;
                }
                if is_terminal {
                    return;
                }
            }
            Err(e) => {
                warn!(key = %session.key(), error = %e, "spawn_blocking failed");
                let _ = data_tx.send(ReadOutcome::Failed(e.to_string())).await;
                return;
            }
        }
    }
}

/// Wait for the exited child and collect its status code
fn reap_exit_code(session: &Session) -> i32 {
    match session.handle().wait() {
        Ok(code) => code,
        Err(e) => {
            warn!(key = %session.key(), error = %e, "Failed to reap exit code");
            -1
        }
    }
}
