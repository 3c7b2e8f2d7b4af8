//! Session registry and manager
//!
//! The [`SessionManager`] is the single entry point for every session
//! operation: attach, input, resize, status, detach, terminate. It
//! owns the registry mapping session keys to live sessions and keeps
//! the key -> session binding unique.

use std::path::Path;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use wtmux_protocol::{AttachOutcome, SessionEvent, SessionKey, SessionStatus};
use wtmux_utils::{Result, WtmuxError};

use crate::config::CoreConfig;
use crate::pty::{self, pump::OutputPump, pump::PumpConfig, PtyConfig};
use crate::session::Session;

/// Registry of live sessions, shared with the output pumps
///
/// `sessions` is the authoritative key -> session binding; `by_process`
/// is a secondary index letting relay operations address a session by
/// the process id handed out at attach time.
#[derive(Debug, Default)]
pub(crate) struct SessionDirectory {
    sessions: DashMap<SessionKey, Arc<Session>>,
    by_process: DashMap<Uuid, SessionKey>,
}

impl SessionDirectory {
    /// Remove a session, freeing its key for a fresh spawn
    ///
    /// Guarded by process id so that when a newer session already
    /// occupies the key, a late unregister of the old one leaves the
    /// newcomer untouched. Idempotent.
    pub(crate) fn unregister(&self, session: &Session) {
        let removed = self
            .sessions
            .remove_if(session.key(), |_, live| {
                live.process_id() == session.process_id()
            })
            .is_some();
        self.by_process.remove(&session.process_id());

        if removed {
            debug!(
                key = %session.key(),
                process_id = %session.process_id(),
                "Unregistered session"
            );
        }
    }

    fn lookup(&self, process_id: Uuid) -> Option<Arc<Session>> {
        let key = self.by_process.get(&process_id)?.value().clone();
        let session = self.sessions.get(&key)?.value().clone();
        // Stale index entry from a superseded session
        if session.process_id() != process_id {
            return None;
        }
        Some(session)
    }
}

/// Front door for all session operations
///
/// Cheap to clone; clones share the registry. Transports hold one and
/// call into it per request.
#[derive(Debug, Clone)]
pub struct SessionManager {
    inner: Arc<SessionDirectory>,
    config: CoreConfig,
}

impl SessionManager {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            inner: Arc::new(SessionDirectory::default()),
            config,
        }
    }

    /// Attach a viewer to the session for a logical work area
    ///
    /// Resolves the work area to its session key, reusing the live
    /// session under that key or spawning a fresh shell when there is
    /// none. Concurrent attaches for the same key are serialized on
    /// the registry entry, so exactly one process is spawned and every
    /// caller gets the same process id. Attaches for unrelated keys
    /// do not wait on each other.
    ///
    /// The viewer id is the subscription handle: attaching again under
    /// an id already subscribed atomically replaces the old channel.
    pub fn attach(
        &self,
        workspace: &str,
        viewer_id: &str,
        cols: u16,
        rows: u16,
        sender: mpsc::Sender<SessionEvent>,
    ) -> Result<AttachOutcome> {
        let key = SessionKey::derive(workspace);

        let mut spawned = None;
        let (session, is_new) = match self.inner.sessions.entry(key.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                // Spawn under the entry lock: a concurrent attach for
                // the same key blocks here and then finds the session.
                // A spawn failure inserts nothing.
                let session = self.spawn_session(key.clone(), workspace, cols, rows)?;
                self.inner
                    .by_process
                    .insert(session.process_id(), key.clone());
                entry.insert(session.clone());
                spawned = Some(session.clone());
                (session, true)
            }
        };

        // Subscribe before the pump runs: a process that exits
        // immediately must still deliver its exit event to the viewer
        // that spawned it
        session.listeners().attach(viewer_id, sender);

        // Start the pump outside the entry borrow; it may unregister
        // the session as soon as it runs
        if let Some(session) = spawned {
            OutputPump::spawn(session, self.inner.clone(), PumpConfig::from(&self.config));
        }

        let checkpoint = if is_new {
            None
        } else {
            session.last_checkpoint()
        };

        info!(
            key = %key,
            process_id = %session.process_id(),
            viewer_id = %viewer_id,
            is_new,
            "Viewer attached"
        );

        Ok(AttachOutcome {
            process_id: session.process_id(),
            is_new,
            checkpoint,
        })
    }

    fn spawn_session(
        &self,
        key: SessionKey,
        workspace: &str,
        cols: u16,
        rows: u16,
    ) -> Result<Arc<Session>> {
        let mut pty_config = PtyConfig::command(&self.config.shell).with_size(cols, rows);

        // Start the shell in the work area when it is a real directory;
        // opaque identifiers fall back to the inherited cwd
        let path = Path::new(workspace);
        if path.is_dir() {
            pty_config = pty_config.with_cwd(path);
        }

        let handle = pty::spawn(&pty_config)?;
        info!(key = %key, shell = %self.config.shell, "Spawned session process");

        Ok(Arc::new(Session::new(
            key,
            handle,
            self.config.screen_lines,
        )))
    }

    /// Relay input bytes to a session's process, in arrival order
    pub fn write(&self, process_id: Uuid, data: &[u8]) -> Result<()> {
        let session = self.require(process_id)?;
        session.write(data)
    }

    /// Relay a terminal resize to a session's process
    pub fn resize(&self, process_id: Uuid, cols: u16, rows: u16) -> Result<()> {
        let session = self.require(process_id)?;
        session.resize(cols, rows)
    }

    /// Point-in-time status of a live session
    pub fn status(&self, process_id: Uuid) -> Result<SessionStatus> {
        let session = self.require(process_id)?;
        Ok(session.to_status())
    }

    /// Unsubscribe a viewer, capturing a checkpoint first
    ///
    /// The session and its process keep running; the captured
    /// checkpoint is what a later reattach resumes from. Detaching
    /// from a session that is already gone is a no-op.
    pub fn detach(&self, process_id: Uuid, viewer_id: &str) -> Result<()> {
        let Some(session) = self.inner.lookup(process_id) else {
            debug!(%process_id, viewer_id = %viewer_id, "Detach from absent session ignored");
            return Ok(());
        };

        session.capture_checkpoint();
        session.listeners().detach(viewer_id);
        Ok(())
    }

    /// Kill a session's process and free its key immediately
    ///
    /// The exit event and listener cleanup follow from the output pump
    /// when it observes EOF. Idempotent: terminating an id that is
    /// already gone succeeds.
    pub fn terminate(&self, process_id: Uuid) -> Result<()> {
        let Some(session) = self.inner.lookup(process_id) else {
            debug!(%process_id, "Terminate of absent session ignored");
            return Ok(());
        };

        if let Err(e) = session.kill() {
            warn!(key = %session.key(), error = %e, "Kill failed, unregistering anyway");
        }
        self.inner.unregister(&session);
        info!(key = %session.key(), %process_id, "Session terminated");
        Ok(())
    }

    /// Tear down every session; never fails
    ///
    /// For application shutdown. Kills each process, stops its pump,
    /// clears its listeners, and empties the registry, continuing past
    /// individual failures.
    pub fn cleanup_all(&self) {
        let sessions: Vec<Arc<Session>> = self
            .inner
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        info!(count = sessions.len(), "Cleaning up all sessions");
        for session in sessions {
            if let Err(e) = session.kill() {
                warn!(key = %session.key(), error = %e, "Kill failed during cleanup");
            }
            session.cancel();
            session.listeners().clear();
            self.inner.unregister(&session);
        }
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    fn require(&self, process_id: Uuid) -> Result<Arc<Session>> {
        self.inner
            .lookup(process_id)
            .ok_or_else(|| WtmuxError::SessionNotFound(process_id.to_string()))
    }
}
