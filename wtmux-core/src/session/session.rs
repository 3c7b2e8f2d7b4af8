//! A single PTY session

use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use wtmux_protocol::{unix_now, Checkpoint, SessionKey, SessionStatus};
use wtmux_utils::Result;

use crate::pty::PtyHandle;
use crate::screen::ScreenBuffer;
use crate::ListenerTable;

/// Lifecycle state of a session
///
/// Created -> Live -> Exited, never backwards. A session that has
/// exited is replaced by a fresh one; it is never resurrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Registered, output pump not yet running
    Created = 0,
    /// Output pump running, process presumed alive
    Live = 1,
    /// Process exit observed, teardown under way or done
    Exited = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Live,
            _ => Self::Exited,
        }
    }
}

/// One live PTY process and everything scoped to it
///
/// The session exclusively owns its [`PtyHandle`]; viewers interact
/// with the process only through the manager's relay operations. The
/// listener table and screen mirror are per session and die with it.
pub struct Session {
    key: SessionKey,
    process_id: Uuid,
    handle: PtyHandle,
    listeners: ListenerTable,
    screen: Mutex<ScreenBuffer>,
    checkpoint: Mutex<Option<Checkpoint>>,
    state: AtomicU8,
    cancel: CancellationToken,
    created_at: u64,
}

impl Session {
    pub fn new(key: SessionKey, handle: PtyHandle, screen_lines: usize) -> Self {
        Self {
            key,
            process_id: Uuid::new_v4(),
            handle,
            listeners: ListenerTable::new(),
            screen: Mutex::new(ScreenBuffer::new(screen_lines)),
            checkpoint: Mutex::new(None),
            state: AtomicU8::new(SessionState::Created as u8),
            cancel: CancellationToken::new(),
            created_at: unix_now(),
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Stable identifier for this session's process epoch
    ///
    /// A respawn under the same key gets a fresh process id, so stale
    /// ids from before an exit never address the new process.
    pub fn process_id(&self) -> Uuid {
        self.process_id
    }

    pub fn listeners(&self) -> &ListenerTable {
        &self.listeners
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn handle(&self) -> &PtyHandle {
        &self.handle
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the output pump without waiting for EOF
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Created -> Live, once the pump is running
    pub(crate) fn mark_live(&self) {
        let _ = self.state.compare_exchange(
            SessionState::Created as u8,
            SessionState::Live as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Latch the exited state; returns `true` for exactly one caller
    ///
    /// The winner owes the exit broadcast, so it is delivered at most
    /// once no matter how teardown and EOF interleave.
    pub(crate) fn mark_exited(&self) -> bool {
        self.state.swap(SessionState::Exited as u8, Ordering::AcqRel)
            != SessionState::Exited as u8
    }

    /// Relay input bytes to the process
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.handle.write_all(data)
    }

    /// Relay a terminal resize to the process
    pub fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        self.handle.resize(cols, rows)
    }

    pub(crate) fn kill(&self) -> Result<()> {
        self.handle.kill()
    }

    /// Fold one delivered output chunk into the screen mirror
    ///
    /// Must be called with exactly the chunks listeners receive, so a
    /// later checkpoint reflects what viewers rendered.
    pub(crate) fn apply_output(&self, chunk: &[u8]) {
        self.screen.lock().apply_chunk(chunk);
    }

    /// Capture a checkpoint of the current visible buffer
    ///
    /// The new capture supersedes any previous one.
    pub fn capture_checkpoint(&self) -> Checkpoint {
        let snapshot = self.screen.lock().snapshot();
        let checkpoint = Checkpoint::new(snapshot);
        *self.checkpoint.lock() = Some(checkpoint.clone());
        checkpoint
    }

    /// The most recent checkpoint, if one has been captured
    pub fn last_checkpoint(&self) -> Option<Checkpoint> {
        self.checkpoint.lock().clone()
    }

    pub fn to_status(&self) -> SessionStatus {
        SessionStatus {
            key: self.key.clone(),
            process_id: self.process_id,
            created_at: self.created_at,
            listeners: self.listeners.len(),
            checkpoint_at: self.checkpoint.lock().as_ref().map(|c| c.captured_at),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("process_id", &self.process_id)
            .field("state", &self.state())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::{self, PtyConfig};

    fn cat_session() -> Session {
        let handle = pty::spawn(&PtyConfig::command("cat")).unwrap();
        Session::new(SessionKey::derive("wt-test"), handle, 100)
    }

    #[test]
    fn test_state_progression() {
        let session = cat_session();
        assert_eq!(session.state(), SessionState::Created);

        session.mark_live();
        assert_eq!(session.state(), SessionState::Live);

        assert!(session.mark_exited());
        assert_eq!(session.state(), SessionState::Exited);

        session.kill().unwrap();
    }

    #[test]
    fn test_mark_exited_latches_once() {
        let session = cat_session();
        session.mark_live();

        assert!(session.mark_exited());
        assert!(!session.mark_exited());
        assert!(!session.mark_exited());

        session.kill().unwrap();
    }

    #[test]
    fn test_mark_live_does_not_resurrect() {
        let session = cat_session();
        session.mark_exited();
        session.mark_live();
        assert_eq!(session.state(), SessionState::Exited);

        session.kill().unwrap();
    }

    #[test]
    fn test_checkpoint_reflects_applied_output() {
        let session = cat_session();
        assert!(session.last_checkpoint().is_none());

        session.apply_output(b"$ make\nok\n");
        let cp = session.capture_checkpoint();
        assert!(cp.data.contains("ok"));
        assert_eq!(session.last_checkpoint().unwrap().data, cp.data);

        session.kill().unwrap();
    }

    #[test]
    fn test_status_snapshot() {
        let session = cat_session();
        let status = session.to_status();
        assert_eq!(status.key, *session.key());
        assert_eq!(status.process_id, session.process_id());
        assert_eq!(status.listeners, 0);
        assert!(status.checkpoint_at.is_none());

        session.capture_checkpoint();
        assert!(session.to_status().checkpoint_at.is_some());

        session.kill().unwrap();
    }
}
