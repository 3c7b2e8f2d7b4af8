//! Shared data types for the wtmux protocol

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Number of hex characters in a session key fingerprint
const KEY_LEN: usize = 16;

/// Deterministic, fixed-length session identifier
///
/// Derived from an opaque logical identifier (typically a worktree
/// path). The same identifier always maps to the same key, across
/// restarts of the supervising application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    /// Derive the key for a logical work area identifier
    ///
    /// Pure function: SHA-256 of the identifier bytes, truncated to a
    /// 16-hex-character fingerprint.
    pub fn derive(workspace: &str) -> Self {
        let digest = hex::encode(Sha256::digest(workspace.as_bytes()));
        Self(digest[..KEY_LEN].to_string())
    }

    /// The fingerprint as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A self-contained snapshot of a session's visible buffer
///
/// Rendering a checkpoint onto a blank viewer reproduces the visible
/// buffer the capturing side held at capture time; no raw output
/// history is replayed. A newer capture supersedes the previous one,
/// it is never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Serialized visible buffer
    pub data: String,
    /// Unix timestamp (seconds) of capture
    pub captured_at: u64,
}

impl Checkpoint {
    /// Capture a checkpoint from serialized buffer contents
    pub fn new(data: String) -> Self {
        Self {
            data,
            captured_at: unix_now(),
        }
    }
}

/// Result of an attach call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachOutcome {
    /// Process id of the session's PTY; pass to write/resize/terminate
    pub process_id: Uuid,
    /// True if the process was freshly spawned for this attach
    pub is_new: bool,
    /// Last checkpoint of a resumed session, if one was captured
    ///
    /// On `is_new = false` the viewer must clear its local rendering
    /// and render this snapshot (when present) before resuming live
    /// output. On `is_new = true` it is always `None`; the viewer
    /// starts blank.
    pub checkpoint: Option<Checkpoint>,
}

/// Point-in-time description of a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub key: SessionKey,
    pub process_id: Uuid,
    /// Unix timestamp (seconds) of session creation
    pub created_at: u64,
    /// Number of currently attached viewers
    pub listeners: usize,
    /// Unix timestamp (seconds) of the last checkpoint, if any
    pub checkpoint_at: Option<u64>,
}

/// Current time as unix seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
