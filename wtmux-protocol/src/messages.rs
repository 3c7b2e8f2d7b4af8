//! Viewer/core message types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AttachOutcome, SessionStatus};

/// Request/response operations a viewer transport sends to the core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ViewerRequest {
    /// Attach this viewer to the session for a logical work area,
    /// spawning the process if the key is unknown
    Attach {
        /// Opaque logical identifier (e.g. a worktree path)
        workspace: String,
        /// Caller-supplied viewer id; reattaching under the same id
        /// replaces the previous subscription
        viewer_id: String,
        cols: u16,
        rows: u16,
    },

    /// Send input bytes to the session's process
    Write { process_id: Uuid, data: Vec<u8> },

    /// Advisory geometry change; last write wins
    Resize {
        process_id: Uuid,
        cols: u16,
        rows: u16,
    },

    /// Query a live session
    Status { process_id: Uuid },

    /// Drop this viewer's subscription, capturing a checkpoint first
    Detach {
        process_id: Uuid,
        viewer_id: String,
    },

    /// Kill the session's process and remove it
    Terminate { process_id: Uuid },
}

/// Replies to [`ViewerRequest`]s
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ViewerResponse {
    /// Attach succeeded
    Attached(AttachOutcome),

    /// Write/resize/detach/terminate succeeded
    Ok,

    /// Status reply
    Status(SessionStatus),

    /// Operation failed; the session (if any) is unaffected unless
    /// the code says otherwise
    Error { code: ErrorCode, message: String },
}

/// Events pushed over a (session, viewer) channel
///
/// Output chunks stream until the terminal [`SessionEvent::Exited`],
/// which is delivered exactly once per viewer before the session is
/// removed from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A chunk of process output
    Output { process_id: Uuid, data: Vec<u8> },

    /// The process exited; no further output will follow
    Exited {
        process_id: Uuid,
        exit_code: i32,
    },
}

/// Error codes for failed operations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    /// Process failed to start; no session was created
    SpawnFailed,
    /// Unknown or expired process id
    SessionNotFound,
    /// OS-level write failed; session remains live
    WriteFailed,
    /// OS-level resize failed; session remains live
    ResizeFailed,
    InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_event_bincode_roundtrip() {
        let event = SessionEvent::Output {
            process_id: Uuid::new_v4(),
            data: b"hi\r\n".to_vec(),
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: SessionEvent = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_exit_event_is_not_an_error() {
        // Exit is informational; it carries a code, not an ErrorCode.
        let event = SessionEvent::Exited {
            process_id: Uuid::nil(),
            exit_code: 0,
        };
        match event {
            SessionEvent::Exited { exit_code, .. } => assert_eq!(exit_code, 0),
            _ => panic!("expected Exited"),
        }
    }
}
