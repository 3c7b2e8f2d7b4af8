//! Error types for wtmux
//!
//! Provides a unified error type used across all wtmux crates.

/// Main error type for wtmux operations
#[derive(Debug, thiserror::Error)]
pub enum WtmuxError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // === Session Errors ===

    /// The process id does not refer to a live session. Write/resize/status
    /// against an expired id report this; it is never fatal.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // === PTY Errors ===

    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    #[error("PTY write failed: {0}")]
    Write(String),

    #[error("PTY resize failed: {0}")]
    Resize(String),

    #[error("PTY error: {0}")]
    Pty(String),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WtmuxError {
    /// Create a spawn error
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a resize error
    pub fn resize(msg: impl Into<String>) -> Self {
        Self::Resize(msg.into())
    }

    /// Create a PTY error
    pub fn pty(msg: impl Into<String>) -> Self {
        Self::Pty(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check whether this error leaves the session usable
    ///
    /// Write and resize failures are reported per call; the session stays
    /// live and the caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Write(_) | Self::Resize(_))
    }
}

/// Result type alias using WtmuxError
pub type Result<T> = std::result::Result<T, WtmuxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WtmuxError::SessionNotFound("deadbeef".into());
        assert_eq!(err.to_string(), "Session not found: deadbeef");
    }

    #[test]
    fn test_transient() {
        assert!(WtmuxError::write("pipe gone").is_transient());
        assert!(WtmuxError::resize("ioctl failed").is_transient());
        assert!(!WtmuxError::spawn("no such shell").is_transient());
        assert!(!WtmuxError::SessionNotFound("x".into()).is_transient());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: WtmuxError = io_err.into();
        assert!(matches!(err, WtmuxError::Io(_)));
    }
}
