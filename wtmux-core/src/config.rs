//! Core configuration
//!
//! Constructed once by the host application and passed to
//! [`SessionManager::new`](crate::SessionManager::new). TOML-compatible
//! so hosts can embed a `[core]` table in their own config file.

use std::time::Duration;

use serde::Deserialize;
use wtmux_utils::{Result, WtmuxError};

/// Default buffer flush timeout in milliseconds
const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 50;

/// Default maximum buffered output before a forced flush
const DEFAULT_MAX_CHUNK_BYTES: usize = 16384;

/// Default periodic checkpoint interval in seconds
const DEFAULT_CHECKPOINT_INTERVAL_SECS: u64 = 30;

/// Default visible-buffer line cap per session
const DEFAULT_SCREEN_LINES: usize = 500;

/// Configuration for the session core
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Command spawned for each new session
    pub shell: String,
    /// Timeout before flushing buffered output to listeners
    pub flush_timeout_ms: u64,
    /// Maximum buffered output before a forced flush
    pub max_chunk_bytes: usize,
    /// Interval between periodic checkpoint captures
    pub checkpoint_interval_secs: u64,
    /// Maximum lines retained in a session's visible buffer
    pub screen_lines: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            flush_timeout_ms: DEFAULT_FLUSH_TIMEOUT_MS,
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            checkpoint_interval_secs: DEFAULT_CHECKPOINT_INTERVAL_SECS,
            screen_lines: DEFAULT_SCREEN_LINES,
        }
    }
}

impl CoreConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| WtmuxError::config(format!("Invalid config: {}", e)))
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }
}

/// The user's shell, falling back to /bin/sh
fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".into())
}
