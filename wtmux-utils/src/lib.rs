//! wtmux-utils: Common utilities shared across wtmux crates
//!
//! This crate provides:
//! - Unified error types ([`WtmuxError`], [`Result`])
//! - Logging infrastructure ([`init_logging`], [`LogConfig`])

pub mod error;
pub mod logging;

// Re-export main types at crate root for convenience
pub use error::{Result, WtmuxError};
pub use logging::{init_logging, init_logging_with_config, LogConfig};
