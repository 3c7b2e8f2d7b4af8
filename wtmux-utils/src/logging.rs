//! Logging infrastructure for wtmux
//!
//! Provides unified logging setup using the tracing ecosystem.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{Result, WtmuxError};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level filter (e.g., "info", "debug", "wtmux=debug,tokio=warn")
    pub filter: String,
    /// Include span events (enter/exit)
    pub span_events: bool,
    /// Include file/line in logs
    pub file_line: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: std::env::var("WTMUX_LOG").unwrap_or_else(|_| "info".into()),
            span_events: false,
            file_line: false,
        }
    }
}

impl LogConfig {
    /// Create config for development (verbose)
    pub fn development() -> Self {
        Self {
            filter: "debug".into(),
            span_events: true,
            file_line: true,
        }
    }
}

/// Initialize logging with default configuration
///
/// Uses WTMUX_LOG env var for filter, defaults to "info"
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| WtmuxError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let fmt_layer = if config.span_events {
        fmt_layer.with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    } else {
        fmt_layer
    };

    let fmt_layer = if config.file_line {
        fmt_layer.with_file(true).with_line_number(true)
    } else {
        fmt_layer.with_file(false).with_line_number(false)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer.with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| WtmuxError::internal(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert!(!config.span_events);
        assert!(!config.file_line);
    }

    #[test]
    fn test_log_config_development() {
        let config = LogConfig::development();
        assert_eq!(config.filter, "debug");
        assert!(config.span_events);
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let config = LogConfig {
            filter: "wtmux=notalevel".into(),
            span_events: false,
            file_line: false,
        };
        assert!(init_logging_with_config(config).is_err());
    }
}
