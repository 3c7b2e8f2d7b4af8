//! PTY spawn configuration

use std::path::PathBuf;

/// Configuration for spawning a PTY process
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Command to run
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Working directory (inherited if unset)
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Initial geometry
    pub cols: u16,
    pub rows: u16,
}

impl PtyConfig {
    /// Create a config for the given command with default geometry
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            cols: 80,
            rows: 24,
        }
    }

    /// Append an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set the working directory
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the initial geometry
    pub fn with_size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = PtyConfig::command("sh")
            .with_arg("-c")
            .with_arg("true")
            .with_cwd("/tmp")
            .with_env("TERM", "xterm-256color")
            .with_size(120, 40);

        assert_eq!(config.command, "sh");
        assert_eq!(config.args, vec!["-c", "true"]);
        assert_eq!(config.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(config.env.len(), 1);
        assert_eq!((config.cols, config.rows), (120, 40));
    }

    #[test]
    fn test_default_geometry() {
        let config = PtyConfig::command("sh");
        assert_eq!((config.cols, config.rows), (80, 24));
    }
}
