//! PTY process supervision
//!
//! Pseudo-terminal creation and lifecycle using portable-pty for
//! cross-platform support. Each session exclusively owns one
//! [`PtyHandle`]; viewers never touch the process directly.

mod config;
mod handle;
pub(crate) mod pump;

pub use config::PtyConfig;
pub use handle::PtyHandle;

use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use wtmux_utils::{Result, WtmuxError};

/// Spawn a new PTY process with the given configuration
///
/// May block on the OS call and fails synchronously; the caller of
/// attach sees the failure directly and no session is registered.
pub fn spawn(config: &PtyConfig) -> Result<PtyHandle> {
    let pty_system = native_pty_system();

    let pair = pty_system
        .openpty(PtySize {
            rows: config.rows,
            cols: config.cols,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| WtmuxError::spawn(format!("Failed to open PTY: {}", e)))?;

    let mut cmd = CommandBuilder::new(&config.command);
    cmd.args(&config.args);

    if let Some(cwd) = &config.cwd {
        cmd.cwd(cwd);
    }

    for (key, value) in &config.env {
        cmd.env(key, value);
    }

    let child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| WtmuxError::spawn(format!("Failed to spawn: {}", e)))?;

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| WtmuxError::spawn(format!("Failed to clone reader: {}", e)))?;

    let writer = pair
        .master
        .take_writer()
        .map_err(|e| WtmuxError::spawn(format!("Failed to get writer: {}", e)))?;

    Ok(PtyHandle::new(pair.master, child, reader, writer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_echo() {
        let config = PtyConfig::command("echo").with_arg("hello");
        let handle = spawn(&config).unwrap();

        let code = handle.wait().unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_spawn_missing_binary_fails() {
        let config = PtyConfig::command("definitely-not-a-real-binary-wtmux");
        let result = spawn(&config);
        assert!(matches!(result, Err(WtmuxError::Spawn(_))));
    }

    #[test]
    fn test_pty_read_write() {
        // cat echoes its input back
        let config = PtyConfig::command("cat");
        let handle = spawn(&config).unwrap();

        handle.write_all(b"test\n").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(100));

        let mut buf = [0u8; 1024];
        let n = handle.read(&mut buf).unwrap();
        assert!(n > 0);

        handle.kill().unwrap();
    }

    #[test]
    fn test_pty_resize() {
        let config = PtyConfig::command("cat").with_size(80, 24);
        let handle = spawn(&config).unwrap();

        handle.resize(120, 40).unwrap();
        handle.kill().unwrap();
    }
}
