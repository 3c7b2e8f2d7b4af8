//! PTY handle wrapper for portable-pty

use std::io::{Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use portable_pty::{Child, MasterPty, PtySize};
use wtmux_utils::{Result, WtmuxError};

/// Handle to a running PTY process
///
/// Exclusively owned by its session; only the supervisor, through the
/// session, writes, resizes, or kills it.
pub struct PtyHandle {
    /// The master side of the PTY
    master: Arc<Mutex<Box<dyn MasterPty + Send>>>,
    /// The child process
    child: Arc<Mutex<Box<dyn Child + Send + Sync>>>,
    /// Reader for PTY output
    reader: Arc<Mutex<Box<dyn Read + Send>>>,
    /// Writer for PTY input
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl PtyHandle {
    pub(crate) fn new(
        master: Box<dyn MasterPty + Send>,
        child: Box<dyn Child + Send + Sync>,
        reader: Box<dyn Read + Send>,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            master: Arc::new(Mutex::new(master)),
            child: Arc::new(Mutex::new(child)),
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Write all bytes to the process, preserving arrival order
    pub fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        writer
            .write_all(data)
            .and_then(|_| writer.flush())
            .map_err(|e| WtmuxError::write(e.to_string()))
    }

    /// Read output from the process
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut reader = self.reader.lock();
        reader
            .read(buf)
            .map_err(|e| WtmuxError::pty(format!("Read failed: {}", e)))
    }

    /// Resize the PTY; advisory, the process may ignore it
    pub fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        let master = self.master.lock();
        master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| WtmuxError::resize(e.to_string()))
    }

    /// Check for process exit without blocking
    pub fn try_wait(&self) -> Result<Option<i32>> {
        let mut child = self.child.lock();
        match child.try_wait() {
            Ok(Some(status)) => Ok(Some(status.exit_code() as i32)),
            Ok(None) => Ok(None),
            Err(e) => Err(WtmuxError::pty(format!("Wait failed: {}", e))),
        }
    }

    /// Block until the process exits and return its status code
    pub fn wait(&self) -> Result<i32> {
        let mut child = self.child.lock();
        match child.wait() {
            Ok(status) => Ok(status.exit_code() as i32),
            Err(e) => Err(WtmuxError::pty(format!("Wait failed: {}", e))),
        }
    }

    /// Kill the child process
    pub fn kill(&self) -> Result<()> {
        let mut child = self.child.lock();
        child
            .kill()
            .map_err(|e| WtmuxError::pty(format!("Kill failed: {}", e)))
    }
}

impl std::fmt::Debug for PtyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyHandle").finish_non_exhaustive()
    }
}
