//! Visible-buffer mirror
//!
//! Each session keeps a line-capped mirror of its visible output so
//! checkpoints can be captured without replaying raw history. The
//! mirror applies the same per-chunk clear-screen policy a renderer
//! applies, which keeps captures content-preserving: restoring a
//! checkpoint onto a blank buffer reproduces the buffer it was
//! captured from.
//!
//! Contents are held as raw bytes and decoded only when a snapshot is
//! taken. Viewers concatenate delivered chunks before rendering, so a
//! multibyte character split across a flush boundary is intact on
//! their side; decoding per chunk here would store it as replacement
//! characters and break capture fidelity.

use std::borrow::Cow;

/// Escape pair meaning "clear screen, move cursor to origin"
///
/// Emitted by full-screen programs when they repaint. Detection is per
/// delivered chunk; a pair split across two chunk boundaries is not
/// detected (known gap, deliberately left without a cross-chunk
/// buffering strategy).
pub const CLEAR_TO_ORIGIN: &str = "\x1b[2J\x1b[H";

/// Line-capped mirror of a session's visible output
#[derive(Debug)]
pub struct ScreenBuffer {
    /// Visible contents, raw escape sequences preserved
    buf: Vec<u8>,
    /// Maximum number of lines to retain
    max_lines: usize,
}

impl ScreenBuffer {
    /// Create an empty buffer holding at most `max_lines` lines
    pub fn new(max_lines: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_lines,
        }
    }

    /// Apply one delivered output chunk
    ///
    /// If the chunk contains the [`CLEAR_TO_ORIGIN`] pair, everything
    /// before and including the pair is discarded, the buffer resets,
    /// and only the remainder is kept; a single line break immediately
    /// after the clear is suppressed (cosmetic artifact of some
    /// full-screen programs). Otherwise the chunk is appended verbatim.
    pub fn apply_chunk(&mut self, chunk: &[u8]) {
        match rfind_subslice(chunk, CLEAR_TO_ORIGIN.as_bytes()) {
            Some(idx) => {
                let rest = &chunk[idx + CLEAR_TO_ORIGIN.len()..];
                let rest = rest
                    .strip_prefix(b"\r\n".as_slice())
                    .or_else(|| rest.strip_prefix(b"\n".as_slice()))
                    .unwrap_or(rest);
                self.buf.clear();
                self.buf.extend_from_slice(rest);
            }
            None => self.buf.extend_from_slice(chunk),
        }
        self.trim();
    }

    /// Replace the contents with a previously captured snapshot
    pub fn restore(&mut self, data: &str) {
        self.buf.clear();
        self.buf.extend_from_slice(data.as_bytes());
        self.trim();
    }

    /// The current visible contents, decoded
    pub fn contents(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buf)
    }

    /// Decode the contents for a checkpoint
    ///
    /// Decoding happens here, over the accumulated bytes, not per
    /// applied chunk.
    pub fn snapshot(&self) -> String {
        self.contents().into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of (possibly partial) lines currently held
    pub fn line_count(&self) -> usize {
        let newlines = self.buf.iter().filter(|&&b| b == b'\n').count();
        if self.buf.is_empty() || self.buf.ends_with(b"\n") {
            newlines
        } else {
            newlines + 1
        }
    }

    /// Drop oldest lines until back under the cap
    fn trim(&mut self) {
        while self.line_count() > self.max_lines {
            match self.buf.iter().position(|&b| b == b'\n') {
                Some(idx) => {
                    self.buf.drain(..=idx);
                }
                None => break,
            }
        }
    }
}

/// Index of the last occurrence of `needle` in `haystack`
fn rfind_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}
