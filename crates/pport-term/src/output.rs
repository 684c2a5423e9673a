// SPDX-License-Identifier: MIT
//
// One frame of pending terminal bytes.
//
// Cursor moves, row text and sync markers all land here first. Nothing
// reaches the terminal until the owner flushes, and then it goes out as
// a single `write_all`, so a half-drawn frame is never visible. An empty
// buffer flushes to nothing at all, not even a `flush()` call.

use std::io::{self, Write};

/// Room for a full 200-column screen of styled rows without regrowing.
const INITIAL_CAPACITY: usize = 16 * 1024;

/// Pending bytes for the next flush, plus a running total of what has
/// already gone out.
#[derive(Debug)]
pub struct OutputBuffer {
    pending: Vec<u8>,
    flushed: u64,
}

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(INITIAL_CAPACITY),
            flushed: 0,
        }
    }

    /// Bytes waiting for the next flush.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.pending
    }

    /// Bytes handed to writers over the lifetime of this buffer.
    #[inline]
    #[must_use]
    pub const fn total_flushed(&self) -> u64 {
        self.flushed
    }

    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.pending.extend_from_slice(s.as_bytes());
    }

    /// Drop pending bytes without writing them.
    #[inline]
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Send pending bytes to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush_stdout(&mut self) -> io::Result<()> {
        self.flush_to(&mut io::stdout().lock())
    }

    /// Send pending bytes to `w` in one write, then empty the buffer.
    ///
    /// On error the bytes stay pending.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        w.write_all(&self.pending)?;
        w.flush()?;
        self.flushed += self.pending.len() as u64;
        self.pending.clear();
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    /// No-op: bytes only leave through [`OutputBuffer::flush_to`].
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
