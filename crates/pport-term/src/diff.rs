// SPDX-License-Identifier: MIT
//
// Differential line renderer.
//
// Instead of repainting the screen every tick, we remember the exact text
// last written to each terminal row and only rewrite rows whose new text
// differs. A chat screen redrawn twenty times a second usually changes one
// row (the input line, or the blinking cursor on it), so almost every tick
// costs a single cursor move and one line of output, and an idle tick
// costs nothing at all.
//
// The pipeline per frame:
//
//   1. The application paints a ScreenBuffer (ordered styled lines).
//   2. render() compares the terminal geometry with the one used last time.
//      A change means the terminal reflowed or cleared parts of itself, so
//      the cache is worthless: hard clear, forget every row.
//   3. Lines are placed onto terminal rows (top-down, or bottom-anchored
//      for Layout::Reverse) and each is clipped/padded to exactly the
//      terminal width with the ANSI-safe clipper.
//   4. Rows that differ from the cache are emitted as cursor move + text
//      into the OutputBuffer. Rows with nothing placed on them count as a
//      full-width blank, so a row that used to hold text gets blanked.
//   5. flush() writes the batch in one syscall, wrapped in synchronized
//      output so the terminal never shows a half-updated frame.

use std::io::{self, Write};

use log::debug;

use crate::ansi;
use crate::buffer::ScreenBuffer;
use crate::output::OutputBuffer;
use crate::terminal::Size;
use crate::text;

// ─── Layout ─────────────────────────────────────────────────────────────────

/// How frame lines map onto terminal rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Line *i* goes to row *i*; rows past the frame are blank.
    #[default]
    Normal,
    /// Bottom-anchored: line 0 on the last row, line 1 just above it, and
    /// so on upward until lines or rows run out. The renderer does not care
    /// what the order means; the chat client puts its input line first and
    /// the newest message second so history grows upward.
    Reverse,
}

/// Place `lines` onto `rows` terminal rows. Unfilled rows are empty.
fn place(lines: &[String], rows: usize, layout: Layout) -> Vec<&str> {
    let mut placed = vec![""; rows];
    match layout {
        Layout::Normal => {
            for (slot, line) in placed.iter_mut().zip(lines) {
                *slot = line;
            }
        }
        Layout::Reverse => {
            for (slot, line) in placed.iter_mut().rev().zip(lines) {
                *slot = line;
            }
        }
    }
    placed
}

// ─── RenderStats ─────────────────────────────────────────────────────────────

/// Statistics from a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Rows whose text changed and were rewritten.
    pub rows_written: usize,
    /// Rows identical to what is already on screen.
    pub rows_skipped: usize,
    /// Total bytes of output generated.
    pub bytes_written: usize,
    /// Whether a geometry change forced a clear and a full repaint.
    pub full_redraw: bool,
}

// ─── DiffRenderer ────────────────────────────────────────────────────────────

/// Row-level differential renderer.
///
/// # Usage
///
/// ```no_run
/// use pport_term::buffer::ScreenBuffer;
/// use pport_term::diff::{DiffRenderer, Layout};
/// use pport_term::terminal::Size;
///
/// let mut renderer = DiffRenderer::new();
/// let mut frame = ScreenBuffer::new();
/// frame.writeln("hello");
///
/// let stats = renderer.render(&frame, Size { cols: 80, rows: 24 }, Layout::Normal);
/// renderer.flush().unwrap();
/// assert!(stats.full_redraw);
/// ```
pub struct DiffRenderer {
    output: OutputBuffer,
    /// Exactly what each terminal row shows, already clipped to width.
    drawn: Vec<String>,
    /// Geometry used by the previous render. `None` before the first one.
    geometry: Option<Size>,
}

impl DiffRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: OutputBuffer::new(),
            drawn: Vec::new(),
            geometry: None,
        }
    }

    /// Reconcile the terminal with `frame` for the given geometry.
    ///
    /// Output accumulates in the internal buffer; call [`flush`](Self::flush)
    /// or [`flush_to`](Self::flush_to) to send it. When no row changed and
    /// the geometry is the same, no bytes are produced.
    pub fn render(&mut self, frame: &ScreenBuffer, size: Size, layout: Layout) -> RenderStats {
        self.output.clear();
        let mut stats = RenderStats::default();

        if self.geometry != Some(size) {
            debug!(
                "geometry {:?} -> {}x{}, full redraw",
                self.geometry, size.cols, size.rows
            );
            self.drawn.clear();
            self.geometry = Some(size);
            stats.full_redraw = true;
        }

        let cols = usize::from(size.cols);
        self.drawn.resize(usize::from(size.rows), String::new());

        let placed = place(frame.lines(), usize::from(size.rows), layout);
        let mut changed: Vec<u16> = Vec::new();

        for (y, line) in (0..size.rows).zip(&placed) {
            let clipped = text::clip_to_width(line, cols);
            let cached = &mut self.drawn[usize::from(y)];
            if *cached == clipped {
                stats.rows_skipped += 1;
            } else {
                *cached = clipped;
                changed.push(y);
            }
        }

        if stats.full_redraw || !changed.is_empty() {
            // Writes into a Vec-backed buffer cannot fail.
            ansi::begin_sync(&mut self.output).ok();
            if stats.full_redraw {
                ansi::hard_clear(&mut self.output).ok();
            }
            for &y in &changed {
                ansi::cursor_to(&mut self.output, 0, y).ok();
                self.output.push_str(&self.drawn[usize::from(y)]);
            }
            ansi::reset(&mut self.output).ok();
            ansi::end_sync(&mut self.output).ok();
        }

        stats.rows_written = changed.len();
        stats.bytes_written = self.output.len();
        stats
    }

    /// What each terminal row currently shows (for tests and debugging).
    #[must_use]
    pub fn drawn(&self) -> &[String] {
        &self.drawn
    }

    /// The geometry recorded by the last render.
    #[must_use]
    pub const fn geometry(&self) -> Option<Size> {
        self.geometry
    }

    /// The raw bytes from the last render (for tests and debugging).
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        self.output.as_bytes()
    }

    /// Bytes sent to the terminal since this renderer was created.
    #[must_use]
    pub const fn total_flushed(&self) -> u64 {
        self.output.total_flushed()
    }

    /// Write accumulated output to stdout and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush_stdout()
    }

    /// Write accumulated output to an arbitrary writer and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        self.output.flush_to(w)
    }

    /// Forget the screen so the next render clears and repaints everything.
    pub fn force_redraw(&mut self) {
        self.geometry = None;
        self.drawn.clear();
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
