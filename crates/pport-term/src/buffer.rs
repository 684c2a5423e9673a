// SPDX-License-Identifier: MIT
//
// ScreenBuffer — the logical frame.
//
// The application paints a frame as an ordered list of lines, each an
// ordinary string that may carry SGR codes. There is no grid and no
// clipping here: widths are reconciled by the renderer when the frame is
// placed on the physical terminal. The buffer is cleared and repainted
// every cycle; the renderer keeps its own copy of what actually reached
// the screen.

/// An ordered list of styled lines plus a write cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenBuffer {
    lines: Vec<String>,
    row: usize,
}

impl ScreenBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            row: 0,
        }
    }

    /// Drop every line and move the write cursor back to row 0.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.row = 0;
    }

    /// Set the line at the current row without advancing.
    ///
    /// Rows skipped over by a cursor past the end are filled with empty
    /// lines so row indices always match positions.
    pub fn write(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.row < self.lines.len() {
            self.lines[self.row] = text;
        } else {
            self.lines.resize(self.row, String::new());
            self.lines.push(text);
        }
    }

    /// Set the line at the current row, then advance one row.
    pub fn writeln(&mut self, text: impl Into<String>) {
        self.write(text);
        self.row += 1;
    }

    /// The current write row.
    #[inline]
    #[must_use]
    pub const fn row(&self) -> usize {
        self.row
    }

    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[inline]
    #[must_use]
    pub fn line(&self, row: usize) -> Option<&str> {
        self.lines.get(row).map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_empty() {
        let buf = ScreenBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.row(), 0);
    }

    #[test]
    fn writeln_appends_and_advances() {
        let mut buf = ScreenBuffer::new();
        buf.writeln("one");
        buf.writeln("two");
        assert_eq!(buf.lines(), ["one", "two"]);
        assert_eq!(buf.row(), 2);
    }

    #[test]
    fn write_overwrites_current_row() {
        let mut buf = ScreenBuffer::new();
        buf.write("draft");
        buf.write("final");
        assert_eq!(buf.lines(), ["final"]);
        assert_eq!(buf.row(), 0);
    }

    #[test]
    fn write_after_writeln_targets_next_row() {
        let mut buf = ScreenBuffer::new();
        buf.writeln("header");
        buf.write("body");
        assert_eq!(buf.line(1), Some("body"));
        assert_eq!(buf.row(), 1);
    }

    #[test]
    fn clear_resets_lines_and_cursor() {
        let mut buf = ScreenBuffer::new();
        buf.writeln("a");
        buf.writeln("b");
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.row(), 0);
        buf.writeln("c");
        assert_eq!(buf.lines(), ["c"]);
    }

    #[test]
    fn line_out_of_range_is_none() {
        let buf = ScreenBuffer::new();
        assert_eq!(buf.line(3), None);
    }
}
