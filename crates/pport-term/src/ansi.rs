// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`, plus a
// tiny `Style` type for building styled strings that later flow through
// the line renderer. Nothing here decides *when* to emit; the renderer
// and the terminal handle own that.
//
// Cursor positions are 0-indexed in our API and converted to 1-indexed
// for the terminal (ANSI CUP is 1-based).
use std::io::{self, Write};

use bitflags::bitflags;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` using the CUP (Cursor Position) sequence.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes to terminal defaults (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Hard reset used when the geometry changes: clear, home, SGR 0.
pub fn hard_clear(w: &mut impl Write) -> io::Result<()> {
    clear_screen(w)?;
    cursor_to(w, 0, 0)?;
    reset(w)
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC Private Mode 2026).
///
/// The terminal buffers everything until [`end_sync`], so a frame that
/// rewrites several rows never shows half-drawn.
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

/// End synchronized output.
#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Alternate Screen ───────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC Private Mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen buffer and restore the shell's content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Color ──────────────────────────────────────────────────────────────────

/// A terminal foreground color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    /// The terminal's own default.
    #[default]
    Default,
    /// Palette index. 0–7 standard, 8–15 bright, 16–255 extended.
    Ansi256(u8),
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),
}

impl Color {
    pub const RED: Self = Self::Ansi256(1);
    pub const MAGENTA: Self = Self::Ansi256(5);
    pub const CYAN: Self = Self::Ansi256(6);
}

/// Set the foreground (text) color.
///
/// Compact SGR codes for standard colors (30–37, 90–97), the 256-color
/// form for 16–255, and 24-bit form for RGB.
pub fn fg(w: &mut impl Write, color: Color) -> io::Result<()> {
    match color {
        Color::Default => w.write_all(b"\x1b[39m"),
        Color::Ansi256(idx) => {
            if idx < 8 {
                write!(w, "\x1b[{}m", 30 + u16::from(idx))
            } else if idx < 16 {
                write!(w, "\x1b[{}m", 82 + u16::from(idx))
            } else {
                write!(w, "\x1b[38;5;{idx}m")
            }
        }
        Color::Rgb(r, g, b) => write!(w, "\x1b[38;2;{r};{g};{b}m"),
    }
}

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags! {
    /// Text attributes as SGR parameters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1.
        const BOLD      = 1 << 0;
        /// SGR 2.
        const DIM       = 1 << 1;
        /// SGR 3.
        const ITALIC    = 1 << 2;
        /// SGR 4.
        const UNDERLINE = 1 << 3;
        /// SGR 7.
        const INVERSE   = 1 << 4;
    }
}

/// Emit SGR codes for text attributes as a single CSI sequence.
///
/// `\x1b[1;3m` for bold + italic. Does nothing if no attributes are set.
pub fn attrs(w: &mut impl Write, attr: Attr) -> io::Result<()> {
    if attr.is_empty() {
        return Ok(());
    }

    let codes: Vec<&str> = [
        (Attr::BOLD, "1"),
        (Attr::DIM, "2"),
        (Attr::ITALIC, "3"),
        (Attr::UNDERLINE, "4"),
        (Attr::INVERSE, "7"),
    ]
    .iter()
    .filter(|(flag, _)| attr.contains(*flag))
    .map(|(_, code)| *code)
    .collect();

    write!(w, "\x1b[{}m", codes.join(";"))
}

// ─── Style ──────────────────────────────────────────────────────────────────

/// Foreground color plus attributes, applied to a run of text.
///
/// `paint` wraps the text in the opening SGR codes and a closing reset so
/// the styled run can be embedded inside a larger line. The line renderer
/// treats those codes as zero-width and carries the trailing reset through
/// clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Color,
    pub attrs: Attr,
}

impl Style {
    #[must_use]
    pub const fn fg(color: Color) -> Self {
        Self {
            fg: color,
            attrs: Attr::empty(),
        }
    }

    #[must_use]
    pub const fn with_attrs(mut self, attrs: Attr) -> Self {
        self.attrs = attrs;
        self
    }

    /// Whether this style emits nothing.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.fg == Color::Default && self.attrs.is_empty()
    }

    /// Wrap `text` in this style's escape codes.
    #[must_use]
    pub fn paint(&self, text: &str) -> String {
        if self.is_plain() {
            return text.to_owned();
        }
        let mut out = Vec::with_capacity(text.len() + 24);
        // Writes into a Vec cannot fail.
        attrs(&mut out, self.attrs).ok();
        if self.fg != Color::Default {
            fg(&mut out, self.fg).ok();
        }
        out.extend_from_slice(text.as_bytes());
        reset(&mut out).ok();
        String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: run an ANSI function and return its output as a string.
    fn emit<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    #[test]
    fn cursor_to_origin() {
        assert_eq!(emit(|w| cursor_to(w, 0, 0)), "\x1b[1;1H");
    }

    #[test]
    fn cursor_to_position() {
        assert_eq!(emit(|w| cursor_to(w, 10, 20)), "\x1b[21;11H");
    }

    #[test]
    fn cursor_to_max_does_not_overflow() {
        assert_eq!(emit(|w| cursor_to(w, u16::MAX, u16::MAX)), "\x1b[65536;65536H");
    }

    #[test]
    fn cursor_visibility() {
        assert_eq!(emit(|w| cursor_hide(w)), "\x1b[?25l");
        assert_eq!(emit(|w| cursor_show(w)), "\x1b[?25h");
    }

    // ── Screen ──────────────────────────────────────────────────────────

    #[test]
    fn hard_clear_is_clear_home_reset() {
        assert_eq!(emit(|w| hard_clear(w)), "\x1b[2J\x1b[1;1H\x1b[0m");
    }

    #[test]
    fn sync_markers() {
        assert_eq!(emit(|w| begin_sync(w)), "\x1b[?2026h");
        assert_eq!(emit(|w| end_sync(w)), "\x1b[?2026l");
    }

    #[test]
    fn alt_screen() {
        assert_eq!(emit(|w| enter_alt_screen(w)), "\x1b[?1049h");
        assert_eq!(emit(|w| exit_alt_screen(w)), "\x1b[?1049l");
    }

    // ── Color ───────────────────────────────────────────────────────────

    #[test]
    fn fg_default() {
        assert_eq!(emit(|w| fg(w, Color::Default)), "\x1b[39m");
    }

    #[test]
    fn fg_standard_magenta() {
        assert_eq!(emit(|w| fg(w, Color::MAGENTA)), "\x1b[35m");
    }

    #[test]
    fn fg_bright_red() {
        assert_eq!(emit(|w| fg(w, Color::Ansi256(9))), "\x1b[91m");
    }

    #[test]
    fn fg_extended() {
        assert_eq!(emit(|w| fg(w, Color::Ansi256(200))), "\x1b[38;5;200m");
    }

    #[test]
    fn fg_rgb() {
        assert_eq!(emit(|w| fg(w, Color::Rgb(255, 128, 0))), "\x1b[38;2;255;128;0m");
    }

    // ── Attributes ──────────────────────────────────────────────────────

    #[test]
    fn attrs_empty_emits_nothing() {
        assert_eq!(emit(|w| attrs(w, Attr::empty())), "");
    }

    #[test]
    fn attrs_combined() {
        assert_eq!(emit(|w| attrs(w, Attr::BOLD | Attr::ITALIC)), "\x1b[1;3m");
        assert_eq!(emit(|w| attrs(w, Attr::DIM | Attr::INVERSE)), "\x1b[2;7m");
    }

    // ── Style ───────────────────────────────────────────────────────────

    #[test]
    fn plain_style_leaves_text_alone() {
        assert_eq!(Style::default().paint("hi"), "hi");
    }

    #[test]
    fn colored_style_wraps_with_reset() {
        assert_eq!(Style::fg(Color::RED).paint("¿?"), "\x1b[31m¿?\x1b[0m");
    }

    #[test]
    fn style_with_attrs_and_rgb() {
        let s = Style::fg(Color::Rgb(1, 2, 3)).with_attrs(Attr::BOLD).paint("x");
        assert_eq!(s, "\x1b[1m\x1b[38;2;1;2;3mx\x1b[0m");
    }
}
