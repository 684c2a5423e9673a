// SPDX-License-Identifier: MIT
//
// ANSI-safe string utilities.
//
// Lines handed to the renderer are ordinary strings with SGR codes mixed
// in. Measuring them with `len()` counts escape bytes as glyphs, and
// slicing them can cut a sequence in half, which leaves the terminal in
// a broken state for the rest of the session. Everything here walks the
// string as a series of segments (whole escape sequences or single
// characters) so neither mistake is possible.
//
// Escape grammar:
//
//   CSI:    ESC [ <0x30-0x3F>* <0x20-0x2F>* <0x40-0x7E>
//   short:  ESC followed by one of @ A-Z \ ] ^ _
//
// An ESC that does not start a complete sequence is an ordinary control
// character: it is visible to the width count and removed by
// `strip_control_and_style`.
//
// Widths are terminal columns (`unicode-width`): CJK and most emoji take
// two, combining marks take zero, control characters count as one.

use unicode_width::UnicodeWidthChar;

// ─── Segments ───────────────────────────────────────────────────────────────

/// One unit of a styled string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// A complete escape sequence, copied verbatim.
    Escape(&'a str),
    /// A single character outside any escape sequence.
    Char(char),
}

/// Iterator over the [`Segment`]s of a string.
pub struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(n) = escape_len(self.rest) {
            // Escape sequences are pure ASCII, so `n` is a char boundary.
            let (seq, rest) = self.rest.split_at(n);
            self.rest = rest;
            return Some(Segment::Escape(seq));
        }

        let ch = self.rest.chars().next()?;
        self.rest = &self.rest[ch.len_utf8()..];
        Some(Segment::Char(ch))
    }
}

/// Split `s` into escape sequences and characters.
#[must_use]
pub const fn segments(s: &str) -> Segments<'_> {
    Segments { rest: s }
}

/// The escape sequences contained in `s`, in order.
pub fn escapes(s: &str) -> impl Iterator<Item = &str> {
    segments(s).filter_map(|seg| match seg {
        Segment::Escape(e) => Some(e),
        Segment::Char(_) => None,
    })
}

/// Byte length of the escape sequence at the start of `s`, if one starts there.
#[must_use]
pub fn escape_len(s: &str) -> Option<usize> {
    let b = s.as_bytes();
    if b.first() != Some(&0x1B) {
        return None;
    }

    match *b.get(1)? {
        b'[' => {
            let mut end = 2;
            while b.get(end).is_some_and(|c| (0x30..=0x3F).contains(c)) {
                end += 1;
            }
            while b.get(end).is_some_and(|c| (0x20..=0x2F).contains(c)) {
                end += 1;
            }
            match b.get(end) {
                Some(c) if (0x40..=0x7E).contains(c) => Some(end + 1),
                _ => None,
            }
        }
        0x40..=0x5A | b'\\' | b']' | b'^' | b'_' => Some(2),
        _ => None,
    }
}

// ─── Measuring ──────────────────────────────────────────────────────────────

/// Columns a character occupies outside an escape sequence.
#[inline]
#[must_use]
pub fn char_width(ch: char) -> usize {
    if ch.is_control() {
        1
    } else {
        ch.width().unwrap_or(1)
    }
}

/// Visible width of `s` in terminal columns, escape sequences excluded.
#[must_use]
pub fn visible_width(s: &str) -> usize {
    segments(s)
        .map(|seg| match seg {
            Segment::Escape(_) => 0,
            Segment::Char(ch) => char_width(ch),
        })
        .sum()
}

// ─── Clipping ───────────────────────────────────────────────────────────────

/// Clip or pad `s` to exactly `width` visible columns.
///
/// Short strings get trailing spaces. Long strings keep whole escape
/// sequences and visible characters until the width is spent, then
/// collect every escape sequence left in the untaken tail so trailing
/// resets still reach the terminal. A wide character that would straddle
/// the edge is dropped and its column padded with a space.
#[must_use]
pub fn clip_to_width(s: &str, width: usize) -> String {
    let visible = visible_width(s);
    if visible <= width {
        let mut out = String::with_capacity(s.len() + width - visible);
        out.push_str(s);
        pad(&mut out, width - visible);
        return out;
    }

    let mut out = String::with_capacity(s.len());
    let mut used = 0;
    let mut segs = segments(s);

    while used < width {
        match segs.next() {
            Some(Segment::Escape(seq)) => out.push_str(seq),
            Some(Segment::Char(ch)) => {
                let w = char_width(ch);
                if used + w > width {
                    break;
                }
                out.push(ch);
                used += w;
            }
            None => break,
        }
    }

    for seq in segs.filter_map(|seg| match seg {
        Segment::Escape(e) => Some(e),
        Segment::Char(_) => None,
    }) {
        out.push_str(seq);
    }

    pad(&mut out, width - used);
    out
}

fn pad(out: &mut String, n: usize) {
    out.extend(std::iter::repeat_n(' ', n));
}

// ─── Sanitizing ─────────────────────────────────────────────────────────────

/// Remove every escape sequence and every C0 control character (and DEL).
///
/// Applied to anything typed or received before it is displayed, so no
/// cursor movement or color change can be injected by untrusted text.
#[must_use]
pub fn strip_control_and_style(s: &str) -> String {
    segments(s)
        .filter_map(|seg| match seg {
            Segment::Char(ch) if !is_c0_or_del(ch) => Some(ch),
            _ => None,
        })
        .collect()
}

#[inline]
const fn is_c0_or_del(ch: char) -> bool {
    matches!(ch, '\u{00}'..='\u{1F}' | '\u{7F}')
}

// ─── Tests ──────────────────────────────────────────────────────────────────
