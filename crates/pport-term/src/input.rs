// SPDX-License-Identifier: MIT
//
// Keyboard input decoder.
//
// Every `read()` from a raw-mode terminal returns one chunk of bytes, and
// each chunk becomes exactly one `KeyEvent`. A keypress is almost always
// delivered as its own chunk, so "one chunk, one key" is a good model for
// a chat input line: Enter, Backspace, Ctrl+letter and the arrows get
// names, everything else is text. A paste arrives as one `Char` event
// carrying the whole pasted text.
//
// Classification, first match wins:
//
//   1. empty chunk (end of input)     → Other, empty name
//   2. single CR or LF                → "enter"
//   3. single TAB / DEL / ESC         → "tab" / "backspace" / "escape"
//   4. single 0x01..=0x1A             → Ctrl + letter ("a" for 0x01)
//   5. exactly ESC [ A|B|C|D          → "up" / "down" / "right" / "left"
//   6. anything else                  → Char with the lossily decoded text
//
// Nothing here ever fails: bytes that are not valid UTF-8 decode with
// replacement characters and still produce a Char event.

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

bitflags! {
    /// Keyboard modifier flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
    }
}

/// Broad classification of a decoded chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Named control key (Enter, Tab, Backspace, Escape, Ctrl+letter).
    Control,
    /// Printable text.
    Char,
    /// A recognized escape sequence (arrow keys).
    Escape,
    /// Nothing to report: the input source ended.
    Other,
}

/// A decoded key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// `"enter"`, `"backspace"`, `"up"`, a Ctrl letter, or the typed text.
    pub name: String,
    pub modifiers: Modifiers,
    /// The chunk as text, exactly as received (lossy for invalid UTF-8).
    pub raw: String,
    pub kind: KeyKind,
}

impl KeyEvent {
    /// The event produced when the input source is exhausted.
    #[must_use]
    pub const fn end() -> Self {
        Self {
            name: String::new(),
            modifiers: Modifiers::empty(),
            raw: String::new(),
            kind: KeyKind::Other,
        }
    }

    fn control(name: &str, raw: String) -> Self {
        Self {
            name: name.to_owned(),
            modifiers: Modifiers::empty(),
            raw,
            kind: KeyKind::Control,
        }
    }

    #[inline]
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    #[inline]
    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    #[inline]
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Whether this is the end-of-input marker.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.kind == KeyKind::Other && self.name.is_empty()
    }

    /// Ctrl+C. In raw mode the terminal no longer turns it into SIGINT,
    /// so the application has to recognize it itself.
    #[must_use]
    pub fn is_interrupt(&self) -> bool {
        self.ctrl() && self.name == "c"
    }

    /// Whether this key carries typed text (no Ctrl held).
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.kind == KeyKind::Char && !self.ctrl()
    }
}

// ─── Decoding ───────────────────────────────────────────────────────────────

const CR: u8 = 0x0D;
const LF: u8 = 0x0A;
const TAB: u8 = 0x09;
const DEL: u8 = 0x7F;
const ESC: u8 = 0x1B;

/// Decode one input chunk into one key event.
#[must_use]
pub fn decode(chunk: &[u8]) -> KeyEvent {
    if chunk.is_empty() {
        return KeyEvent::end();
    }

    let raw = String::from_utf8_lossy(chunk).into_owned();

    if let [byte] = *chunk {
        match byte {
            CR | LF => return KeyEvent::control("enter", raw),
            TAB => return KeyEvent::control("tab", raw),
            DEL => return KeyEvent::control("backspace", raw),
            ESC => return KeyEvent::control("escape", raw),
            b @ 0x01..=0x1A => {
                return KeyEvent {
                    name: char::from(b + 0x60).to_string(),
                    modifiers: Modifiers::CTRL,
                    raw,
                    kind: KeyKind::Control,
                };
            }
            _ => {}
        }
    }

    if let [ESC, b'[', last] = *chunk {
        let arrow = match last {
            b'A' => Some("up"),
            b'B' => Some("down"),
            b'C' => Some("right"),
            b'D' => Some("left"),
            _ => None,
        };
        if let Some(name) = arrow {
            return KeyEvent {
                name: name.to_owned(),
                modifiers: Modifiers::empty(),
                raw,
                kind: KeyKind::Escape,
            };
        }
    }

    // Case heuristic: text that changes when lowercased was typed with Shift.
    let modifiers = if raw.to_lowercase() == raw {
        Modifiers::empty()
    } else {
        Modifiers::SHIFT
    };

    KeyEvent {
        name: raw.clone(),
        modifiers,
        raw,
        kind: KeyKind::Char,
    }
}

// ─── Key Stream ─────────────────────────────────────────────────────────────

/// Pull-based stream of keys over any source of byte chunks.
///
/// Each pulled chunk decodes to one [`KeyEvent`]. When the source runs
/// dry the stream yields a single [`KeyEvent::end`] and then stops. The
/// source can be anything that iterates `Vec<u8>`: a scripted list in
/// tests, or `receiver.iter()` over the stdin reader's channel, which
/// blocks until the next chunk arrives.
///
/// To pause and resume over the same source, build the stream over
/// `source.by_ref()` and create a fresh `Keys` later.
pub struct Keys<I> {
    chunks: I,
    finished: bool,
}

impl<I: Iterator<Item = Vec<u8>>> Keys<I> {
    pub fn new(chunks: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            chunks: chunks.into_iter(),
            finished: false,
        }
    }
}

impl<I: Iterator<Item = Vec<u8>>> Iterator for Keys<I> {
    type Item = KeyEvent;

    fn next(&mut self) -> Option<KeyEvent> {
        if self.finished {
            return None;
        }
        match self.chunks.next() {
            Some(chunk) => Some(decode(&chunk)),
            None => {
                self.finished = true;
                Some(KeyEvent::end())
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(chunks: Vec<Vec<u8>>) -> Vec<String> {
        Keys::new(chunks).map(|k| k.name).collect()
    }

    // ── End of input ────────────────────────────────────────────────────

    #[test]
    fn empty_chunk_is_other() {
        let key = decode(b"");
        assert_eq!(key.kind, KeyKind::Other);
        assert!(key.name.is_empty());
        assert!(key.is_end());
    }

    // ── Named control keys ──────────────────────────────────────────────

    #[test]
    fn enter_cr_and_lf() {
        for chunk in [b"\r", b"\n"] {
            let key = decode(chunk);
            assert_eq!(key.name, "enter");
            assert_eq!(key.kind, KeyKind::Control);
            assert!(!key.ctrl());
        }
    }

    #[test]
    fn enter_is_independent_of_prior_input() {
        let keys: Vec<KeyEvent> =
            Keys::new(vec![b"\x1b".to_vec(), b"x".to_vec(), b"\r".to_vec(), b"\n".to_vec()])
                .collect();
        assert_eq!(keys[2].name, "enter");
        assert_eq!(keys[3].name, "enter");
        assert_eq!(keys[3].kind, KeyKind::Control);
    }

    #[test]
    fn tab_backspace_escape() {
        assert_eq!(decode(b"\t").name, "tab");
        assert_eq!(decode(b"\x7f").name, "backspace");
        assert_eq!(decode(b"\x1b").name, "escape");
        assert_eq!(decode(b"\x1b").kind, KeyKind::Control);
    }

    // ── Ctrl + letter ───────────────────────────────────────────────────

    #[test]
    fn every_ctrl_letter_byte() {
        for byte in 0x01u8..=0x1A {
            let key = decode(&[byte]);
            if matches!(byte, TAB | LF | CR) {
                continue;
            }
            assert!(key.ctrl(), "byte {byte:#04x}");
            assert_eq!(key.kind, KeyKind::Control);
            assert_eq!(key.name, char::from(byte + 0x60).to_string());
        }
    }

    #[test]
    fn ctrl_c_is_interrupt() {
        let key = decode(b"\x03");
        assert_eq!(key.name, "c");
        assert!(key.is_interrupt());
        assert!(!decode(b"c").is_interrupt());
    }

    #[test]
    fn ctrl_u_and_ctrl_h() {
        assert_eq!(decode(b"\x15").name, "u");
        // 0x08 is not special-cased, so it is Ctrl+H.
        let h = decode(b"\x08");
        assert_eq!(h.name, "h");
        assert!(h.ctrl());
    }

    // ── Arrows ──────────────────────────────────────────────────────────

    #[test]
    fn arrow_keys() {
        assert_eq!(decode(b"\x1b[A").name, "up");
        assert_eq!(decode(b"\x1b[B").name, "down");
        assert_eq!(decode(b"\x1b[C").name, "right");
        assert_eq!(decode(b"\x1b[D").name, "left");
        assert_eq!(decode(b"\x1b[A").kind, KeyKind::Escape);
    }

    #[test]
    fn modified_arrow_falls_through_to_text() {
        let key = decode(b"\x1b[1;5C");
        assert_eq!(key.kind, KeyKind::Char);
        assert_eq!(key.name, "\x1b[1;5C");
    }

    #[test]
    fn unknown_three_byte_csi_is_text() {
        assert_eq!(decode(b"\x1b[Z").kind, KeyKind::Char);
    }

    // ── Printable ───────────────────────────────────────────────────────

    #[test]
    fn lowercase_char() {
        let key = decode(b"a");
        assert_eq!(key.name, "a");
        assert_eq!(key.kind, KeyKind::Char);
        assert!(!key.shift());
        assert!(key.is_text());
    }

    #[test]
    fn uppercase_char_sets_shift() {
        assert!(decode(b"Q").shift());
        assert!(decode("Ж".as_bytes()).shift());
    }

    #[test]
    fn caseless_chars_have_no_shift() {
        assert!(!decode(b"1").shift());
        assert!(!decode(b"?").shift());
        assert!(!decode("中".as_bytes()).shift());
    }

    #[test]
    fn multibyte_utf8_is_one_char_event() {
        let key = decode("ё".as_bytes());
        assert_eq!(key.name, "ё");
        assert_eq!(key.raw, "ё");
    }

    #[test]
    fn paste_is_one_event() {
        let key = decode(b"hello world");
        assert_eq!(key.name, "hello world");
        assert_eq!(key.kind, KeyKind::Char);
    }

    #[test]
    fn invalid_utf8_decodes_lossily() {
        let key = decode(&[0xFF, b'a']);
        assert_eq!(key.kind, KeyKind::Char);
        assert_eq!(key.name, "\u{FFFD}a");
    }

    #[test]
    fn nul_byte_is_text() {
        assert_eq!(decode(&[0x00]).kind, KeyKind::Char);
    }

    // ── Key stream ──────────────────────────────────────────────────────

    #[test]
    fn stream_yields_one_event_per_chunk_then_end() {
        let got = names(vec![b"h".to_vec(), b"i".to_vec(), b"\r".to_vec()]);
        assert_eq!(got, vec!["h", "i", "enter", ""]);
    }

    #[test]
    fn stream_stops_after_end() {
        let mut keys = Keys::new(Vec::<Vec<u8>>::new());
        assert!(keys.next().unwrap().is_end());
        assert!(keys.next().is_none());
        assert!(keys.next().is_none());
    }

    #[test]
    fn stream_resumes_over_borrowed_source() {
        let mut source = vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()].into_iter();

        let first: Vec<String> = Keys::new(source.by_ref()).take(1).map(|k| k.name).collect();
        assert_eq!(first, vec!["a"]);

        let rest: Vec<String> = Keys::new(source.by_ref()).map(|k| k.name).collect();
        assert_eq!(rest, vec!["b", "c", ""]);
    }

    #[test]
    fn stream_over_channel_receiver() {
        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(b"x".to_vec()).unwrap();
        tx.send(b"\x7f".to_vec()).unwrap();
        drop(tx);

        let got: Vec<String> = Keys::new(rx.iter()).map(|k| k.name).collect();
        assert_eq!(got, vec!["x", "backspace", ""]);
    }
}
