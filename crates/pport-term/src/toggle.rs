// SPDX-License-Identifier: MIT
//
// Togglers: tiny display states advanced on their own clock.
//
// The cursor blinks every 500 ms and the upload spinner turns every 80 ms,
// while frames are drawn every 50 ms. Keeping the state here and the
// timing in the scheduler means painting a frame never moves an animation
// forward, so a redraw is always a pure function of the state.

/// A display state that moves one step per scheduled tick.
pub trait Toggler {
    /// Move to the next state.
    fn advance(&mut self);

    /// The glyph for the current state.
    fn glyph(&self) -> &str;
}

// ─── Blink ───────────────────────────────────────────────────────────────────

/// Alternates between a glyph and a blank of the same width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blink {
    glyph: String,
    visible: bool,
}

impl Blink {
    /// Start visible.
    #[must_use]
    pub fn new(glyph: impl Into<String>) -> Self {
        Self {
            glyph: glyph.into(),
            visible: true,
        }
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }
}

impl Toggler for Blink {
    fn advance(&mut self) {
        self.visible = !self.visible;
    }

    fn glyph(&self) -> &str {
        if self.visible { &self.glyph } else { " " }
    }
}

// ─── Spinner ─────────────────────────────────────────────────────────────────

/// Braille dots, one full revolution in ten frames.
pub const DEFAULT_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Cycles through an ordered list of frames, wrapping at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spinner {
    frames: Vec<String>,
    index: usize,
}

impl Spinner {
    /// A spinner over `frames`. An empty list falls back to the default set.
    #[must_use]
    pub fn new<S: Into<String>>(frames: impl IntoIterator<Item = S>) -> Self {
        let frames: Vec<String> = frames.into_iter().map(Into::into).collect();
        if frames.is_empty() {
            return Self::default();
        }
        Self { frames, index: 0 }
    }

    /// Index of the current frame.
    #[must_use]
    pub const fn frame(&self) -> usize {
        self.index
    }

    /// Back to the first frame.
    pub fn reset(&mut self) {
        self.index = 0;
    }
}

impl Default for Spinner {
    fn default() -> Self {
        Self {
            frames: DEFAULT_FRAMES.iter().map(|f| (*f).to_string()).collect(),
            index: 0,
        }
    }
}

impl Toggler for Spinner {
    fn advance(&mut self) {
        self.index = (self.index + 1) % self.frames.len();
    }

    fn glyph(&self) -> &str {
        &self.frames[self.index]
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
