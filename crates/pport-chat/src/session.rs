// SPDX-License-Identifier: MIT
//
// Chat session state.
//
// One `Session` owns everything the client knows: the message history
// (newest first), the set of message ids already seen, the line being
// typed, and whether a send is in flight. It never performs I/O. Keys
// come in through `handle_key`, server batches through `merge`, send
// results through `finish_send`, and `compose` paints the frame.
//
// A send happens in two phases. Enter moves the input into the outbox and
// raises `uploading`, so the next frame shows the spinner. The driver then
// takes the outbox, delivers it, and reports back. While `uploading` is
// raised every key except Ctrl+C is ignored.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, warn};

use pport_term::ansi::{Color, Style};
use pport_term::buffer::ScreenBuffer;
use pport_term::event_loop::Action;
use pport_term::input::{KeyEvent, KeyKind};
use pport_term::schedule::Scheduler;
use pport_term::terminal::Size;
use pport_term::text::strip_control_and_style;
use pport_term::toggle::{Blink, Spinner, Toggler};

use crate::message::{Draft, Message};
use crate::palette;
use crate::transport::TransportError;

// ─── Configuration ───────────────────────────────────────────────────────────

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_BLINK_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_SPIN_INTERVAL: Duration = Duration::from_millis(80);
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Block cursor drawn at the end of the input line.
pub const CURSOR_GLYPH: &str = "█";

/// Shown in place of the spinner while idle.
const IDLE_MARK: &str = "¿?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub username: String,
    pub poll_interval: Duration,
    pub blink_interval: Duration,
    pub spin_interval: Duration,
    pub history_limit: usize,
}

impl SessionConfig {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            blink_interval: DEFAULT_BLINK_INTERVAL,
            spin_interval: DEFAULT_SPIN_INTERVAL,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// What happens when the transport fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Leave state untouched and try again at the next scheduled tick. A
    /// failed send keeps the input line so Enter can resend it.
    #[default]
    RetryNextTick,
}

/// Counters for the log line written on exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub polls_ok: u64,
    pub polls_failed: u64,
    pub sends_ok: u64,
    pub sends_failed: u64,
    pub messages_received: u64,
}

/// Periodic work the session asks its driver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Poll,
    Blink,
    Spin,
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Session {
    username: String,
    messages: Vec<Message>,
    seen: HashSet<String>,
    input: String,
    uploading: bool,
    outbox: Option<Draft>,
    cursor: Blink,
    spinner: Spinner,
    timers: Scheduler<Task>,
    history_limit: usize,
    policy: FailurePolicy,
    stats: SessionStats,
}

impl Session {
    /// A fresh session whose timers start counting at `now`.
    #[must_use]
    pub fn new(config: SessionConfig, now: Instant) -> Self {
        let mut timers = Scheduler::new();
        timers.every(Task::Poll, config.poll_interval, now);
        timers.every(Task::Blink, config.blink_interval, now);
        timers.every(Task::Spin, config.spin_interval, now);

        Self {
            username: config.username,
            messages: Vec::new(),
            seen: HashSet::new(),
            input: String::new(),
            uploading: false,
            outbox: None,
            cursor: Blink::new(CURSOR_GLYPH),
            spinner: Spinner::default(),
            timers,
            history_limit: config.history_limit.max(1),
            policy: FailurePolicy::default(),
            stats: SessionStats::default(),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// History, newest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub const fn is_uploading(&self) -> bool {
        self.uploading
    }

    #[must_use]
    pub const fn policy(&self) -> FailurePolicy {
        self.policy
    }

    #[must_use]
    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    // ── Keys ────────────────────────────────────────────────────────

    /// Apply one key. `now_ms` stamps a draft if this key submits one.
    pub fn handle_key(&mut self, key: &KeyEvent, now_ms: i64) -> Action {
        if key.is_interrupt() {
            return Action::Quit;
        }
        if self.uploading {
            return Action::Continue;
        }

        match (key.kind, key.name.as_str()) {
            (KeyKind::Control, "backspace") => {
                self.input.pop();
            }
            (KeyKind::Control, "enter") => self.submit(now_ms),
            (KeyKind::Control, "u") if key.ctrl() => self.input.clear(),
            (KeyKind::Char, _) if !key.ctrl() => {
                self.input.push_str(&key.name);
                self.input = strip_control_and_style(&self.input);
            }
            _ => {}
        }
        Action::Continue
    }

    /// Queue the input line for delivery. Does nothing while a send is
    /// already in flight or the line is empty.
    pub fn submit(&mut self, now_ms: i64) {
        if self.uploading || self.input.is_empty() {
            return;
        }
        self.outbox = Some(Draft::new(self.username.clone(), self.input.clone(), now_ms));
        self.uploading = true;
        self.spinner.reset();
    }

    /// The draft waiting for delivery, if any.
    pub fn take_outbox(&mut self) -> Option<Draft> {
        self.outbox.take()
    }

    /// Record the result of a delivery. Success clears the input line;
    /// either way the session accepts keys again.
    pub fn finish_send(&mut self, result: Result<(), TransportError>) {
        match result {
            Ok(()) => {
                self.input.clear();
                self.stats.sends_ok += 1;
            }
            Err(e) => {
                self.stats.sends_failed += 1;
                warn!("send failed, keeping input ({:?}): {e}", self.policy);
            }
        }
        self.outbox = None;
        self.uploading = false;
    }

    // ── Polling ─────────────────────────────────────────────────────

    /// Prepend the messages of `batch` not seen before, keeping the
    /// batch's own order. Returns how many were added.
    pub fn merge(&mut self, batch: Vec<Message>) -> usize {
        self.stats.polls_ok += 1;

        let fresh: Vec<Message> = batch
            .into_iter()
            .filter(|m| self.seen.insert(m.uuid.clone()))
            .map(|m| m.sanitized())
            .collect();

        let added = fresh.len();
        if added > 0 {
            self.messages.splice(0..0, fresh);
            self.messages.truncate(self.history_limit);
            self.stats.messages_received += u64::try_from(added).unwrap_or(u64::MAX);
            debug!("merged {added} new message(s), {} in history", self.messages.len());
        }
        added
    }

    /// Record a failed poll. History is left as it was.
    pub fn poll_failed(&mut self, err: &TransportError) {
        self.stats.polls_failed += 1;
        debug!("poll failed ({:?}): {err}", self.policy);
    }

    // ── Timers ──────────────────────────────────────────────────────

    /// Advance the cursor and spinner for everything due at `now`.
    /// Returns `true` when a poll is due.
    pub fn advance(&mut self, now: Instant) -> bool {
        let mut poll = false;
        for task in self.timers.due(now) {
            match task {
                Task::Poll => poll = true,
                Task::Blink => self.cursor.advance(),
                Task::Spin if self.uploading => self.spinner.advance(),
                Task::Spin => {}
            }
        }
        poll
    }

    // ── Drawing ─────────────────────────────────────────────────────

    /// The header line: clock, geometry and name, then the send status,
    /// then the input with its cursor.
    #[must_use]
    pub fn header(&self, size: Size, clock: &str) -> String {
        let info = Style::fg(Color::MAGENTA).paint(&format!(
            "{clock} | {}x{} ({})",
            size.cols, size.rows, self.username
        ));
        let status = if self.uploading {
            format!(" {}", self.spinner.glyph())
        } else {
            Style::fg(Color::RED).paint(IDLE_MARK)
        };
        format!("{info} {status} {}{}", self.input, self.cursor.glyph())
    }

    /// Paint the frame for the bottom-anchored layout: header first, then
    /// one line per message, newest first, at most `size.rows` of them.
    pub fn compose(&self, frame: &mut ScreenBuffer, size: Size, clock: &str) {
        frame.writeln(self.header(size, clock));
        for message in self.messages.iter().take(usize::from(size.rows)) {
            frame.writeln(format!(
                "{}: {}",
                palette::paint_nickname(&message.username),
                message.text
            ));
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
