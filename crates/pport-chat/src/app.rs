// SPDX-License-Identifier: MIT
//
// ChatApp — the session wired to a transport and the event loop.
//
// Keys go straight to the session. Ticks do the I/O: a queued draft is
// delivered first (blocking, on the loop thread), then a poll runs if the
// session's poll timer says so. After a delivery the loop is told to
// discard whatever was typed meanwhile.

use std::time::Instant;

use chrono::{Local, Utc};
use log::{debug, info};

use pport_term::buffer::ScreenBuffer;
use pport_term::diff::Layout;
use pport_term::event_loop::{Action, App};
use pport_term::input::KeyEvent;
use pport_term::terminal::Size;

use crate::session::{Session, SessionConfig, SessionStats};
use crate::transport::Transport;

/// Source of the header's wall-clock text.
pub type Clock = fn() -> String;

fn local_clock() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

pub struct ChatApp<T: Transport> {
    session: Session,
    transport: T,
    clock: Clock,
}

impl<T: Transport> ChatApp<T> {
    #[must_use]
    pub fn new(config: SessionConfig, transport: T, now: Instant) -> Self {
        Self {
            session: Session::new(config, now),
            transport,
            clock: local_clock,
        }
    }

    /// Replace the header clock (tests pin it).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub const fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    /// Deliver the outbox, if any. Returns whether a delivery happened.
    fn deliver(&mut self) -> bool {
        let Some(draft) = self.session.take_outbox() else {
            return false;
        };
        let result = self.transport.submit(&draft);
        self.session.finish_send(result);
        true
    }

    fn poll(&mut self) {
        match self.transport.fetch_latest() {
            Ok(batch) => {
                self.session.merge(batch);
            }
            Err(e) => self.session.poll_failed(&e),
        }
    }
}

impl<T: Transport> App for ChatApp<T> {
    fn on_key(&mut self, key: &KeyEvent) -> Action {
        if key.is_end() {
            info!("input closed");
            return Action::Quit;
        }
        self.session.handle_key(key, Utc::now().timestamp_millis())
    }

    fn on_tick(&mut self, now: Instant) -> Action {
        let delivered = self.deliver();
        if self.session.advance(now) {
            self.poll();
        }
        if delivered {
            Action::DiscardInput
        } else {
            Action::Continue
        }
    }

    fn on_resize(&mut self, size: Size) {
        debug!("chat resized to {}x{}", size.cols, size.rows);
    }

    fn paint(&mut self, frame: &mut ScreenBuffer, size: Size) {
        self.session.compose(frame, size, &(self.clock)());
    }

    fn layout(&self) -> Layout {
        Layout::Reverse
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pport_term::diff::DiffRenderer;
    use pport_term::event_loop::{Exit, LoopConfig, drive};
    use pretty_assertions::assert_eq;
    use std::sync::mpsc;
    use std::time::Duration;

    use crate::message::{Draft, Message};
    use crate::transport::TransportError;

    const SIZE: Size = Size { cols: 40, rows: 6 };

    /// In-memory relay: scripted poll answers, recorded drafts.
    #[derive(Default)]
    struct FakeTransport {
        batches: Vec<Result<Vec<Message>, u16>>,
        sent: Vec<Draft>,
        reject_sends: bool,
        polls: usize,
    }

    impl Transport for FakeTransport {
        fn fetch_latest(&mut self) -> Result<Vec<Message>, TransportError> {
            self.polls += 1;
            if self.batches.is_empty() {
                return Ok(Vec::new());
            }
            self.batches.remove(0).map_err(|status| TransportError::Status {
                endpoint: "/messages",
                status,
            })
        }

        fn submit(&mut self, draft: &Draft) -> Result<(), TransportError> {
            if self.reject_sends {
                return Err(TransportError::Status {
                    endpoint: "/send",
                    status: 500,
                });
            }
            self.sent.push(draft.clone());
            Ok(())
        }
    }

    fn msg(uuid: &str, text: &str) -> Message {
        Message {
            username: "ann".into(),
            uuid: uuid.into(),
            text: text.into(),
            time: 0,
        }
    }

    fn fixed_clock() -> String {
        "12:00:00".to_string()
    }

    fn app(transport: FakeTransport) -> ChatApp<FakeTransport> {
        ChatApp::new(SessionConfig::new("me"), transport, Instant::now()).with_clock(fixed_clock)
    }

    fn key(bytes: &[u8]) -> KeyEvent {
        pport_term::input::decode(bytes)
    }

    // ── Ticks ───────────────────────────────────────────────────────

    #[test]
    fn enter_then_tick_delivers_and_discards_queued_input() {
        let mut app = app(FakeTransport::default());
        app.on_key(&key(b"hi"));
        app.on_key(&key(b"\r"));
        assert!(app.session().is_uploading());

        assert_eq!(app.on_tick(Instant::now()), Action::DiscardInput);
        assert!(!app.session().is_uploading());
        assert_eq!(app.session().input(), "");
        assert_eq!(app.transport().sent.len(), 1);
        assert_eq!(app.transport().sent[0].text, "hi");
        assert_eq!(app.transport().sent[0].username, "me");

        // Nothing queued any more.
        assert_eq!(app.on_tick(Instant::now()), Action::Continue);
    }

    #[test]
    fn rejected_send_keeps_input() {
        let mut app = app(FakeTransport {
            reject_sends: true,
            ..FakeTransport::default()
        });
        app.on_key(&key(b"hi"));
        app.on_key(&key(b"\r"));
        app.on_tick(Instant::now());

        assert_eq!(app.session().input(), "hi");
        assert_eq!(app.stats().sends_failed, 1);
    }

    #[test]
    fn poll_runs_when_due_and_merges() {
        let t0 = Instant::now();
        let transport = FakeTransport {
            batches: vec![Ok(vec![msg("1", "hello")])],
            ..FakeTransport::default()
        };
        let mut app = ChatApp::new(SessionConfig::new("me"), transport, t0);

        app.on_tick(t0 + Duration::from_millis(100));
        assert_eq!(app.transport().polls, 0);

        app.on_tick(t0 + Duration::from_millis(2000));
        assert_eq!(app.transport().polls, 1);
        assert_eq!(app.session().messages().len(), 1);
    }

    #[test]
    fn failed_poll_is_retried_next_interval() {
        let t0 = Instant::now();
        let transport = FakeTransport {
            batches: vec![Err(503), Ok(vec![msg("1", "late")])],
            ..FakeTransport::default()
        };
        let mut app = ChatApp::new(SessionConfig::new("me"), transport, t0);

        app.on_tick(t0 + Duration::from_millis(2000));
        assert!(app.session().messages().is_empty());
        assert_eq!(app.stats().polls_failed, 1);

        app.on_tick(t0 + Duration::from_millis(4000));
        assert_eq!(app.session().messages()[0].text, "late");
    }

    #[test]
    fn end_of_input_quits() {
        let mut app = app(FakeTransport::default());
        assert_eq!(app.on_key(&KeyEvent::end()), Action::Quit);
    }

    // ── Painting ────────────────────────────────────────────────────

    #[test]
    fn paint_uses_clock_and_reverse_layout() {
        let mut app = app(FakeTransport::default());
        let mut frame = ScreenBuffer::new();
        app.paint(&mut frame, SIZE);
        assert!(frame.line(0).unwrap().contains("12:00:00 | 40x6 (me)"));
        assert_eq!(app.layout(), Layout::Reverse);
    }

    // ── Through the event loop ──────────────────────────────────────

    #[test]
    fn typed_message_is_sent_and_late_keys_are_dropped() {
        let (tx, rx) = mpsc::channel();
        for chunk in [&b"h"[..], b"i", b"\r", b"x", b"y"] {
            tx.send(chunk.to_vec()).unwrap();
        }
        drop(tx);

        let mut app = app(FakeTransport::default());
        let mut renderer = DiffRenderer::new();
        let mut out = Vec::new();
        let config = LoopConfig {
            tick: Duration::from_millis(1),
            redraw_interval: Duration::from_secs(60),
        };
        let exit = drive(&mut app, &rx, &mut renderer, config, || SIZE, &mut out).unwrap();

        assert_eq!(exit, Exit::InputClosed);
        assert_eq!(app.transport().sent.len(), 1);
        assert_eq!(app.transport().sent[0].text, "hi");
        // "x" and "y" were typed during the send and discarded.
        assert_eq!(app.session().input(), "");

        let screen = String::from_utf8(out).unwrap();
        // The spinner frame was drawn before the send went out.
        assert!(screen.contains('⠋'));
        // Header sits on the bottom row.
        assert!(screen.contains("\x1b[6;1H"));
    }

    #[test]
    fn interrupt_quits_the_loop() {
        let (tx, rx) = mpsc::channel();
        tx.send(b"a".to_vec()).unwrap();
        tx.send(vec![0x03]).unwrap();

        let mut app = app(FakeTransport::default());
        let mut renderer = DiffRenderer::new();
        let exit = drive(
            &mut app,
            &rx,
            &mut renderer,
            LoopConfig::default(),
            || SIZE,
            &mut Vec::new(),
        )
        .unwrap();

        assert_eq!(exit, Exit::Quit);
        assert_eq!(app.session().input(), "a");
        drop(tx);
    }
}
