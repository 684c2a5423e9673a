// SPDX-License-Identifier: MIT
//
// Event loop: the single thread that owns the application.
//
// Stdin chunks arrive from the background reader, each is decoded into
// one key and handed to the application. Between keys the loop checks
// the terminal geometry, paints and renders when the redraw period fires
// or input arrived, and gives the application a tick for its own timers
// (polling the server, blinking the cursor). All application state lives
// on this thread, so no locks are needed.
//
// # Blocking work and queued input
//
// The application may do slow, blocking work inside `on_tick` (sending a
// message over HTTP). Keys typed meanwhile pile up in the channel. When
// the application answers `Action::DiscardInput` the loop throws those
// queued chunks away instead of replaying them, except Ctrl+C, which is
// always delivered so the user can still quit.
//
// # Timing
//
// `recv_timeout(tick)` doubles as the idle wait: with no input the thread
// sleeps for one tick, then redraws if the redraw period elapsed. Since
// the renderer writes nothing for an unchanged frame, an idle redraw only
// costs a paint into memory.

use std::io::{self, Write};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use log::debug;

use crate::buffer::ScreenBuffer;
use crate::diff::{DiffRenderer, Layout};
use crate::input::{self, KeyEvent};
use crate::reader::StdinReader;
use crate::schedule::Periodic;
use crate::terminal::{Size, Terminal};

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the loop after a key or a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    /// Drop every input chunk already queued. Interrupt keys are still
    /// delivered.
    DiscardInput,
    Quit,
}

/// Why [`EventLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The application returned [`Action::Quit`].
    Quit,
    /// Stdin reached EOF (the end event was delivered first).
    InputClosed,
}

/// Application interface for the event loop.
///
/// Per iteration the loop calls, in order: [`on_key`](App::on_key) for
/// the chunk that arrived (if any), [`on_resize`](App::on_resize) when the
/// geometry changed, [`paint`](App::paint) when a frame is due, then
/// [`on_tick`](App::on_tick).
pub trait App {
    /// Handle one decoded key. On EOF this receives [`KeyEvent::end`] and
    /// the loop stops regardless of the returned action.
    fn on_key(&mut self, key: &KeyEvent) -> Action;

    /// Called every iteration with the current time.
    fn on_tick(&mut self, _now: Instant) -> Action {
        Action::Continue
    }

    /// The terminal geometry changed since the last iteration.
    fn on_resize(&mut self, _size: Size) {}

    /// Paint the whole frame. The buffer is cleared before every call.
    fn paint(&mut self, frame: &mut ScreenBuffer, size: Size);

    /// How painted lines map onto terminal rows.
    fn layout(&self) -> Layout {
        Layout::Normal
    }
}

// ─── Loop Config ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Longest wait for input before the loop runs timers anyway.
    pub tick: Duration,
    /// Redraw period while no input arrives.
    pub redraw_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(10),
            redraw_interval: Duration::from_millis(50),
        }
    }
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// Owns the terminal and the renderer for the lifetime of the session.
///
/// ```no_run
/// use pport_term::buffer::ScreenBuffer;
/// use pport_term::event_loop::{Action, App, EventLoop, LoopConfig};
/// use pport_term::input::KeyEvent;
/// use pport_term::terminal::Size;
///
/// struct Echo(String);
///
/// impl App for Echo {
///     fn on_key(&mut self, key: &KeyEvent) -> Action {
///         if key.is_interrupt() {
///             return Action::Quit;
///         }
///         self.0.push_str(&key.name);
///         Action::Continue
///     }
///
///     fn paint(&mut self, frame: &mut ScreenBuffer, _size: Size) {
///         frame.writeln(self.0.clone());
///     }
/// }
///
/// EventLoop::new(LoopConfig::default()).run(&mut Echo(String::new()))?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct EventLoop {
    terminal: Terminal,
    renderer: DiffRenderer,
    config: LoopConfig,
}

impl EventLoop {
    #[must_use]
    pub fn new(config: LoopConfig) -> Self {
        Self {
            terminal: Terminal::new(),
            renderer: DiffRenderer::new(),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> LoopConfig {
        self.config
    }

    /// Enter chat mode, run until the application quits or stdin closes,
    /// and restore the terminal on every return path.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal setup, output, or restore fails. The
    /// terminal is restored before the error is returned.
    pub fn run(&mut self, app: &mut impl App) -> io::Result<Exit> {
        self.terminal.enter()?;

        let (mut reader, rx) = match StdinReader::spawn() {
            Ok(spawned) => spawned,
            Err(e) => {
                self.terminal.leave()?;
                return Err(e);
            }
        };

        let terminal = &mut self.terminal;
        let result = drive(
            app,
            &rx,
            &mut self.renderer,
            self.config,
            || terminal.refresh_size(),
            &mut io::stdout(),
        );

        reader.stop();
        let restored = self.terminal.leave();
        let exit = result?;
        restored?;
        debug!(
            "event loop finished: {exit:?}, {} bytes drawn",
            self.renderer.total_flushed()
        );
        Ok(exit)
    }
}

/// The loop body without any terminal setup.
///
/// Chunks come from `input`, the geometry from `geometry`, rendered bytes
/// go to `out`. [`EventLoop::run`] wires these to stdin and stdout; tests
/// wire them to a channel, a fixed size and a `Vec<u8>`.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn drive<A, W>(
    app: &mut A,
    input: &Receiver<Vec<u8>>,
    renderer: &mut DiffRenderer,
    config: LoopConfig,
    mut geometry: impl FnMut() -> Size,
    out: &mut W,
) -> io::Result<Exit>
where
    A: App + ?Sized,
    W: Write,
{
    let mut frame = ScreenBuffer::new();
    let mut redraw = Periodic::new(config.redraw_interval, Instant::now());
    let mut last_size: Option<Size> = None;
    // First frame always renders.
    let mut dirty = true;

    loop {
        // ── Input ────────────────────────────────────────────────
        match input.recv_timeout(config.tick) {
            Ok(chunk) => {
                let key = input::decode(&chunk);
                dirty = true;
                match app.on_key(&key) {
                    Action::Quit => return Ok(Exit::Quit),
                    Action::DiscardInput => {
                        if discard_queued(app, input) == Action::Quit {
                            return Ok(Exit::Quit);
                        }
                    }
                    Action::Continue => {}
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("input closed");
                app.on_key(&KeyEvent::end());
                return Ok(Exit::InputClosed);
            }
        }

        // ── Geometry ─────────────────────────────────────────────
        let size = geometry();
        if last_size != Some(size) {
            if last_size.is_some() {
                debug!("resize to {}x{}", size.cols, size.rows);
                app.on_resize(size);
            }
            last_size = Some(size);
            dirty = true;
        }

        // ── Draw ─────────────────────────────────────────────────
        let now = Instant::now();
        if redraw.fire(now) || dirty {
            frame.clear();
            app.paint(&mut frame, size);
            renderer.render(&frame, size, app.layout());
            renderer.flush_to(out)?;
            dirty = false;
        }

        // ── Tick ─────────────────────────────────────────────────
        match app.on_tick(now) {
            Action::Quit => return Ok(Exit::Quit),
            Action::DiscardInput => {
                if discard_queued(app, input) == Action::Quit {
                    return Ok(Exit::Quit);
                }
            }
            Action::Continue => {}
        }
    }
}

/// Drain every chunk already in the channel. Interrupts still reach the
/// application; anything else is dropped.
fn discard_queued<A: App + ?Sized>(app: &mut A, input: &Receiver<Vec<u8>>) -> Action {
    let mut dropped = 0usize;
    while let Ok(chunk) = input.try_recv() {
        let key = input::decode(&chunk);
        if key.is_interrupt() {
            if app.on_key(&key) == Action::Quit {
                return Action::Quit;
            }
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        debug!("discarded {dropped} queued input chunk(s)");
    }
    Action::Continue
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::sync::mpsc;

    const SIZE: Size = Size { cols: 20, rows: 4 };

    fn config() -> LoopConfig {
        LoopConfig {
            tick: Duration::from_millis(1),
            redraw_interval: Duration::from_secs(60),
        }
    }

    /// Records every callback; scripted answers for keys and ticks.
    #[derive(Default)]
    struct Recorder {
        keys: Vec<String>,
        resizes: Vec<Size>,
        paints: usize,
        ticks: usize,
        discard_on: Option<&'static str>,
        quit_after_ticks: Option<usize>,
    }

    impl App for Recorder {
        fn on_key(&mut self, key: &KeyEvent) -> Action {
            self.keys.push(key.name.clone());
            if key.is_interrupt() {
                Action::Quit
            } else if self.discard_on == Some(key.name.as_str()) {
                Action::DiscardInput
            } else {
                Action::Continue
            }
        }

        fn on_tick(&mut self, _now: Instant) -> Action {
            self.ticks += 1;
            match self.quit_after_ticks {
                Some(n) if self.ticks >= n => Action::Quit,
                _ => Action::Continue,
            }
        }

        fn on_resize(&mut self, size: Size) {
            self.resizes.push(size);
        }

        fn paint(&mut self, frame: &mut ScreenBuffer, _size: Size) {
            self.paints += 1;
            frame.writeln(self.keys.concat());
        }

        fn layout(&self) -> Layout {
            Layout::Reverse
        }
    }

    /// Queue `chunks`, close the channel, run the loop to completion.
    fn run_script(app: &mut Recorder, chunks: &[&[u8]]) -> (Exit, Vec<u8>) {
        let (tx, rx) = mpsc::channel();
        for chunk in chunks {
            tx.send(chunk.to_vec()).unwrap();
        }
        drop(tx);
        let mut out = Vec::new();
        let mut renderer = DiffRenderer::new();
        let exit = drive(app, &rx, &mut renderer, config(), || SIZE, &mut out).unwrap();
        (exit, out)
    }

    // ── Input ───────────────────────────────────────────────────────

    #[test]
    fn each_chunk_is_one_key() {
        let mut app = Recorder::default();
        let (exit, _) = run_script(&mut app, &[b"h", b"i", b"\r"]);
        assert_eq!(exit, Exit::InputClosed);
        assert_eq!(app.keys, vec!["h", "i", "enter", ""]);
    }

    #[test]
    fn eof_delivers_end_event_and_stops() {
        let mut app = Recorder::default();
        let (exit, _) = run_script(&mut app, &[]);
        assert_eq!(exit, Exit::InputClosed);
        assert_eq!(app.keys, vec![""]);
    }

    #[test]
    fn interrupt_quits_without_reading_further() {
        let mut app = Recorder::default();
        let (exit, _) = run_script(&mut app, &[b"a", &[0x03], b"b"]);
        assert_eq!(exit, Exit::Quit);
        assert_eq!(app.keys, vec!["a", "c"]);
    }

    // ── Discarding queued input ─────────────────────────────────────

    #[test]
    fn discard_drops_queued_chunks() {
        let mut app = Recorder {
            discard_on: Some("enter"),
            ..Recorder::default()
        };
        let (exit, _) = run_script(&mut app, &[b"\r", b"x", b"y"]);
        assert_eq!(exit, Exit::InputClosed);
        assert_eq!(app.keys, vec!["enter", ""]);
    }

    #[test]
    fn discard_still_delivers_interrupt() {
        let mut app = Recorder {
            discard_on: Some("enter"),
            ..Recorder::default()
        };
        let (exit, _) = run_script(&mut app, &[b"\r", b"x", &[0x03], b"y"]);
        assert_eq!(exit, Exit::Quit);
        assert_eq!(app.keys, vec!["enter", "c"]);
    }

    // ── Drawing ─────────────────────────────────────────────────────

    #[test]
    fn first_iteration_draws_bottom_anchored_frame() {
        let mut app = Recorder::default();
        let (_, out) = run_script(&mut app, &[b"a"]);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("\x1b[2J"));
        // Reverse layout: the single line lands on the last of 4 rows.
        assert!(out.contains("\x1b[4;1Ha"));
    }

    #[test]
    fn input_triggers_a_paint() {
        let mut app = Recorder::default();
        run_script(&mut app, &[b"a", b"b"]);
        assert_eq!(app.paints, 2);
    }

    #[test]
    fn tick_runs_after_every_iteration() {
        let mut app = Recorder {
            quit_after_ticks: Some(3),
            ..Recorder::default()
        };
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let mut renderer = DiffRenderer::new();
        let exit = drive(&mut app, &rx, &mut renderer, config(), || SIZE, &mut Vec::new()).unwrap();
        drop(tx);
        assert_eq!(exit, Exit::Quit);
        assert_eq!(app.ticks, 3);
        // Only the first frame was dirty; the redraw period never fired.
        assert_eq!(app.paints, 1);
    }

    // ── Geometry ────────────────────────────────────────────────────

    #[test]
    fn geometry_change_calls_on_resize_and_repaints() {
        let mut app = Recorder {
            quit_after_ticks: Some(3),
            ..Recorder::default()
        };
        let (_tx, rx) = mpsc::channel::<Vec<u8>>();
        let calls = Cell::new(0);
        let geometry = || {
            calls.set(calls.get() + 1);
            if calls.get() >= 2 { Size { cols: 30, rows: 6 } } else { SIZE }
        };
        let mut renderer = DiffRenderer::new();
        let mut out = Vec::new();
        drive(&mut app, &rx, &mut renderer, config(), geometry, &mut out).unwrap();

        assert_eq!(app.resizes, vec![Size { cols: 30, rows: 6 }]);
        assert_eq!(app.paints, 2);
        assert_eq!(renderer.geometry(), Some(Size { cols: 30, rows: 6 }));
    }
}
