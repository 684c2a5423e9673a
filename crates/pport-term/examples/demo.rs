// SPDX-License-Identifier: MIT
//
// pport-term demo: a live key viewer on the bottom-anchored renderer.
//
// Every chunk read from the terminal is decoded and logged with its kind,
// modifiers and raw bytes, newest at the bottom just above the status
// line. A spinner and a blinking block run on their own schedules, so the
// diff renderer rewrites only the rows they touch. Ctrl-C to quit.
//
// Usage:
//   cargo run -p pport-term --example demo

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use pport_term::ansi::{Attr, Color, Style};
use pport_term::buffer::ScreenBuffer;
use pport_term::diff::Layout;
use pport_term::event_loop::{Action, App, EventLoop, LoopConfig};
use pport_term::input::KeyEvent;
use pport_term::schedule::Scheduler;
use pport_term::terminal::Size;
use pport_term::toggle::{Blink, Spinner, Toggler};

const MAX_LOG_ENTRIES: usize = 200;

#[derive(Debug, Clone, Copy)]
enum Timer {
    Spin,
    Blink,
}

struct Viewer {
    log: VecDeque<String>,
    count: u64,
    spinner: Spinner,
    cursor: Blink,
    timers: Scheduler<Timer>,
}

impl Viewer {
    fn new(now: Instant) -> Self {
        let mut timers = Scheduler::new();
        timers.every(Timer::Spin, Duration::from_millis(80), now);
        timers.every(Timer::Blink, Duration::from_millis(500), now);
        Self {
            log: VecDeque::new(),
            count: 0,
            spinner: Spinner::default(),
            cursor: Blink::new("█"),
            timers,
        }
    }
}

impl App for Viewer {
    fn on_key(&mut self, key: &KeyEvent) -> Action {
        if key.is_interrupt() || key.is_end() {
            return Action::Quit;
        }
        self.count += 1;
        self.log.push_front(format!(
            "{:>5} {:<9} {:<12} {:?} {:?}",
            self.count,
            format!("{:?}", key.kind),
            key.name.escape_debug().to_string(),
            key.modifiers,
            key.raw.as_bytes(),
        ));
        self.log.truncate(MAX_LOG_ENTRIES);
        Action::Continue
    }

    fn on_tick(&mut self, now: Instant) -> Action {
        for timer in self.timers.due(now) {
            match timer {
                Timer::Spin => self.spinner.advance(),
                Timer::Blink => self.cursor.advance(),
            }
        }
        Action::Continue
    }

    fn paint(&mut self, frame: &mut ScreenBuffer, size: Size) {
        let status = Style::fg(Color::CYAN).with_attrs(Attr::BOLD).paint(&format!(
            "{} {}x{} | {} keys | ctrl-c quits",
            self.spinner.glyph(),
            size.cols,
            size.rows,
            self.count
        ));
        frame.writeln(format!("{status} {}", self.cursor.glyph()));
        for line in self.log.iter().take(usize::from(size.rows)) {
            frame.writeln(line.clone());
        }
    }

    fn layout(&self) -> Layout {
        Layout::Reverse
    }
}

fn main() {
    let mut viewer = Viewer::new(Instant::now());
    if let Err(e) = EventLoop::new(LoopConfig::default()).run(&mut viewer) {
        eprintln!("demo: {e}");
        std::process::exit(1);
    }
}
