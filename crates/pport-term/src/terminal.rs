// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Terminal control for the chat screen.
//
// The client needs keys byte-by-byte without echo, a private screen to
// draw on, and no hardware cursor (the input line draws its own blinking
// block). `Terminal` sets that up in `enter` and undoes it in `leave`,
// which also runs from `Drop`. Raw mode itself lives in `RawMode`, which
// owns the saved termios.
//
// A panic mid-frame skips the normal teardown, so a process-wide hook
// writes a fixed restore sequence straight to fd 1 (no stdout lock, which
// the panicking frame may hold), puts the saved termios back, and only
// then lets the default hook print the message.
//
// unsafe is limited to libc calls with no std equivalent: ioctl, isatty,
// tcgetattr/tcsetattr/cfmakeraw and the raw write in the panic hook.

use std::io::{self, Write};
#[cfg(unix)]
use std::sync::Mutex;
use std::sync::Once;

use log::{debug, warn};

use crate::ansi;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    /// Used whenever the OS cannot tell us (pipes, tests).
    pub const FALLBACK: Self = Self { cols: 80, rows: 24 };
}

impl Default for Size {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// The size of the terminal behind stdout, if there is one.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    // SAFETY: winsize is plain data; TIOCGWINSZ only writes into it.
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };
    (rc == 0 && ws.ws_col > 0 && ws.ws_row > 0).then_some(Size {
        cols: ws.ws_col,
        rows: ws.ws_row,
    })
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Whether stdin is a terminal. Raw mode is skipped when it is not.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Raw Mode ───────────────────────────────────────────────────────────────

/// Second copy of the saved termios for the panic hook.
#[cfg(unix)]
static SAVED_TERMIOS: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Stdin switched to raw mode. Holds the settings to go back to.
///
/// ISIG is cleared along with everything else, so Ctrl+C arrives as the
/// byte 0x03 instead of a signal and the client decides what it means.
#[cfg(unix)]
struct RawMode {
    saved: libc::termios,
}

#[cfg(unix)]
impl RawMode {
    fn enable() -> io::Result<Self> {
        let mut saved: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &raw mut saved) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut termios = saved;
        unsafe { libc::cfmakeraw(&raw mut termios) };
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const termios) } != 0 {
            return Err(io::Error::last_os_error());
        }

        if let Ok(mut slot) = SAVED_TERMIOS.lock() {
            *slot = Some(saved);
        }
        Ok(Self { saved })
    }

    fn disable(self) -> io::Result<()> {
        if let Ok(mut slot) = SAVED_TERMIOS.lock() {
            *slot = None;
        }
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const self.saved) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Placeholder on platforms without termios: enter/leave only switch
/// screens.
#[cfg(not(unix))]
struct RawMode;

#[cfg(not(unix))]
impl RawMode {
    #[allow(clippy::unnecessary_wraps)]
    const fn enable() -> io::Result<Self> {
        Ok(Self)
    }

    #[allow(clippy::unnecessary_wraps)]
    const fn disable(self) -> io::Result<()> {
        Ok(())
    }
}

// ─── Panic Hook ─────────────────────────────────────────────────────────────

/// End synchronized output, reset SGR, show cursor, leave the alternate
/// screen. Alternate screen exit goes last so the shell comes back clean.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[0m\
    \x1b[?25h\
    \x1b[?1049l";

static PANIC_HOOK: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            previous(info);
        }));
    });
}

#[cfg(unix)]
fn emergency_restore() {
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast(),
            EMERGENCY_RESTORE.len(),
        );
    }
    // try_lock: the panic may have happened while the slot was held.
    if let Ok(slot) = SAVED_TERMIOS.try_lock() {
        if let Some(saved) = slot.as_ref() {
            unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, saved) };
        }
    }
}

#[cfg(not(unix))]
fn emergency_restore() {
    let mut out = io::stdout();
    let _ = out.write_all(EMERGENCY_RESTORE);
    let _ = out.flush();
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Chat-mode terminal handle. Dropping it restores the terminal.
///
/// ```no_run
/// use pport_term::terminal::Terminal;
///
/// let mut term = Terminal::new();
/// term.enter()?;
/// // ... draw frames, read keys ...
/// term.leave()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    raw: Option<RawMode>,
    size: Size,
    active: bool,
}

impl Terminal {
    /// A handle with the current size. Modes are untouched until
    /// [`enter`](Self::enter).
    #[must_use]
    pub fn new() -> Self {
        Self {
            raw: None,
            size: get_size().unwrap_or_default(),
            active: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Ask the OS again. A failed query keeps the last known size.
    pub fn refresh_size(&mut self) -> Size {
        self.size = get_size().unwrap_or(self.size);
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Raw mode (when stdin is a tty), alternate screen, hidden cursor,
    /// cleared screen. Calling it twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode or terminal output fails. Raw mode is
    /// undone again when the screen setup fails.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        install_panic_hook();

        if is_tty() {
            self.raw = Some(RawMode::enable()?);
        }

        let mut seq = Vec::with_capacity(32);
        ansi::enter_alt_screen(&mut seq)?;
        ansi::cursor_hide(&mut seq)?;
        ansi::clear_screen(&mut seq)?;
        if let Err(e) = write_now(&seq) {
            self.restore_mode();
            return Err(e);
        }

        self.active = true;
        debug!(
            "chat screen on ({}x{}, raw={})",
            self.size.cols,
            self.size.rows,
            self.raw.is_some()
        );
        Ok(())
    }

    /// Reset SGR, show the cursor, leave the alternate screen, restore
    /// termios. Calling it twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal output or the termios restore fails.
    /// Termios is restored even when the output fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let mut seq = Vec::with_capacity(32);
        ansi::end_sync(&mut seq)?;
        ansi::reset(&mut seq)?;
        ansi::cursor_show(&mut seq)?;
        ansi::exit_alt_screen(&mut seq)?;
        let written = write_now(&seq);

        let restored = match self.raw.take() {
            Some(raw) => raw.disable(),
            None => Ok(()),
        };
        debug!("chat screen off");
        written.and(restored)
    }

    fn restore_mode(&mut self) {
        if let Some(raw) = self.raw.take() {
            if let Err(e) = raw.disable() {
                warn!("could not restore terminal mode: {e}");
            }
        }
    }
}

fn write_now(bytes: &[u8]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(bytes)?;
    out.flush()
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
