// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background input reader.
//
// The loop must keep drawing and polling the server while nobody types,
// so reads happen on a helper thread that forwards each `read()` result
// over a channel. One read is one chunk and one chunk becomes one key:
// the thread never splits or merges what the terminal delivered.
//
// The thread waits in `poll()` with a short timeout and re-checks its
// stop flag in between, so `stop()` returns promptly even with no input.
// EOF or a read error drops the sender, which the loop sees as a closed
// channel.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

/// A keypress is a few bytes, a paste can be kilobytes.
const CHUNK_SIZE: usize = 4096;

/// How long `stop()` may wait for the thread to notice, in milliseconds.
const WAKE_MS: i32 = 50;

/// Helper thread turning an input fd into a stream of byte chunks.
///
/// ```no_run
/// use pport_term::reader::StdinReader;
///
/// let (reader, rx) = StdinReader::spawn()?;
/// while let Ok(chunk) = rx.recv() {
///     println!("got {} bytes", chunk.len());
/// }
/// drop(reader);
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct StdinReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl StdinReader {
    /// Read from stdin.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    #[cfg(unix)]
    pub fn spawn() -> io::Result<(Self, Receiver<Vec<u8>>)> {
        Self::spawn_fd(libc::STDIN_FILENO)
    }

    /// Read from an arbitrary file descriptor. The caller keeps it open
    /// until the reader is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    #[cfg(unix)]
    pub fn spawn_fd(fd: std::os::unix::io::RawFd) -> io::Result<(Self, Receiver<Vec<u8>>)> {
        Self::start(move |tx, stop| read_fd(fd, tx, stop))
    }

    /// Without `poll()` the thread notices the stop flag only after the
    /// next chunk or EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    #[cfg(not(unix))]
    pub fn spawn() -> io::Result<(Self, Receiver<Vec<u8>>)> {
        Self::start(read_stdin)
    }

    fn start<F>(body: F) -> io::Result<(Self, Receiver<Vec<u8>>)>
    where
        F: FnOnce(&Sender<Vec<u8>>, &AtomicBool) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("pport-input".into())
            .spawn(move || body(&tx, &flag))?;

        Ok((
            Self {
                handle: Some(handle),
                stop,
            },
            rx,
        ))
    }

    /// Ask the thread to finish and wait for it. Safe to call twice.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("input thread panicked");
            }
        }
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Wait for the fd to become readable. `Ok(false)` on timeout or EINTR.
#[cfg(unix)]
fn wait_readable(fd: libc::c_int) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    match unsafe { libc::poll(&raw mut pfd, 1, WAKE_MS) } {
        0 => Ok(false),
        n if n > 0 => Ok(true),
        _ => {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                Ok(false)
            } else {
                Err(err)
            }
        }
    }
}

#[cfg(unix)]
fn read_fd(fd: libc::c_int, tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    let mut buf = [0u8; CHUNK_SIZE];

    while !stop.load(Ordering::Relaxed) {
        match wait_readable(fd) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                warn!("input poll failed: {e}");
                break;
            }
        }

        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        let Ok(len) = usize::try_from(n) else {
            let err = io::Error::last_os_error();
            if matches!(err.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) {
                continue;
            }
            warn!("input read failed: {err}");
            break;
        };
        if len == 0 {
            debug!("input reached EOF");
            break;
        }
        if tx.send(buf[..len].to_vec()).is_err() {
            break;
        }
    }
}

#[cfg(not(unix))]
fn read_stdin(tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    use std::io::Read;

    let mut buf = [0u8; CHUNK_SIZE];
    while !stop.load(Ordering::Relaxed) {
        match io::stdin().lock().read(&mut buf) {
            Ok(0) => {
                debug!("input reached EOF");
                break;
            }
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("input read failed: {e}");
                break;
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    /// (read end, write end)
    fn pipe() -> (libc::c_int, libc::c_int) {
        let mut fds = [0; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        (fds[0], fds[1])
    }

    fn write_all(fd: libc::c_int, bytes: &[u8]) {
        let n = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        assert_eq!(usize::try_from(n).unwrap(), bytes.len());
    }

    fn close(fd: libc::c_int) {
        unsafe { libc::close(fd) };
    }

    #[test]
    fn one_write_arrives_as_one_chunk() {
        let (r, w) = pipe();
        let (mut reader, rx) = StdinReader::spawn_fd(r).unwrap();

        write_all(w, b"\x1b[A");
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), b"\x1b[A");

        write_all(w, "é".as_bytes());
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), "é".as_bytes());

        reader.stop();
        close(w);
        close(r);
    }

    #[test]
    fn eof_closes_the_channel() {
        let (r, w) = pipe();
        let (mut reader, rx) = StdinReader::spawn_fd(r).unwrap();

        write_all(w, b"bye");
        close(w);

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), b"bye");
        assert!(matches!(
            rx.recv_timeout(WAIT),
            Err(mpsc::RecvTimeoutError::Disconnected)
        ));
        reader.stop();
        close(r);
    }

    #[test]
    fn stop_returns_without_input_and_twice() {
        let (r, w) = pipe();
        let (mut reader, rx) = StdinReader::spawn_fd(r).unwrap();
        reader.stop();
        reader.stop();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        close(w);
        close(r);
    }

    #[test]
    fn drop_stops_the_thread() {
        let (r, w) = pipe();
        let (reader, _rx) = StdinReader::spawn_fd(r).unwrap();
        drop(reader);
        close(w);
        close(r);
    }
}
