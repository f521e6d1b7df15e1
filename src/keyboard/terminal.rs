//! Raw-mode sessions on the controlling terminal.

use std::{
    fs::{File, OpenOptions},
    io::{self, Read},
};

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use log::warn;

#[cfg(unix)]
const TTY_PATH: &str = "/dev/tty";
#[cfg(windows)]
const TTY_PATH: &str = "CONIN$";

// =============================================================================
// Public Interface
// =============================================================================

/// A terminal keystrokes can be read from.
///
/// The session returned by `open` is closed when dropped.
pub trait Terminal {
    type Session: Read;

    fn open(&self) -> io::Result<Self::Session>;

    /// Switch to raw mode: no echo, no line buffering, control keys delivered
    /// as bytes.
    fn set_raw(&self, session: &mut Self::Session) -> io::Result<()>;

    /// Put the terminal back in the mode it was in before `set_raw`.
    fn restore(&self, session: &mut Self::Session) -> io::Result<()>;
}

/// The terminal the process is attached to, independent of stdin
/// redirections.
#[derive(Debug, Default, Clone, Copy)]
pub struct ControllingTerminal;

impl Terminal for ControllingTerminal {
    type Session = File;

    fn open(&self) -> io::Result<File> {
        OpenOptions::new().read(true).write(true).open(TTY_PATH)
    }

    fn set_raw(&self, _session: &mut File) -> io::Result<()> {
        // crossterm remembers the original mode and hands it back on disable.
        enable_raw_mode().map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }

    fn restore(&self, _session: &mut File) -> io::Result<()> {
        disable_raw_mode().map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }
}

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// An open terminal session in raw mode.
///
/// The terminal mode is restored when the session goes out of scope, whatever
/// the path taken to get there.
pub(crate) struct RawSession<'t, T: Terminal> {
    terminal: &'t T,
    session: T::Session,
}

impl<'t, T: Terminal> RawSession<'t, T> {
    pub(crate) fn begin(terminal: &'t T) -> io::Result<Self> {
        let mut session = terminal.open()?;
        // Nothing to restore unless raw mode took
        terminal.set_raw(&mut session)?;
        Ok(RawSession { terminal, session })
    }
}

impl<T: Terminal> Read for RawSession<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.session.read(buf)
    }
}

impl<T: Terminal> Drop for RawSession<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.terminal.restore(&mut self.session) {
            warn!("could not restore the terminal mode: {}", e);
        }
    }
}
