//! Single keystroke input from the controlling terminal.
//!
//! Each call to [`read_key`] opens its own raw-mode session on the terminal,
//! does one read, restores the terminal and decodes the bytes into a
//! [`KeyEvent`]. Nothing is kept between calls.
//!
//! **Example** - Echo the arrow keys until `Esc` is pressed:
//! ```no_run
//! use tether::{read_key, KeyType};
//!
//! loop {
//!     let key = read_key();
//!     match key.kind {
//!         Some(KeyType::Esc) => break,
//!         Some(KeyType::UpArrow) | Some(KeyType::DownArrow) => println!("{:?}", key.kind),
//!         _ => {}
//!     }
//! }
//! ```

use std::io::Read;

use log::debug;

mod key;
mod terminal;

pub use key::{decode, KeyEvent, KeyType};
pub use terminal::{ControllingTerminal, Terminal};

use terminal::RawSession;

/// Largest keystroke sequence read at once.
const KEY_BUFFER_SIZE: usize = 2048;

/// Block until the next keystroke on the controlling terminal and decode it.
///
/// Returns the empty event (`kind == None`) when the terminal could not be
/// opened or read. That means "no key", not a keystroke.
pub fn read_key() -> KeyEvent {
    read_key_from(&ControllingTerminal)
}

/// Same as [`read_key`] but reading from `terminal`.
pub fn read_key_from<T: Terminal>(terminal: &T) -> KeyEvent {
    let mut session = match RawSession::begin(terminal) {
        Ok(session) => session,
        Err(e) => {
            debug!("no raw terminal session: {}", e);
            return KeyEvent::default();
        }
    };

    let mut buf = vec![0; KEY_BUFFER_SIZE];
    let read = session.read(&mut buf);
    // Give the terminal back before doing anything else
    drop(session);

    match read {
        Ok(0) => {
            debug!("terminal read returned no bytes");
            KeyEvent::default()
        }
        Ok(n) => decode(&buf[..n]),
        Err(e) => {
            debug!("terminal read failed: {}", e);
            KeyEvent::default()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockTerminal;

    #[test]
    fn reads_and_decodes_one_key() {
        let terminal = MockTerminal::typing(&[27, 91, 65]);
        let key = read_key_from(&terminal);
        assert_eq!(key.kind, Some(KeyType::UpArrow));
        assert!(key.raw.is_empty());
        assert!(!terminal.is_raw());
        assert_eq!(terminal.restores(), 1);
    }

    #[test]
    fn keeps_printable_input() {
        let terminal = MockTerminal::typing(b"hi");
        let key = read_key_from(&terminal);
        assert_eq!(key, KeyEvent::unclassified(b"hi".to_vec()));
    }

    #[test]
    fn missing_terminal_gives_no_key() {
        let terminal = MockTerminal::missing();
        let key = read_key_from(&terminal);
        assert_eq!(key, KeyEvent::default());
        assert!(key.is_none());
        assert_eq!(terminal.restores(), 0);
    }

    #[test]
    fn refused_raw_mode_is_not_restored() {
        let terminal = MockTerminal::stubborn(b"x");
        let key = read_key_from(&terminal);
        assert!(key.is_none());
        assert!(!terminal.is_raw());
        assert_eq!(terminal.restores(), 0);
    }

    #[test]
    fn failed_read_restores_the_terminal() {
        let terminal = MockTerminal::broken();
        let key = read_key_from(&terminal);
        assert!(key.is_none());
        assert!(key.raw.is_empty());
        assert!(!terminal.is_raw());
        assert_eq!(terminal.restores(), 1);
    }

    #[test]
    fn empty_read_gives_no_key() {
        let terminal = MockTerminal::typing(&[]);
        assert!(read_key_from(&terminal).is_none());
    }
}
