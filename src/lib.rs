//! Tether keeps a serial line to a board alive and reads keystrokes from the
//! terminal, the two building blocks of an interactive serial console.
//!
//! The [`Supervisor`] owns the serial port. It streams whatever the device
//! sends to an output sink and, when the line breaks (board reset, USB cable
//! unplugged), closes the port and keeps re-opening it with the same settings
//! until the device is back. Callers keep writing through the same
//! `Supervisor` the whole time.
//!
//! [`read_key`] is the other half: one blocking, raw-mode read on the
//! controlling terminal, decoded into a [`KeyEvent`]. It holds no state, the
//! terminal is restored before it returns.
//!
//! The two are independent. A console composes them by forwarding
//! [`KeyEvent::bytes`] to [`Supervisor::write`], which is what the `tether`
//! binary does.
//!
//! Supervision is implemented as a state machine, following the same rules as
//! everywhere else in this family of tools:
//!
//! * Can only be in one state at any time.
//! * Each state can have its own associated data if needed.
//! * Data shared between **all** states lives next to the state, not in it.
//! * Transitions between states are triggered via typed **events** and only
//!   the transitions for which a `From` implementation exists are possible.
//! * Transitioning from one state to another consumes the original state.

mod device;
mod error;
mod keyboard;
mod settings;
mod supervisor;

pub use device::{Device, Opener, SerialOpener};
pub use error::{Error, Result};
pub use keyboard::{
    decode, read_key, read_key_from, ControllingTerminal, KeyEvent, KeyType, Terminal,
};
pub use settings::{DataBits, Parity, Settings, SettingsBuilder, StopBits};
pub use supervisor::{LinkState, Supervisor};
