//! Supervision of one serial link.
//!
//! **Example** - Supervise a port, echo what the board prints and talk to it
//! from another thread:
//! ```no_run
//! use std::thread;
//!
//! use tether::{SettingsBuilder, Supervisor};
//!
//! let settings = SettingsBuilder::new("/dev/ttyUSB0").finalize();
//! let supervisor = Supervisor::connect(settings).expect("board not plugged");
//!
//! let runner = supervisor.clone();
//! let handle = thread::spawn(move || runner.run());
//!
//! supervisor.write(b"reboot\r");
//! supervisor.stop();
//! let status = handle.join().unwrap();
//! std::process::exit(status.into());
//! ```

mod events;
mod link;
mod state_machine;
mod states;

pub use state_machine::{LinkState, Supervisor};
