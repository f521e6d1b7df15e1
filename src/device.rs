//! The I/O capabilities `tether` consumes.
//!
//! The supervisor never talks to `serialport` directly. It opens devices
//! through an [`Opener`] and reads/writes through the returned [`Device`], so a
//! scripted device can stand in for a board during tests.

use std::io::{self, Read, Write};

use crate::{error::Result, settings::Settings};

mod serial;

#[cfg(test)]
pub(crate) mod mock;

pub use serial::SerialOpener;

/// An open, raw-mode handle on a serial line.
///
/// Dropping the handle closes it.
pub trait Device: Read + Write + Send {
    /// Get a second handle on the same underlying line, used by the read task
    /// so that writes do not wait behind a blocking read.
    fn try_clone_device(&self) -> io::Result<Box<dyn Device>>;
}

/// Opens devices according to [`Settings`].
///
/// Implementations must apply every serial parameter in `settings` on each
/// call. The supervisor calls `open` again with the very same settings when it
/// reconnects.
pub trait Opener: Send + Sync {
    fn open(&self, settings: &Settings) -> Result<Box<dyn Device>>;
}
