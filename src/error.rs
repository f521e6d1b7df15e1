//! Errors surfaced by `tether`.
//!
//! Only construction failures are returned as hard errors. Everything that
//! happens once the link is supervised (link loss, failed writes) is handled
//! internally and reported, the variants below are used to carry the cause into
//! the diagnostics and into [`Supervisor::try_write`](crate::Supervisor::try_write).

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The serial device could not be opened or configured.
    #[error("could not open `{path}`: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// The device was opened but did not accept the requested baud rate.
    #[error("`{path}` runs at {actual} baud instead of the requested {requested}")]
    BaudRate {
        path: String,
        requested: u32,
        actual: u32,
    },

    /// A read on an established link failed with something other than an
    /// idle line.
    #[error("serial link broken: {0}")]
    Link(#[source] io::Error),

    /// Writing to the current handle failed.
    #[error("write to serial port failed: {0}")]
    Write(#[source] io::Error),

    /// A write was attempted while the port is being re-opened.
    #[error("serial link is down, reconnecting")]
    LinkDown,

    /// Supervision was stopped before the operation could complete.
    #[error("supervision stopped")]
    Stopped,
}

impl Error {
    /// Wrap a `serialport` failure to open `path`.
    pub(crate) fn open(path: &str, source: serialport::Error) -> Self {
        Error::Open {
            path: path.to_owned(),
            source,
        }
    }
}
