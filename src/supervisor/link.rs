//! The single live handle on the serial line.
//!
//! The handle sits behind one lock shared by writers and by the supervision
//! loop, so a write can never land on a handle that is being replaced. During
//! a reconnect window there is no handle at all and writes fail fast with
//! [`Error::LinkDown`].

use std::{
    io::{self, Write},
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::debug;

use crate::{
    device::Device,
    error::{Error, Result},
};

struct Current {
    /// Bumped every time the handle is replaced, starts at 1.
    generation: u64,
    device: Option<Box<dyn Device>>,
}

pub(crate) struct Link {
    current: Mutex<Current>,
}

impl Link {
    pub(crate) fn new(device: Box<dyn Device>) -> Self {
        Link {
            current: Mutex::new(Current {
                generation: 1,
                device: Some(device),
            }),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// A handle for the read task, tagged with the generation it belongs to.
    pub(crate) fn reader(&self) -> io::Result<(u64, Box<dyn Device>)> {
        let current = self.lock();
        match &current.device {
            Some(device) => Ok((current.generation, device.try_clone_device()?)),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no live handle on the serial line",
            )),
        }
    }

    pub(crate) fn write(&self, message: &[u8]) -> Result<usize> {
        let mut current = self.lock();
        let device = current.device.as_mut().ok_or(Error::LinkDown)?;
        device
            .write_all(message)
            .and_then(|_| device.flush())
            .map_err(Error::Write)?;
        Ok(message.len())
    }

    /// Close the current handle. Writes fail until [`Link::replace`].
    pub(crate) fn close(&self) {
        let mut current = self.lock();
        if current.device.take().is_some() {
            debug!("closed handle generation {}", current.generation);
        }
    }

    /// Install a freshly opened handle and return its generation.
    pub(crate) fn replace(&self, device: Box<dyn Device>) -> u64 {
        let mut current = self.lock();
        current.generation += 1;
        current.device = Some(device);
        current.generation
    }

    fn lock(&self) -> MutexGuard<'_, Current> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
