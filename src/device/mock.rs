//! Scripted stand-ins for a board on a serial line and for the controlling
//! terminal.

use std::{
    cell::Cell,
    collections::VecDeque,
    io::{self, Read, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::Duration,
};

use super::{Device, Opener};
use crate::{
    error::{Error, Result},
    keyboard::Terminal,
    settings::Settings,
};

/// One scripted outcome of a read on a [`MockDevice`].
#[derive(Debug)]
pub(crate) enum Step {
    Data(&'static [u8]),
    Eof,
    Fail(io::ErrorKind),
}

/// Everything that happened on the mock devices of one opener.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    /// Number of calls to `open`, successful or not.
    pub opens: usize,
    /// Baud rate requested on each call to `open`.
    pub bauds: Vec<u32>,
    /// Reader handles alive at the time of each call to `open`.
    pub readers_at_open: Vec<usize>,
    /// Generation of the device behind each scripted read.
    pub reads: Vec<u64>,
    /// Reads attempted on a handle whose device was already closed.
    pub stale_reads: usize,
    /// Generation and payload of each write.
    pub writes: Vec<(u64, Vec<u8>)>,
    /// Generations closed, in order.
    pub closed: Vec<u64>,
    live_readers: usize,
}

type SharedJournal = Arc<Mutex<Journal>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Line {
    generation: u64,
    script: Mutex<VecDeque<Step>>,
    closed: Mutex<bool>,
    journal: SharedJournal,
}

pub(crate) struct MockDevice {
    line: Arc<Line>,
    primary: bool,
}

impl Read for MockDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if *lock(&self.line.closed) {
            lock(&self.line.journal).stale_reads += 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device closed"));
        }
        let step = lock(&self.line.script).pop_front();
        let step = match step {
            Some(step) => step,
            None => {
                // Idle line
                thread::sleep(Duration::from_millis(1));
                return Err(io::Error::new(io::ErrorKind::TimedOut, "idle"));
            }
        };
        lock(&self.line.journal).reads.push(self.line.generation);
        match step {
            Step::Data(bytes) => {
                buf[..bytes.len()].copy_from_slice(bytes);
                Ok(bytes.len())
            }
            Step::Eof => Ok(0),
            Step::Fail(kind) => Err(io::Error::new(kind, "scripted failure")),
        }
    }
}

impl Write for MockDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if *lock(&self.line.closed) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device closed"));
        }
        lock(&self.line.journal)
            .writes
            .push((self.line.generation, buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Device for MockDevice {
    fn try_clone_device(&self) -> io::Result<Box<dyn Device>> {
        lock(&self.line.journal).live_readers += 1;
        Ok(Box::new(MockDevice {
            line: Arc::clone(&self.line),
            primary: false,
        }))
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        let mut journal = lock(&self.line.journal);
        if self.primary {
            *lock(&self.line.closed) = true;
            journal.closed.push(self.line.generation);
        } else {
            journal.live_readers -= 1;
        }
    }
}

enum Outcome {
    Device(Vec<Step>),
    Unavailable,
}

/// Hands out scripted devices, or fails, in the order the outcomes were
/// queued. Once the queue is drained every open fails.
pub(crate) struct MockOpener {
    outcomes: Mutex<VecDeque<Outcome>>,
    generation: Mutex<u64>,
    journal: SharedJournal,
}

impl MockOpener {
    pub(crate) fn new() -> Self {
        MockOpener {
            outcomes: Mutex::new(VecDeque::new()),
            generation: Mutex::new(0),
            journal: Arc::default(),
        }
    }

    /// Queue a successful open yielding a device that plays `script`.
    pub(crate) fn device(self, script: Vec<Step>) -> Self {
        lock(&self.outcomes).push_back(Outcome::Device(script));
        self
    }

    /// Queue `count` failed opens.
    pub(crate) fn unavailable(self, count: usize) -> Self {
        {
            let mut outcomes = lock(&self.outcomes);
            for _ in 0..count {
                outcomes.push_back(Outcome::Unavailable);
            }
        }
        self
    }

    pub(crate) fn journal(&self) -> SharedJournal {
        Arc::clone(&self.journal)
    }
}

impl Opener for MockOpener {
    fn open(&self, settings: &Settings) -> Result<Box<dyn Device>> {
        {
            let mut journal = lock(&self.journal);
            journal.opens += 1;
            journal.bauds.push(settings.baud_rate);
            let readers = journal.live_readers;
            journal.readers_at_open.push(readers);
        }
        match lock(&self.outcomes).pop_front() {
            Some(Outcome::Device(script)) => {
                let mut generation = lock(&self.generation);
                *generation += 1;
                Ok(Box::new(MockDevice {
                    line: Arc::new(Line {
                        generation: *generation,
                        script: Mutex::new(script.into()),
                        closed: Mutex::new(false),
                        journal: Arc::clone(&self.journal),
                    }),
                    primary: true,
                }))
            }
            Some(Outcome::Unavailable) | None => Err(Error::open(
                &settings.path,
                serialport::Error::new(serialport::ErrorKind::NoDevice, "device unplugged"),
            )),
        }
    }
}

/// A sink collecting everything the supervisor forwards.
#[derive(Clone, Default)]
pub(crate) struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    pub(crate) fn contents(&self) -> Vec<u8> {
        lock(&self.0).clone()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A controlling terminal that yields one canned read.
pub(crate) struct MockTerminal {
    openable: bool,
    rawable: bool,
    input: Option<Vec<u8>>,
    raw: Cell<bool>,
    restores: Cell<usize>,
}

impl MockTerminal {
    /// A terminal whose next read returns `input`.
    pub(crate) fn typing(input: &[u8]) -> Self {
        MockTerminal {
            openable: true,
            rawable: true,
            input: Some(input.to_vec()),
            raw: Cell::new(false),
            restores: Cell::new(0),
        }
    }

    /// A terminal that opens but fails to read.
    pub(crate) fn broken() -> Self {
        MockTerminal {
            input: None,
            ..MockTerminal::typing(&[])
        }
    }

    /// A terminal that opens but refuses to switch to raw mode.
    pub(crate) fn stubborn(input: &[u8]) -> Self {
        MockTerminal {
            rawable: false,
            ..MockTerminal::typing(input)
        }
    }

    /// A terminal that cannot be opened.
    pub(crate) fn missing() -> Self {
        MockTerminal {
            openable: false,
            ..MockTerminal::broken()
        }
    }

    pub(crate) fn is_raw(&self) -> bool {
        self.raw.get()
    }

    pub(crate) fn restores(&self) -> usize {
        self.restores.get()
    }
}

pub(crate) struct MockSession(Option<Vec<u8>>);

impl Read for MockSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &self.0 {
            Some(input) => {
                let n = input.len().min(buf.len());
                buf[..n].copy_from_slice(&input[..n]);
                Ok(n)
            }
            None => Err(io::Error::new(io::ErrorKind::Other, "read failed")),
        }
    }
}

impl Terminal for MockTerminal {
    type Session = MockSession;

    fn open(&self) -> io::Result<MockSession> {
        if self.openable {
            Ok(MockSession(self.input.clone()))
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "no controlling terminal"))
        }
    }

    fn set_raw(&self, _session: &mut MockSession) -> io::Result<()> {
        if !self.rawable {
            return Err(io::Error::new(io::ErrorKind::Other, "not a tty"));
        }
        self.raw.set(true);
        Ok(())
    }

    fn restore(&self, _session: &mut MockSession) -> io::Result<()> {
        self.raw.set(false);
        self.restores.set(self.restores.get() + 1);
        Ok(())
    }
}
