//! Supervision of a serial link and recovery from disconnections.
//!
//! USB serial controllers come and go: the board is reset, the cable is
//! unplugged, the hub browns out. The supervisor keeps reading from the port
//! and, when the line breaks, closes it and keeps trying to open it again
//! until the device is back. Callers keep the same [`Supervisor`] the whole
//! time and never see the handle being swapped underneath.
//!
//! The following state diagram summarizes the different states and transitions
//! of the supervision loop:
//!
//! ```text
//!                   START (port opened)
//!                          |
//!                          v
//!                   .-------------.  link broken  .----------------.
//!            .----->|   Reading   |-------------->|  Reconnecting  |
//!            |      '-------------'               '----------------'
//!            |             |                        |      |
//!            |           stop                    stop      |
//!            |             v                        |      |
//!            |      .-------------.                 |      |
//!            |      |    Done     |<----------------'      |
//!            |      '-------------'                        |
//!            |             |                               |
//!            |             v                               |
//!            |            END                              |
//!            |                                             |
//!            '--------------- link restored ---------------'
//! ```

use std::{
    fmt::{self, Display},
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use console::{style, Term};
use hexplay::HexViewBuilder;
use log::{debug, info, log_enabled, trace, warn, Level::Trace};

use super::events::*;
use super::link::Link;
use super::states::*;
use crate::{
    device::{Opener, SerialOpener},
    error::Result,
    settings::Settings,
};

// =============================================================================
// Public Interface
// =============================================================================

/// Where the supervised link currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// The port is open and its data is being forwarded.
    Reading,
    /// The port was lost and is being re-opened. Writes fail meanwhile.
    Reconnecting,
    /// Supervision has ended.
    Stopped,
}

/// Supervises one serial link.
///
/// A `Supervisor` is a cheap handle: clone it to run the supervision loop on
/// one thread and write to the device from another.
#[derive(Clone)]
pub struct Supervisor {
    shared: Arc<Shared>,
    // Taken by the first call to `run`
    machine: Arc<Mutex<Option<SupervisorStates>>>,
}

impl Supervisor {
    /// Open the serial port described by `settings` and prepare to supervise
    /// it. Data read from the port goes to stdout, diagnostics to stderr.
    ///
    /// Fails if the port can't be opened right now. Supervision only takes
    /// over once a first connection was made.
    pub fn connect(settings: Settings) -> Result<Self> {
        Self::connect_with(settings, SerialOpener, io::stdout(), Term::stderr())
    }

    /// Same as [`connect`](Supervisor::connect), opening devices with `opener`,
    /// forwarding the data read to `sink` and writing the diagnostic lines
    /// about link loss, recovery and failed writes to `diagnostics`.
    pub fn connect_with<O, W, D>(
        settings: Settings,
        opener: O,
        sink: W,
        diagnostics: D,
    ) -> Result<Self>
    where
        O: Opener + 'static,
        W: Write + Send + 'static,
        D: Write + Send + 'static,
    {
        let device = opener.open(&settings)?;
        info!(
            "Supervising {} at {} baud",
            settings.path, settings.baud_rate
        );

        let shared = Arc::new(Shared {
            settings,
            opener: Box::new(opener),
            link: Link::new(device),
            sink: Mutex::new(Box::new(sink)),
            diagnostics: Mutex::new(Box::new(diagnostics)),
            stop: AtomicBool::new(false),
            state: Mutex::new(LinkState::Reading),
            recoveries: AtomicUsize::new(0),
        });
        let machine = SupervisorStates::Reading(SupervisorSM::new(Arc::clone(&shared)));

        Ok(Supervisor {
            shared,
            machine: Arc::new(Mutex::new(Some(machine))),
        })
    }

    /// The supervision event loop. It keeps the link alive until
    /// [`stop`](Supervisor::stop) is called and returns an exit status: **`0`**
    /// for a requested stop, **`1`** if the loop could not go on.
    ///
    /// Only the first call runs the loop, later calls return `1` immediately.
    pub fn run(&self) -> i8 {
        let taken = lock(&self.machine).take();
        let mut sm = match taken {
            Some(sm) => sm,
            None => {
                warn!(
                    "supervision of {} is already running or finished",
                    self.shared.settings.path
                );
                return 1;
            }
        };
        loop {
            sm = sm.step();
            if let SupervisorStates::Done(done) = &sm {
                if done.state.should_exit {
                    return if done.state.with_error { 1 } else { 0 };
                }
            }
        }
    }

    /// Write `message` to the device, reporting failures instead of returning
    /// them.
    ///
    /// A failed write doesn't affect the link, only a failed read triggers a
    /// reconnect. Writes issued while reconnecting are dropped.
    pub fn write(&self, message: &[u8]) {
        if let Err(e) = self.try_write(message) {
            warn!("{}", e);
            self.shared.report(
                style(format!("[TT] ⚠ Error writing to {}: {}", self.path(), e)).yellow(),
            );
        }
    }

    /// Write `message` to the current handle and return the number of bytes
    /// written.
    pub fn try_write(&self, message: &[u8]) -> Result<usize> {
        self.shared.link.write(message)
    }

    /// Ask the supervision loop to end. The loop notices within one read
    /// timeout, or before its next reconnect attempt.
    pub fn stop(&self) {
        debug!("stop requested for {}", self.path());
        self.shared.stop.store(true, Ordering::SeqCst);
    }

    pub fn state(&self) -> LinkState {
        *lock(&self.shared.state)
    }

    /// The generation of the live handle. Starts at `1` and is incremented by
    /// each successful reconnect.
    pub fn generation(&self) -> u64 {
        self.shared.link.generation()
    }

    /// Number of times the link was lost and restored.
    pub fn recoveries(&self) -> usize {
        self.shared.recoveries.load(Ordering::SeqCst)
    }

    /// The supervised port.
    pub fn path(&self) -> &str {
        &self.shared.settings.path
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.shared, f)
    }
}

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Data shared by all states and by the read task.
pub(crate) struct Shared {
    pub settings: Settings,
    pub opener: Box<dyn Opener>,
    pub link: Link,
    sink: Mutex<Box<dyn Write + Send>>,
    diagnostics: Mutex<Box<dyn Write + Send>>,
    stop: AtomicBool,
    state: Mutex<LinkState>,
    recoveries: AtomicUsize,
}

impl Shared {
    /// Forward bytes read from the device to the output sink, as received.
    pub(crate) fn emit(&self, bytes: &[u8]) {
        // Dump the received data in a hex table for debugging
        if log_enabled!(Trace) {
            let view = HexViewBuilder::new(bytes)
                .address_offset(0)
                .row_width(16)
                .finish();
            trace!("\n{}", view);
        }

        let mut sink = lock(&self.sink);
        if let Err(e) = sink.write_all(bytes).and_then(|_| sink.flush()) {
            debug!("could not forward {} bytes: {}", bytes.len(), e);
        }
    }

    /// Print a diagnostic line for the user, next to the data stream.
    pub(crate) fn report(&self, line: impl Display) {
        let mut diagnostics = lock(&self.diagnostics);
        if let Err(e) = writeln!(diagnostics, "{}", line).and_then(|_| diagnostics.flush()) {
            debug!("could not report a diagnostic: {}", e);
        }
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub(crate) fn set_state(&self, state: LinkState) {
        *lock(&self.state) = state;
    }

    pub(crate) fn recovered(&self) {
        self.recoveries.fetch_add(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("path", &self.settings.path)
            .field("baud_rate", &self.settings.baud_rate)
            .field("generation", &self.link.generation())
            .field("state", &*lock(&self.state))
            .finish()
    }
}

// =============================================================================
// Private stuff
// =============================================================================

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// -----------------------------------------------------------------------------
// The State Machine
// -----------------------------------------------------------------------------

/// The state machine implementing the supervision of one link.
///
/// The generic type holds the current state, while `shared` carries what all
/// states need: settings, opener, the live handle and the output sink.
#[derive(Debug)]
struct SupervisorSM<S: Runnable> {
    shared: Arc<Shared>,
    state: S,
}
impl<S: Runnable> SupervisorSM<S> {
    fn run(&mut self) -> Event {
        self.state.run(&self.shared)
    }
}

/// Supervision starts with the port already open, in the `Reading` state.
impl SupervisorSM<ReadingState> {
    fn new(shared: Arc<Shared>) -> Self {
        SupervisorSM {
            shared,
            state: ReadingState {},
        }
    }
}

/// Wraps the state machine and its various states into a simple enum, which can
/// also be used for pattern matching during state transitions.
enum SupervisorStates {
    Reading(SupervisorSM<ReadingState>),
    Reconnecting(SupervisorSM<ReconnectingState>),
    Done(SupervisorSM<DoneState>),
}
impl SupervisorStates {
    /// The unit of work in the event loop: run the current state and turn the
    /// event it returns into the next state.
    fn step(self) -> Self {
        match self {
            SupervisorStates::Reading(mut sm) => match sm.run() {
                Event::LinkBroken(ev) => SupervisorStates::Reconnecting(ev.into()),
                Event::Stop(ev) => SupervisorStates::Done(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            SupervisorStates::Reconnecting(mut sm) => match sm.run() {
                Event::LinkRestored(ev) => SupervisorStates::Reading(ev.into()),
                Event::Stop(ev) => SupervisorStates::Done(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
            SupervisorStates::Done(mut sm) => match sm.run() {
                Event::Exit(ev) => SupervisorStates::Done(ev.into()),
                event => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
            },
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<LinkBrokenEvent> for SupervisorSM<ReconnectingState> {
    fn from(event: LinkBrokenEvent) -> SupervisorSM<ReconnectingState> {
        SupervisorSM {
            shared: event.shared,
            state: ReconnectingState { cause: event.cause },
        }
    }
}

impl From<LinkRestoredEvent> for SupervisorSM<ReadingState> {
    fn from(event: LinkRestoredEvent) -> SupervisorSM<ReadingState> {
        debug!("reading from handle generation {}", event.generation);
        SupervisorSM {
            shared: event.shared,
            state: ReadingState {},
        }
    }
}

impl From<StopEvent> for SupervisorSM<DoneState> {
    fn from(event: StopEvent) -> SupervisorSM<DoneState> {
        SupervisorSM {
            shared: event.shared,
            state: DoneState {
                with_error: event.with_error,
                should_exit: false,
            },
        }
    }
}
impl From<ExitEvent> for SupervisorSM<DoneState> {
    fn from(event: ExitEvent) -> SupervisorSM<DoneState> {
        SupervisorSM {
            shared: event.shared,
            state: DoneState {
                with_error: event.with_error,
                should_exit: true,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
