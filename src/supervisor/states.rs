//! States for the `tether` supervision state machine.
//!
//! This modules is private and restricted to the
//! [`supervisor`](crate::supervisor) scope. The public interface of the state
//! machine is provided by [`supervisor`](crate::supervisor).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::{
    io::{self, BufReader, Read},
    sync::{mpsc, Arc},
    thread,
};

use console::style;
use log::{debug, error, info, trace, warn};
use retry::{delay, retry_with_index, OperationResult};

use super::events::*;
use super::state_machine::{LinkState, Shared};
use crate::{device::Device, error::Error};

/// Size of the buffer each device read fills.
const READ_BUFFER_SIZE: usize = 256;

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// A state implements this method so it can be `run` after the state
    /// machine transitions into it.
    ///
    /// During this call, the state can do any work that needs to be done and
    /// when finished, requests a transition to a `new state` by returning the
    /// appropriate `event`. The `event` is then consumed to create the new
    /// `state` using the corresponding [`From`] trait implementation.
    fn run(&mut self, shared: &Arc<Shared>) -> Event;
}

// Reading State ===============================================================

/// The link is up and a read task streams whatever the device sends to the
/// output sink.
///
///  * **[`LinkBrokenEvent`] => [`ReconnectingState`]** when the read task hits
///    a real I/O error,
///  * **[`StopEvent`] => [`DoneState`]** when supervision is stopped.
///
/// The read task is joined before the event is returned, so it is never alive
/// while the state machine is reconnecting.
#[derive(Debug)]
pub(crate) struct ReadingState {}
impl Runnable for ReadingState {
    fn run(&mut self, shared: &Arc<Shared>) -> Event {
        info!("=> Reading");
        shared.set_state(LinkState::Reading);

        let (generation, device) = match shared.link.reader() {
            Ok(reader) => reader,
            Err(cause) => {
                return Event::LinkBroken(LinkBrokenEvent {
                    shared: Arc::clone(shared),
                    cause: Error::Link(cause),
                })
            }
        };

        let (signals, signal) = mpsc::channel();
        let task = {
            let shared = Arc::clone(shared);
            thread::Builder::new()
                .name(format!("tether-read-{}", generation))
                .spawn(move || read_loop(&shared, device, generation, &signals))
        };
        let task = match task {
            Ok(task) => task,
            Err(e) => {
                error!("could not start the read task: {}", e);
                return Event::Stop(StopEvent {
                    shared: Arc::clone(shared),
                    with_error: true,
                });
            }
        };

        let signal = signal.recv();
        if task.join().is_err() {
            error!("read task on {} panicked", shared.settings.path);
        }

        match signal {
            Ok(Signal::LinkBroken(cause)) => Event::LinkBroken(LinkBrokenEvent {
                shared: Arc::clone(shared),
                cause,
            }),
            Ok(Signal::Stopped) => Event::Stop(StopEvent {
                shared: Arc::clone(shared),
                with_error: false,
            }),
            // The read task went away without a word
            Err(_) => Event::Stop(StopEvent {
                shared: Arc::clone(shared),
                with_error: true,
            }),
        }
    }
}

// Reconnecting State ==========================================================

/// The link is down. The old handle is closed and the port is re-opened with
/// the original settings on a fixed interval, for as long as it takes.
///
///  * **[`LinkRestoredEvent`] => [`ReadingState`]** once the port opens again,
///  * **[`StopEvent`] => [`DoneState`]** when supervision is stopped.
#[derive(Debug)]
pub(crate) struct ReconnectingState {
    /// The error that broke the link.
    pub cause: Error,
}
impl Runnable for ReconnectingState {
    fn run(&mut self, shared: &Arc<Shared>) -> Event {
        info!("=> Reconnecting");
        shared.set_state(LinkState::Reconnecting);
        shared.link.close();

        let path = shared.settings.path.as_str();
        warn!("lost connection to {}: {}", path, self.cause);
        shared.report(
            style(format!("[TT] 💥 Connection to {} lost: {}", path, self.cause)).red(),
        );

        let millis = shared.settings.retry_interval.as_millis() as u64;
        // Failed attempts are expected while the device is unplugged, they are
        // only traced.
        let result = retry_with_index(
            delay::Fixed::from_millis(millis),
            |attempt| -> OperationResult<Box<dyn Device>, Error> {
                if shared.stop_requested() {
                    return OperationResult::Err(Error::Stopped);
                }
                match shared.opener.open(&shared.settings) {
                    Ok(device) => OperationResult::Ok(device),
                    Err(e) => {
                        trace!("reconnect attempt {} failed: {}", attempt, e);
                        OperationResult::Retry(e)
                    }
                }
            },
        );

        match result {
            Ok(device) => {
                let generation = shared.link.replace(device);
                shared.recovered();
                info!("Connection to {} re-established ({})", path, generation);
                shared.report(
                    style(format!("[TT] 🔌 Connection to {} re-established", path)).green(),
                );
                Event::LinkRestored(LinkRestoredEvent {
                    shared: Arc::clone(shared),
                    generation,
                })
            }
            Err(retry::Error::Operation {
                error: Error::Stopped,
                tries,
                ..
            }) => {
                debug!("reconnect to {} stopped after {} tries", path, tries);
                Event::Stop(StopEvent {
                    shared: Arc::clone(shared),
                    with_error: false,
                })
            }
            Err(retry::Error::Operation {
                error,
                total_delay,
                tries,
            }) => {
                error!(
                    "gave up on {} after {:?} and {} tries: {}",
                    path, total_delay, tries, error
                );
                Event::Stop(StopEvent {
                    shared: Arc::clone(shared),
                    with_error: true,
                })
            }
            Err(retry::Error::Internal(message)) => {
                error!("internal retry error while reconnecting: {}", message);
                Event::Stop(StopEvent {
                    shared: Arc::clone(shared),
                    with_error: true,
                })
            }
        }
    }
}

// Done State ==================================================================

/// Reached when supervision ends.
///
/// This state goes into a 2-phase execution. During the initial phase, it
/// closes the link and marks the supervisor as stopped. It then triggers the
/// [`ExitEvent`] to cause the event loop to terminate.
#[derive(Debug, Copy, Clone)]
pub(crate) struct DoneState {
    /// When `true`, indicates an abnormal completion caused by an error.
    pub with_error: bool,
    /// When `true` instructs the event loop to exit.
    pub should_exit: bool,
}
impl Runnable for DoneState {
    fn run(&mut self, shared: &Arc<Shared>) -> Event {
        info!(
            "=> Done with{}errors",
            if self.with_error { " " } else { " no " }
        );
        shared.link.close();
        shared.set_state(LinkState::Stopped);

        Event::Exit(ExitEvent {
            shared: Arc::clone(shared),
            with_error: self.with_error,
        })
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// Body of the read task: forward everything read until the link breaks or
/// supervision is stopped.
fn read_loop(
    shared: &Shared,
    device: Box<dyn Device>,
    generation: u64,
    signals: &mpsc::Sender<Signal>,
) {
    let mut reader = BufReader::new(device);
    let mut buf = [0; READ_BUFFER_SIZE];

    let signal = loop {
        if shared.stop_requested() {
            break Signal::Stopped;
        }
        match reader.read(&mut buf) {
            // End-of-stream, the device is just idle
            Ok(0) => {}
            Ok(n) => {
                trace!("{} bytes read from generation {}", n, generation);
                shared.emit(&buf[..n]);
            }
            Err(ref e) if is_idle(e) => {}
            Err(e) => {
                debug!("read on generation {} failed: {}", generation, e);
                break Signal::LinkBroken(Error::Link(e));
            }
        }
    };

    // The supervision loop is blocked on the other end until this arrives.
    let _ = signals.send(signal);
}

/// Outcomes of a read that only mean nothing arrived in time.
fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_reads() {
        for kind in &[
            io::ErrorKind::TimedOut,
            io::ErrorKind::WouldBlock,
            io::ErrorKind::Interrupted,
        ] {
            assert!(is_idle(&io::Error::new(*kind, "idle")));
        }
        assert!(!is_idle(&io::Error::new(io::ErrorKind::BrokenPipe, "gone")));
        assert!(!is_idle(&io::Error::new(io::ErrorKind::Other, "EIO")));
    }
}
