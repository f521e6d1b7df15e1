//! Events for the `tether` supervision state machine.
//!
//! This modules is private and restricted to the
//! [`supervisor`](crate::supervisor) scope. The public interface of the state
//! machine is provided by [`supervisor`](crate::supervisor).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::sync::Arc;

use super::state_machine::Shared;
use crate::error::Error;

// =============================================================================
// Crate-Public Interface
// =============================================================================

// LinkBrokenEvent =============================================================

/// Event fired when the read task hits an I/O error that is not an idle line.
/// It triggers the transition from `Reading` to `Reconnecting`.
#[derive(Debug)]
pub(crate) struct LinkBrokenEvent {
    pub shared: Arc<Shared>,
    /// What the read task saw, reported once by the `Reconnecting` state.
    pub cause: Error,
}

// LinkRestoredEvent ===========================================================

/// Event fired when the port was opened again. It triggers the transition
/// from `Reconnecting` back to `Reading`.
#[derive(Debug)]
pub(crate) struct LinkRestoredEvent {
    pub shared: Arc<Shared>,
    pub generation: u64,
}

// StopEvent ===================================================================

/// Event fired when supervision ends, either on request or because the loop
/// can't go on. It triggers the transition to the `Done` state.
#[derive(Debug)]
pub(crate) struct StopEvent {
    pub shared: Arc<Shared>,
    pub with_error: bool,
}

// ExitEvent ===================================================================

/// The last event of the state machine. The event loop returns its status
/// once this event has been processed.
#[derive(Debug)]
pub(crate) struct ExitEvent {
    pub shared: Arc<Shared>,
    pub with_error: bool,
}

// Events enum =================================================================

#[derive(Debug)]
pub(crate) enum Event {
    LinkBroken(LinkBrokenEvent),
    LinkRestored(LinkRestoredEvent),
    Stop(StopEvent),
    Exit(ExitEvent),
}

// Read task signals ===========================================================

/// What the read task hands back to the supervision loop when it ends.
#[derive(Debug)]
pub(crate) enum Signal {
    LinkBroken(Error),
    Stopped,
}
