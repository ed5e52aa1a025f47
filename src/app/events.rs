//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, draw a status screen,
//! etc.

use crate::config::StationConfig;
use crate::error::ValvePosition;
use crate::scheduler::Cycle;
use crate::state::CatchUp;
use crate::valve::ValveOutcome;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service started with this configuration.
    Started(StationConfig),

    /// Startup reconstruction of missed intervals.
    CaughtUp(CatchUp),

    /// A forecast check is starting.
    CheckStarted,

    /// A forecast check finished (fresh, cached or exhausted).
    CycleCompleted(Cycle),

    /// The valve was driven.
    ValveMoved {
        position: ValvePosition,
        outcome: ValveOutcome,
    },

    /// The valve did not confirm the move.
    ValveFailed(ValvePosition),

    /// Seconds until the next scheduled check.
    NextCheck { in_secs: u64 },

    /// The record could not be written.
    PersistFailed,

    /// Termination request handled; relays are released.
    Shutdown,
}
