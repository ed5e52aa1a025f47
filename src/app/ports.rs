//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (forecast client, valve hardware, storage, clock, event
//! sinks) implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware or
//! the network directly.

use crate::config::Location;
use crate::error::{FetchError, ValvePosition};
use crate::state::PersistedState;

// ───────────────────────────────────────────────────────────────
// Forecast port (driven adapter: network → domain)
// ───────────────────────────────────────────────────────────────

/// Source of hourly quantitative precipitation forecasts.
pub trait ForecastPort {
    /// Blocking fetch of hourly QPF values (inches/hour), index 0 = the
    /// current hour.
    fn fetch(&mut self, location: Location) -> Result<Vec<f32>, FetchError>;
}

// ───────────────────────────────────────────────────────────────
// Valve port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Relays, indicator lights and position sensors of the bypass valve.
pub trait ValvePort {
    /// Assert the relay for `target` and de-assert the other one.
    /// Never leaves both asserted.
    fn drive_relays(&mut self, target: ValvePosition);

    /// De-assert both relays.
    fn release_relays(&mut self);

    /// Green (enabled) / red (disabled) watering lights.
    fn set_watering_lights(&mut self, enabled: bool);

    /// Data-error indicator.
    fn set_data_error(&mut self, on: bool);

    /// Sample the active-low sensor for `target`.
    fn position_reached(&mut self, target: ValvePosition) -> bool;

    /// A termination request is pending; long waits should bail out.
    /// Sampled on every sensor poll, so adapters may service inputs here.
    fn abort_requested(&mut self) -> bool {
        false
    }
}

// ───────────────────────────────────────────────────────────────
// State port (driven adapter: domain ↔ persistent storage)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the controller record.
///
/// Writes MUST be atomic: a power cut during `save` leaves either the old
/// or the new record, never a torn one.
pub trait StatePort {
    /// Load the stored record.  [`StateError::NotFound`] on a fresh device.
    fn load(&self) -> Result<PersistedState, StateError>;

    fn save(&mut self, state: &PersistedState) -> Result<(), StateError>;
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source.  Must be NTP-synchronised before the scheduler runs.
pub trait TimePort {
    fn now_epoch_secs(&self) -> i64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / display)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, a
/// status display, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StatePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// No record in storage (first boot).
    NotFound,
    /// Stored record failed deserialisation.
    Corrupted,
    /// A field failed validation.
    Invalid(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for StateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "state not found"),
            Self::Corrupted => write!(f, "state corrupted"),
            Self::Invalid(msg) => write!(f, "invalid state: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for StateError {}
