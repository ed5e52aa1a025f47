//! Bypass valve actuator.
//!
//! Drives the motorised valve to the position matching a watering decision
//! and, when a position sensor is available, waits for it to confirm.
//! Relays are always released before [`ValveActuator::set_target`] returns,
//! whatever the outcome.
//!
//! ```text
//!           set_target(true)            confirmed / unconfirmed
//!   Idle ──────────────────▶ Opening ─────────────────────────▶ Idle
//!     │                         │ timeout (sensor configured)
//!     │  set_target(false)      ▼
//!     └───────────────▶ Closing ──▶ Failed
//! ```

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::app::ports::ValvePort;
use crate::error::{Error, Result, ValvePosition};

/// Give up waiting for the position sensor after this long.
pub const VALVE_TIMEOUT_MS: u32 = 30_000;

/// Position sensor sampling period.
pub const SENSOR_POLL_MS: u32 = 100;

/// Capabilities discovered at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardwareProbe {
    /// GPIO lines were configured successfully.
    pub gpio: bool,
    /// A position sensor line read active at startup.
    pub position_sensor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    Idle,
    Opening,
    Closing,
    /// The last move timed out with a configured sensor.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveOutcome {
    /// The sensor reported the target position.
    Confirmed,
    /// No sensor to poll; the relays were pulsed blind.
    FireAndForget,
    /// A detected (but not configured) sensor never confirmed.
    Unconfirmed,
    /// A shutdown request interrupted the poll.
    Aborted,
}

pub struct ValveActuator {
    state: ValveState,
    has_sensor: bool,
    probe: HardwareProbe,
}

impl ValveActuator {
    pub fn new(has_sensor: bool, probe: HardwareProbe) -> Self {
        Self {
            state: ValveState::Idle,
            has_sensor,
            probe,
        }
    }

    pub fn state(&self) -> ValveState {
        self.state
    }

    /// Whether moves are confirmed by polling a sensor line.
    pub fn polls_sensor(&self) -> bool {
        self.probe.gpio && (self.has_sensor || self.probe.position_sensor)
    }

    /// Drive the valve open (`enabled`) or closed.
    ///
    /// Re-drives on every call, even if the valve is already there.  A
    /// timeout is only an error when `valve_has_sensor` is configured.
    pub fn set_target(
        &mut self,
        enabled: bool,
        io: &mut impl ValvePort,
        delay: &mut impl DelayNs,
    ) -> Result<ValveOutcome> {
        let target = ValvePosition::for_watering(enabled);
        self.state = if enabled {
            ValveState::Opening
        } else {
            ValveState::Closing
        };
        info!(
            "Watering {}. {} valve...",
            if enabled { "ENABLED" } else { "DISABLED" },
            target
        );

        io.drive_relays(target);
        io.set_watering_lights(enabled);

        let result = if self.polls_sensor() {
            self.wait_for(target, io, delay)
        } else {
            Ok(ValveOutcome::FireAndForget)
        };

        io.release_relays();
        self.state = if result.is_err() {
            ValveState::Failed
        } else {
            ValveState::Idle
        };
        result
    }

    /// De-assert both relays immediately.
    pub fn release(&mut self, io: &mut impl ValvePort) {
        io.release_relays();
        if matches!(self.state, ValveState::Opening | ValveState::Closing) {
            self.state = ValveState::Idle;
        }
    }

    fn wait_for(
        &self,
        target: ValvePosition,
        io: &mut impl ValvePort,
        delay: &mut impl DelayNs,
    ) -> Result<ValveOutcome> {
        let mut waited_ms = 0;
        loop {
            if io.abort_requested() {
                warn!("Valve {} aborted", target);
                return Ok(ValveOutcome::Aborted);
            }
            if io.position_reached(target) {
                info!("Valve {} confirmed after {} ms", target, waited_ms);
                return Ok(ValveOutcome::Confirmed);
            }
            if waited_ms >= VALVE_TIMEOUT_MS {
                break;
            }
            delay.delay_ms(SENSOR_POLL_MS);
            waited_ms += SENSOR_POLL_MS;
        }

        if self.has_sensor {
            error!("Valve {} FAILED", target);
            Err(Error::ValveMoveTimeout(target))
        } else {
            warn!("Valve {} not confirmed by detected sensor", target);
            Ok(ValveOutcome::Unconfirmed)
        }
    }
}
