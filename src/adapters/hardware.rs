//! Hardware adapter: bridges the valve drivers to the domain port trait.
//!
//! Owns the relay pair, the indicator LEDs, the limit switches and the
//! button, exposing them through [`ValvePort`].  This is the only module
//! in the system that touches actual hardware.  On non-espidf targets,
//! the underlying drivers use cfg-gated simulation stubs.

use crate::app::ports::ValvePort;
use crate::drivers::button::{ButtonDriver, ButtonEvent};
use crate::drivers::hw_init;
use crate::drivers::indicator::IndicatorLights;
use crate::drivers::position_sensor::PositionSensor;
use crate::drivers::relay::{RelayDriver, RelayState};
use crate::error::ValvePosition;
use crate::events::{self, Event};
use crate::pins;

/// Concrete adapter that combines all valve hardware behind [`ValvePort`].
pub struct HardwareAdapter {
    relays: RelayDriver,
    lights: IndicatorLights,
    sensor: PositionSensor,
    button: ButtonDriver,
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new(
            RelayDriver::default(),
            IndicatorLights::new(),
            PositionSensor::default(),
            ButtonDriver::new(pins::BUTTON_GPIO),
        )
    }
}

impl HardwareAdapter {
    pub fn new(
        relays: RelayDriver,
        lights: IndicatorLights,
        sensor: PositionSensor,
        button: ButtonDriver,
    ) -> Self {
        Self {
            relays,
            lights,
            sensor,
            button,
        }
    }

    /// Classify button gestures and turn them into events.
    /// Long press latches the shutdown flag; short press queues a check.
    pub fn poll_button(&mut self) -> Option<ButtonEvent> {
        let gesture = self.button.tick(hw_init::uptime_ms())?;
        match gesture {
            ButtonEvent::ShortPress => {
                log::info!("Button: short press, checking forecast");
                events::push_event(Event::ForceCheck);
            }
            ButtonEvent::LongPress => {
                log::warn!("Button: long press, shutting down");
                events::request_shutdown();
            }
        }
        Some(gesture)
    }

    pub fn relay_state(&self) -> RelayState {
        self.relays.state()
    }

    pub fn lights(&self) -> &IndicatorLights {
        &self.lights
    }
}

// ── ValvePort implementation ──────────────────────────────────

impl ValvePort for HardwareAdapter {
    fn drive_relays(&mut self, target: ValvePosition) {
        self.relays.drive(target);
    }

    fn release_relays(&mut self) {
        self.relays.release();
    }

    fn set_watering_lights(&mut self, enabled: bool) {
        self.lights.set_watering(enabled);
    }

    fn set_data_error(&mut self, on: bool) {
        self.lights.set_data_error(on);
    }

    fn position_reached(&mut self, target: ValvePosition) -> bool {
        self.sensor.at(target)
    }

    fn abort_requested(&mut self) -> bool {
        self.poll_button();
        events::shutdown_requested()
    }
}
