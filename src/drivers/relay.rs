//! Valve relay pair driver.
//!
//! Two relays reverse the valve motor: one drives it open, the other
//! closed.  Asserting both would short the motor supply, so every change
//! releases the opposite relay before energising the requested one.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives GPIO via hw_init helpers.
//! On host/test: writes the simulated lines.

use crate::drivers::hw_init;
use crate::error::ValvePosition;
use crate::pins;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Released,
    Driving(ValvePosition),
}

pub struct RelayDriver {
    open_gpio: i32,
    close_gpio: i32,
    state: RelayState,
}

impl Default for RelayDriver {
    fn default() -> Self {
        Self::new(pins::OPEN_RELAY_GPIO, pins::CLOSE_RELAY_GPIO)
    }
}

impl RelayDriver {
    pub fn new(open_gpio: i32, close_gpio: i32) -> Self {
        let mut relays = Self {
            open_gpio,
            close_gpio,
            state: RelayState::Released,
        };
        relays.release();
        relays
    }

    pub fn drive(&mut self, target: ValvePosition) {
        let (on, off) = match target {
            ValvePosition::Open => (self.open_gpio, self.close_gpio),
            ValvePosition::Closed => (self.close_gpio, self.open_gpio),
        };
        hw_init::gpio_write(off, false);
        hw_init::gpio_write(on, true);
        self.state = RelayState::Driving(target);
    }

    pub fn release(&mut self) {
        hw_init::gpio_write(self.open_gpio, false);
        hw_init::gpio_write(self.close_gpio, false);
        self.state = RelayState::Released;
    }

    pub fn state(&self) -> RelayState {
        self.state
    }
}
