//! Valve limit switches.
//!
//! Each switch pulls its line LOW when the valve rests against that stop.
//! No debouncing: the actuator samples every 100 ms and only needs one
//! active reading.

use crate::drivers::hw_init;
use crate::error::ValvePosition;
use crate::pins;

pub struct PositionSensor {
    open_gpio: i32,
    closed_gpio: i32,
}

impl Default for PositionSensor {
    fn default() -> Self {
        Self::new(pins::OPEN_SENSOR_GPIO, pins::CLOSED_SENSOR_GPIO)
    }
}

impl PositionSensor {
    pub fn new(open_gpio: i32, closed_gpio: i32) -> Self {
        Self {
            open_gpio,
            closed_gpio,
        }
    }

    /// The switch for `position` is active (line LOW).
    pub fn at(&self, position: ValvePosition) -> bool {
        let gpio = match position {
            ValvePosition::Open => self.open_gpio,
            ValvePosition::Closed => self.closed_gpio,
        };
        !hw_init::gpio_read(gpio)
    }
}
