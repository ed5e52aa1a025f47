//! Indicator LEDs: watering enabled (green), watering disabled (red) and
//! forecast data error (red).  Dumb outputs; the service decides.

use crate::drivers::hw_init;
use crate::pins;

pub struct IndicatorLights {
    watering: Option<bool>,
    data_error: bool,
}

impl Default for IndicatorLights {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorLights {
    pub fn new() -> Self {
        Self {
            watering: None,
            data_error: false,
        }
    }

    pub fn set_watering(&mut self, enabled: bool) {
        hw_init::gpio_write(pins::ENABLED_LED_GPIO, enabled);
        hw_init::gpio_write(pins::DISABLED_LED_GPIO, !enabled);
        self.watering = Some(enabled);
    }

    pub fn set_data_error(&mut self, on: bool) {
        hw_init::gpio_write(pins::DATA_ERROR_LED_GPIO, on);
        self.data_error = on;
    }

    /// `None` until the first decision has been shown.
    pub fn watering(&self) -> Option<bool> {
        self.watering
    }

    pub fn data_error(&self) -> bool {
        self.data_error
    }
}
