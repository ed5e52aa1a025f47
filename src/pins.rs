//! GPIO pin assignments for the RainBypass controller board (ESP32-S3).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Valve relays (motorised ball valve, reversing pair)
// ---------------------------------------------------------------------------

/// Digital output: HIGH drives the valve towards open (watering enabled).
pub const OPEN_RELAY_GPIO: i32 = 17;
/// Digital output: HIGH drives the valve towards closed (watering disabled).
/// Never asserted together with [`OPEN_RELAY_GPIO`].
pub const CLOSE_RELAY_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Indicator LEDs
// ---------------------------------------------------------------------------

/// Red LED: forecast data unavailable.
pub const DATA_ERROR_LED_GPIO: i32 = 11;
/// Green LED: watering enabled.
pub const ENABLED_LED_GPIO: i32 = 13;
/// Red LED: watering disabled.
pub const DISABLED_LED_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Valve position sensors (limit switches, active-low with pull-up)
// ---------------------------------------------------------------------------

/// LOW = valve fully closed.
pub const CLOSED_SENSOR_GPIO: i32 = 5;
/// LOW = valve fully open.
pub const OPEN_SENSOR_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// User button (BOOT button, active-low with pull-up)
// ---------------------------------------------------------------------------

/// Short press: check the forecast now.  Long press: persist and stop.
pub const BUTTON_GPIO: i32 = 0;

/// All push-pull outputs, driven LOW at init.
pub const OUTPUTS: [i32; 5] = [
    OPEN_RELAY_GPIO,
    CLOSE_RELAY_GPIO,
    DATA_ERROR_LED_GPIO,
    ENABLED_LED_GPIO,
    DISABLED_LED_GPIO,
];

/// Inputs with the internal pull-up enabled.
pub const PULLED_UP_INPUTS: [i32; 3] = [CLOSED_SENSOR_GPIO, OPEN_SENSOR_GPIO, BUTTON_GPIO];
