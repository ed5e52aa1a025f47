//! One-shot GPIO initialization and raw line access.
//!
//! Configures relay/LED outputs and the pulled-up sensor and button inputs
//! using raw ESP-IDF sys calls, then probes which optional hardware is
//! actually connected.  Called once from `main()` before the control loop
//! starts.
//!
//! Off-target the lines are simulated per thread: outputs remember the last
//! level written, inputs float HIGH (pulled up) unless a test drives them
//! with [`sim_set_input`].

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

use crate::pins;
use crate::valve::HardwareProbe;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

/// Configure every line and probe the optional position sensors.
///
/// A sensor counts as present when either limit switch reads active
/// (LOW) at startup, i.e. the valve is resting against one of its stops.
pub fn init_peripherals() -> Result<HardwareProbe, HwInitError> {
    configure_lines()?;

    let probe = HardwareProbe {
        gpio: true,
        position_sensor: !gpio_read(pins::OPEN_SENSOR_GPIO)
            || !gpio_read(pins::CLOSED_SENSOR_GPIO),
    };
    info!(
        "hw_init: GPIO configured, position sensor {}",
        if probe.position_sensor {
            "detected"
        } else {
            "not detected"
        }
    );
    Ok(probe)
}

#[cfg(target_os = "espidf")]
fn configure_lines() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()
    }
}

#[cfg(not(target_os = "espidf"))]
fn configure_lines() -> Result<(), HwInitError> {
    for &pin in &pins::OUTPUTS {
        gpio_write(pin, false);
    }
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    for &pin in &pins::PULLED_UP_INPUTS {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: if pin == pins::BUTTON_GPIO {
                gpio_int_type_t_GPIO_INTR_NEGEDGE
            } else {
                gpio_int_type_t_GPIO_INTR_DISABLE
            },
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    sim::level(pin)
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    for &pin in &pins::OUTPUTS {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // pin was validated during init_gpio_outputs(). Main-loop only.
    unsafe { gpio_set_level(pin, if high { 1 } else { 0 }); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    sim::set(pin, high);
}

// ── Uptime ────────────────────────────────────────────────────

/// Milliseconds since boot, truncated to u32 (wraps after ~49 days).
#[cfg(target_os = "espidf")]
pub fn uptime_ms() -> u32 {
    // SAFETY: esp_timer_get_time is a counter read.
    ((unsafe { esp_timer_get_time() }) / 1_000) as u32
}

#[cfg(not(target_os = "espidf"))]
pub fn uptime_ms() -> u32 {
    sim::uptime_ms()
}

/// Milliseconds since boot without wrap, for long-lived deadlines.
#[cfg(target_os = "espidf")]
pub fn monotonic_ms() -> u64 {
    // SAFETY: esp_timer_get_time is a counter read.
    ((unsafe { esp_timer_get_time() }) / 1_000).max(0) as u64
}

#[cfg(not(target_os = "espidf"))]
pub fn monotonic_ms() -> u64 {
    sim::monotonic_ms()
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::drivers::button::button_isr_handler(uptime_ms());
}

/// Install the GPIO ISR service and hook the button falling edge.
/// Call after init_peripherals() and before the control loop.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable). The handler only stores
    // an atomic timestamp.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_set_intr_type(pins::BUTTON_GPIO, gpio_int_type_t_GPIO_INTR_NEGEDGE);
        gpio_isr_handler_add(pins::BUTTON_GPIO, Some(button_gpio_isr), core::ptr::null_mut());
        gpio_intr_enable(pins::BUTTON_GPIO);
    }
    info!("hw_init: ISR service installed (button)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    info!("hw_init(sim): ISR service skipped");
    Ok(())
}

// ── Simulation ────────────────────────────────────────────────

/// Drive a simulated input line (tests only; inputs idle HIGH).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_input(pin: i32, high: bool) {
    sim::set(pin, high);
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::cell::Cell;
    use std::time::Instant;

    thread_local! {
        // One bit per GPIO; every line starts HIGH like a pulled-up input.
        static LEVELS: Cell<u64> = const { Cell::new(u64::MAX) };
        static BOOT: Instant = Instant::now();
    }

    pub fn level(pin: i32) -> bool {
        LEVELS.with(|l| l.get() & (1u64 << pin) != 0)
    }

    pub fn set(pin: i32, high: bool) {
        LEVELS.with(|l| {
            let bits = l.get();
            l.set(if high { bits | (1u64 << pin) } else { bits & !(1u64 << pin) });
        });
    }

    pub fn uptime_ms() -> u32 {
        monotonic_ms() as u32
    }

    pub fn monotonic_ms() -> u64 {
        BOOT.with(|b| b.elapsed().as_millis() as u64)
    }
}
