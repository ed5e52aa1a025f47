//! Wall clock and blocking delay.
//!
//! - **`target_os = "espidf"`**: `gettimeofday()` (set by SNTP) and the
//!   FreeRTOS task delay.
//! - **`not(target_os = "espidf")`**: `std::time::SystemTime` and
//!   `std::thread::sleep` for host-side simulation.

use embedded_hal::delay::DelayNs;

use crate::app::ports::TimePort;

/// Anything earlier than 2020-01-01 means SNTP has not run yet.
pub const EPOCH_2020: i64 = 1_577_836_800;

/// Wall-clock adapter implementing [`TimePort`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }

    /// Whether the wall clock has been set.
    pub fn is_synced(&self) -> bool {
        self.now_epoch_secs() >= EPOCH_2020
    }
}

impl TimePort for SystemClock {
    #[cfg(target_os = "espidf")]
    fn now_epoch_secs(&self) -> i64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: gettimeofday writes into the provided struct only.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        tv.tv_sec as i64
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_epoch_secs(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64)
    }
}

/// Blocking delay used by the valve sensor poll.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingDelay;

impl DelayNs for BlockingDelay {
    #[cfg(target_os = "espidf")]
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_hal::delay::Ets::delay_us(ns.div_ceil(1_000));
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        // Yields to other tasks (and the idle watchdog) while waiting.
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
