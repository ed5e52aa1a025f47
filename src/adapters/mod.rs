//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements     | Connects to                     |
//! |--------------|----------------|---------------------------------|
//! | `forecast`   | ForecastPort   | weather.gov digital DWML (HTTPS)|
//! | `hardware`   | ValvePort      | relays, LEDs, limit switches    |
//! | `log_sink`   | EventSink      | Serial log output               |
//! | `nvs`        | StatePort      | NVS / in-memory store           |
//! | `time`       | TimePort       | SNTP wall clock, FreeRTOS delay |
//! | `wifi`       | (none)         | ESP-IDF WiFi STA + SNTP         |

pub mod forecast;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
