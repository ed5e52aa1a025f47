//! RainBypass controller library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod pins;
pub mod rainfall;
pub mod scheduler;
pub mod state;
pub mod valve;

// Hardware and network adapters; host builds get the simulation backends.
pub mod adapters;
pub mod drivers;
