//! Station configuration.
//!
//! Everything the first-run setup decides: where the station is, how far
//! ahead and behind to look for rain, and how much rain disables watering.
//! The values are persisted as part of [`PersistedState`](crate::state::PersistedState)
//! and never change at runtime.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest look-ahead / look-behind window, and the history capacity (7 days).
pub const MAX_WINDOW_HOURS: u16 = 168;

/// Hours per week; the factor that turns a mean hourly rate into in/week.
pub const HOURS_PER_WEEK: f32 = 168.0;

/// Forecast checks per 24 hours.  Must stay hourly for the history to line
/// up with the hourly QPF buckets.
pub const CHECKS_PER_DAY: u32 = 24;

/// Interval between checks derived from [`CHECKS_PER_DAY`].
pub const DEFAULT_CHECK_INTERVAL_SECS: u32 = 86_400 / CHECKS_PER_DAY;

/// Retry delay after a failed fetch that the cache could not cover.
pub const CACHE_RETRY_SECS: i64 = 60;

/// Geographic point the forecast is requested for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Core station configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    // --- Location ---
    pub latitude: f64,
    pub longitude: f64,

    // --- Windows ---
    /// Forecast hours past the current hour included in the rate.
    pub look_ahead_hours: u16,
    /// Historical hours included in the rate.
    pub look_behind_hours: u16,

    // --- Decision ---
    /// Weekly rainfall (inches) above which watering is disabled.
    pub rainfall_limit: f32,

    // --- Timing ---
    /// Seconds between forecast checks.
    pub check_interval_seconds: u32,

    // --- Valve ---
    /// A position sensor is wired; unconfirmed moves are failures.
    #[serde(default)]
    pub valve_has_sensor: bool,
    /// Re-drive the valve every cycle even when the decision is unchanged.
    #[serde(default)]
    pub force_valve: bool,
}

impl Default for StationConfig {
    /// Placeholder location; real stations always come from setup.
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            look_ahead_hours: 48,
            look_behind_hours: 48,
            rainfall_limit: 1.0,
            check_interval_seconds: DEFAULT_CHECK_INTERVAL_SECS,
            valve_has_sensor: false,
            force_valve: false,
        }
    }
}

/// Answers collected by the first-run setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetupAnswers {
    pub latitude: f64,
    pub longitude: f64,
    pub look_ahead_hours: u32,
    pub look_behind_hours: u32,
    pub rainfall_limit: f32,
    pub valve_has_sensor: bool,
}

/// Raw first-run answers as text, e.g. from build-time environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetupText<'a> {
    pub latitude: &'a str,
    pub longitude: &'a str,
    pub look_ahead_hours: &'a str,
    pub look_behind_hours: &'a str,
    pub rainfall_limit: &'a str,
    pub valve_has_sensor: &'a str,
}

impl SetupAnswers {
    /// Parse setup text.  Any field that does not parse is `ConfigInvalid`;
    /// an empty sensor answer means no sensor.
    pub fn parse(text: SetupText<'_>) -> Result<Self> {
        Ok(Self {
            latitude: text
                .latitude
                .trim()
                .parse()
                .map_err(|_| Error::ConfigInvalid("latitude is not a number"))?,
            longitude: text
                .longitude
                .trim()
                .parse()
                .map_err(|_| Error::ConfigInvalid("longitude is not a number"))?,
            look_ahead_hours: text
                .look_ahead_hours
                .trim()
                .parse()
                .map_err(|_| Error::ConfigInvalid("look-ahead is not a whole number of hours"))?,
            look_behind_hours: text
                .look_behind_hours
                .trim()
                .parse()
                .map_err(|_| Error::ConfigInvalid("look-behind is not a whole number of hours"))?,
            rainfall_limit: text
                .rainfall_limit
                .trim()
                .parse()
                .map_err(|_| Error::ConfigInvalid("rainfall limit is not a number"))?,
            valve_has_sensor: parse_yes_no(text.valve_has_sensor)?,
        })
    }
}

fn parse_yes_no(answer: &str) -> Result<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Ok(true),
        "" | "n" | "no" | "false" | "0" => Ok(false),
        _ => Err(Error::ConfigInvalid("valve sensor answer must be yes or no")),
    }
}

impl StationConfig {
    /// Build the configuration for a fresh station.
    ///
    /// Windows are clamped like a loaded record; the check interval is
    /// always the hourly default.
    pub fn from_setup(answers: SetupAnswers) -> Result<Self> {
        Self {
            latitude: answers.latitude,
            longitude: answers.longitude,
            look_ahead_hours: answers.look_ahead_hours.min(u32::from(MAX_WINDOW_HOURS)) as u16,
            look_behind_hours: answers.look_behind_hours.min(u32::from(MAX_WINDOW_HOURS)) as u16,
            rainfall_limit: answers.rainfall_limit,
            check_interval_seconds: DEFAULT_CHECK_INTERVAL_SECS,
            valve_has_sensor: answers.valve_has_sensor,
            force_valve: false,
        }
        .validated()
    }

    /// Clamp the windows into `1..=168` and reject values the controller
    /// cannot work with.
    pub fn validated(mut self) -> Result<Self> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::ConfigInvalid("latitude must be -90..=90"));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::ConfigInvalid("longitude must be -180..=180"));
        }
        if !self.rainfall_limit.is_finite() || self.rainfall_limit < 0.0 {
            return Err(Error::ConfigInvalid("rainfall_limit must be a non-negative number"));
        }
        if self.check_interval_seconds == 0 {
            return Err(Error::ConfigInvalid("check_interval_seconds must be > 0"));
        }

        let ahead = clamp_window(self.look_ahead_hours);
        if ahead != self.look_ahead_hours {
            warn!(
                "look_ahead_hours {} out of range, using {}",
                self.look_ahead_hours, ahead
            );
            self.look_ahead_hours = ahead;
        }
        let behind = clamp_window(self.look_behind_hours);
        if behind != self.look_behind_hours {
            warn!(
                "look_behind_hours {} out of range, using {}",
                self.look_behind_hours, behind
            );
            self.look_behind_hours = behind;
        }
        Ok(self)
    }

    pub fn location(&self) -> Location {
        Location {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn check_interval_secs(&self) -> i64 {
        i64::from(self.check_interval_seconds)
    }
}

fn clamp_window(hours: u16) -> u16 {
    hours.clamp(1, MAX_WINDOW_HOURS)
}
