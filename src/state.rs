//! Durable controller state.
//!
//! [`PersistedState`] is the one record that survives restarts: the station
//! configuration plus the rolling forecast/history bookkeeping.  It is
//! stored as a single JSON document whose fields are flat (the
//! configuration is flattened in), so the record reads the same on disk as
//! it does in the type.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::StationConfig;
use crate::error::{Error, Result};
use crate::history::RainHistory;

/// What startup catch-up did with the cached forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchUp {
    /// Less than one interval has passed; nothing to replay.
    UpToDate,
    /// This many missed intervals were reconstructed from the cache.
    Replayed(usize),
    /// The cache could not cover the gap; both sequences were cleared and
    /// the next check is due immediately.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(flatten)]
    pub config: StationConfig,
    /// Epoch seconds of the last completed cycle.
    pub last_check_time: i64,
    /// Last good forecast, index 0 = the hour it was fetched in.
    #[serde(default)]
    pub cached_forecast: Vec<f32>,
    #[serde(default)]
    pub historical_rain: RainHistory,
    /// Last decision; `true` disables watering.
    #[serde(default)]
    pub rain_forecasted: bool,
}

impl PersistedState {
    /// Fresh record produced by first-run setup.
    pub fn new(config: StationConfig, now: i64) -> Self {
        Self {
            config,
            last_check_time: now,
            cached_forecast: Vec::new(),
            historical_rain: RainHistory::new(),
            rain_forecasted: false,
        }
    }

    /// Decode and validate a stored record.
    ///
    /// Anything unreadable is [`Error::ConfigInvalid`], which sends the
    /// caller to first-run setup.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let state: Self = serde_json::from_slice(bytes)
            .map_err(|_| Error::ConfigInvalid("state record is not valid JSON"))?;
        state.validated()
    }

    /// Clamp and check a decoded record.
    pub fn validated(mut self) -> Result<Self> {
        self.config = self.config.validated()?;
        if self.cached_forecast.iter().any(|v| !v.is_finite()) {
            return Err(Error::ConfigInvalid("cached forecast holds a non-finite value"));
        }
        if self.historical_rain.iter().any(|v| !v.is_finite()) {
            return Err(Error::ConfigInvalid("rain history holds a non-finite value"));
        }
        Ok(self)
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Epoch seconds at which the next check is due.
    pub fn next_due(&self) -> i64 {
        self.last_check_time
            .saturating_add(self.config.check_interval_secs())
    }

    pub fn is_due(&self, now: i64) -> bool {
        now >= self.next_due()
    }

    /// Reconstruct the history for intervals missed while powered off.
    ///
    /// Each missed interval moves the first cached forecast hour into the
    /// history, as long as the cache still holds more than
    /// `look_ahead + 1` hours.  The schedule phase is preserved, so after a
    /// full replay the next check is due within one interval.
    pub fn catch_up(&mut self, now: i64) -> CatchUp {
        let interval = self.config.check_interval_secs();
        let elapsed = now - self.last_check_time;
        if elapsed < interval {
            return CatchUp::UpToDate;
        }

        let missed = (elapsed / interval) as usize;
        let min_cache = self.config.look_ahead_hours as usize + 1;
        info!(
            "Last check was {} min ago, {} interval(s) missed",
            elapsed / 60,
            missed
        );

        for replayed in 0..missed {
            if self.cached_forecast.len() <= min_cache {
                warn!(
                    "Insufficient cached data after {} interval(s), clearing stale history",
                    replayed
                );
                self.cached_forecast.clear();
                self.historical_rain.clear();
                self.last_check_time = now - interval;
                return CatchUp::Reset;
            }
            let hour = self.cached_forecast.remove(0);
            self.historical_rain.push_front(hour);
        }

        self.last_check_time += missed as i64 * interval;
        CatchUp::Replayed(missed)
    }
}
