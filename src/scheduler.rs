//! Forecast check scheduler.
//!
//! Decides when a forecast check is due, and resolves the outcome of a
//! check against the persisted state: fresh data, cached fallback, or a
//! short retry once the cache is exhausted.
//!
//! ```text
//!  AwaitingFirstFetch ──┐
//!                       ▼
//!  Waiting(due) ──now ≥ due──▶ Fetching ──resolve──▶ Idle ──finish──▶ Waiting(due')
//!        ▲                                                              │
//!        └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The controller never performs I/O.  The caller fetches, hands the result
//! to [`ScheduleController::resolve`], persists, actuates the valve if
//! [`Cycle::actuate`] says so, and then calls [`ScheduleController::finish`].

use log::{info, warn};

use crate::config::CACHE_RETRY_SECS;
use crate::error::{Error, FetchError};
use crate::rainfall::{self, Aggregate};
use crate::state::PersistedState;

// ═══════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    /// Fresh station; the first poll fetches.
    AwaitingFirstFetch,
    /// Sleeping until `next_due` (epoch seconds).
    Waiting { next_due: i64 },
    /// A fetch is due or in flight.
    Fetching,
    /// Decision made, waiting for the caller to persist and actuate.
    Idle,
}

/// Where a cycle's decision came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// New forecast of `hours` hourly values.
    Fresh { weekly_rate: f32, hours: usize },
    /// The fetch failed; the decision was recomputed from the cache with
    /// its first hour dropped.
    FromCache {
        weekly_rate: f32,
        cause: Error,
        cached_left: usize,
    },
    /// The fetch failed and the cache was too short.  History was cleared,
    /// the previous decision stands and a retry is scheduled shortly.
    CacheExhausted { cause: Error },
}

/// Result of [`ScheduleController::resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cycle {
    pub outcome: CycleOutcome,
    /// Decision after this cycle (`true` disables watering).
    pub rain_forecasted: bool,
    /// The decision differs from the previous one.
    pub changed: bool,
    /// The valve must be driven this cycle.
    pub actuate: bool,
}

impl Cycle {
    /// Whether the data-error indicator should be lit.
    pub fn data_error(&self) -> bool {
        !matches!(self.outcome, CycleOutcome::Fresh { .. })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Controller
// ═══════════════════════════════════════════════════════════════

pub struct ScheduleController {
    state: ScheduleState,
    /// Cleared after the first completed cycle.
    first_run: bool,
}

impl ScheduleController {
    /// Pick the initial state.  Call after [`PersistedState::catch_up`].
    pub fn new(record: &PersistedState, now: i64, first_run: bool) -> Self {
        let state = if first_run {
            ScheduleState::AwaitingFirstFetch
        } else if record.is_due(now) {
            ScheduleState::Fetching
        } else {
            ScheduleState::Waiting {
                next_due: record.next_due(),
            }
        };
        Self { state, first_run }
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    /// Advance time.  Returns `true` when a fetch should be performed now.
    pub fn poll(&mut self, now: i64) -> bool {
        match self.state {
            ScheduleState::AwaitingFirstFetch => {
                self.state = ScheduleState::Fetching;
                true
            }
            ScheduleState::Waiting { next_due } if now >= next_due => {
                self.state = ScheduleState::Fetching;
                true
            }
            ScheduleState::Fetching => true,
            ScheduleState::Waiting { .. } | ScheduleState::Idle => false,
        }
    }

    /// Skip the wait and fetch on the next poll.
    pub fn force(&mut self) {
        if self.state != ScheduleState::Idle {
            self.state = ScheduleState::Fetching;
        }
    }

    /// Seconds until the next check (0 when one is due or running).
    pub fn seconds_until_due(&self, now: i64) -> u64 {
        match self.state {
            ScheduleState::Waiting { next_due } => (next_due - now).max(0) as u64,
            _ => 0,
        }
    }

    /// Fold a fetch result into `record`, then move to `Idle`.
    ///
    /// Updates the history, the cache, the decision and `last_check_time`.
    pub fn resolve(
        &mut self,
        fetched: Result<Vec<f32>, FetchError>,
        record: &mut PersistedState,
        now: i64,
    ) -> Cycle {
        let previous = record.rain_forecasted;

        let outcome = match fetched.map_err(Error::from).and_then(|samples| {
            let agg = rainfall::aggregate(&samples, &record.config, &record.historical_rain)?;
            Ok((samples, agg))
        }) {
            Ok((samples, agg)) => {
                let hours = samples.len();
                info!("Forecast received: {} hours", hours);
                let weekly_rate = agg.weekly_rate;
                self.apply(record, agg);
                record.cached_forecast = samples;
                CycleOutcome::Fresh { weekly_rate, hours }
            }
            Err(cause) => self.degrade(cause, record, now),
        };

        if !matches!(outcome, CycleOutcome::CacheExhausted { .. }) {
            record.last_check_time = now;
        }

        let changed = record.rain_forecasted != previous;
        let config = &record.config;
        let actuate = changed || config.valve_has_sensor || config.force_valve || self.first_run;

        self.state = ScheduleState::Idle;
        Cycle {
            outcome,
            rain_forecasted: record.rain_forecasted,
            changed,
            actuate,
        }
    }

    /// Persisting and actuation are done; go back to waiting.
    pub fn finish(&mut self, record: &PersistedState) {
        self.first_run = false;
        self.state = ScheduleState::Waiting {
            next_due: record.next_due(),
        };
    }

    // ── Internal ──────────────────────────────────────────────

    fn degrade(&self, cause: Error, record: &mut PersistedState, now: i64) -> CycleOutcome {
        warn!("Forecast unavailable: {}", cause);
        let look_ahead = record.config.look_ahead_hours as usize;

        if record.cached_forecast.len() > look_ahead {
            record.cached_forecast.remove(0);
            match rainfall::aggregate(
                &record.cached_forecast,
                &record.config,
                &record.historical_rain,
            ) {
                Ok(agg) => {
                    let weekly_rate = agg.weekly_rate;
                    self.apply(record, agg);
                    info!(
                        "Using cached forecast ({} hours left)",
                        record.cached_forecast.len()
                    );
                    return CycleOutcome::FromCache {
                        weekly_rate,
                        cause,
                        cached_left: record.cached_forecast.len(),
                    };
                }
                Err(e) => warn!("Cached forecast unusable: {}", e),
            }
        }

        let exhausted = Error::CacheExhausted {
            cached: record.cached_forecast.len(),
            need: look_ahead,
        };
        warn!("{}, clearing history and retrying in {}s", exhausted, CACHE_RETRY_SECS);
        record.historical_rain.clear();
        record.last_check_time = now - record.config.check_interval_secs() + CACHE_RETRY_SECS;
        CycleOutcome::CacheExhausted { cause }
    }

    fn apply(&self, record: &mut PersistedState, agg: Aggregate) {
        if agg.effective_look_ahead > record.config.look_ahead_hours as usize {
            info!(
                "Only {} hour(s) of history, looking ahead {} hours",
                agg.history.len(),
                agg.effective_look_ahead
            );
        }
        record.historical_rain = agg.history;
        record.rain_forecasted = agg.rain_forecasted;
    }
}
