//! Rainfall-window aggregation.
//!
//! Combines the hourly forecast with the observed history into a weekly
//! rainfall rate and the watering decision.  Pure: the caller's history is
//! not touched, the updated copy is returned in [`Aggregate`].
//!
//! ```text
//!   forecast  [f0 | f1 .. f_la]        history [h0 .. h_lb-1]
//!              │    └────── window ─────────┘──────┘
//!              └─▶ pushed to history front
//! ```

use crate::config::{HOURS_PER_WEEK, MAX_WINDOW_HOURS, StationConfig};
use crate::error::{Error, Result};
use crate::history::RainHistory;

/// Result of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// `true` disables watering.
    pub rain_forecasted: bool,
    /// Inches per week over the sample window.
    pub weekly_rate: f32,
    /// Forecast hours actually used after cold-start widening.
    pub effective_look_ahead: usize,
    /// History with the current hour folded in.
    pub history: RainHistory,
}

/// Look-ahead widened by the history shortfall, so a station with little
/// history still averages over a comparable span.
///
/// `history_len` is the length after the current hour is folded in.
pub fn effective_look_ahead(look_ahead: usize, look_behind: usize, history_len: usize) -> usize {
    if history_len < look_behind {
        (look_ahead + (look_behind - history_len)).min(MAX_WINDOW_HOURS as usize)
    } else {
        look_ahead
    }
}

/// `168 × mean(window)`.  Rejects an empty window.
pub fn weekly_rate(window: impl IntoIterator<Item = f32>) -> Result<f32> {
    let (sum, count) = window
        .into_iter()
        .fold((0.0_f32, 0_usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        return Err(Error::EmptyWindow);
    }
    Ok(HOURS_PER_WEEK * sum / count as f32)
}

/// Run one aggregation over `samples` (index 0 = current hour).
///
/// `samples` must cover at least `look_ahead_hours`; shorter input is
/// [`Error::ForecastTooShort`].
pub fn aggregate(
    samples: &[f32],
    config: &StationConfig,
    history: &RainHistory,
) -> Result<Aggregate> {
    let look_ahead = config.look_ahead_hours as usize;
    let look_behind = config.look_behind_hours as usize;

    if samples.is_empty() || samples.len() < look_ahead {
        return Err(Error::ForecastTooShort {
            got: samples.len(),
            need: look_ahead.max(1),
        });
    }

    let mut updated = history.clone();
    updated.push_front(samples[0]);

    let effective = effective_look_ahead(look_ahead, look_behind, updated.len());

    let forecast_part = samples[1..].iter().take(effective).copied();
    let history_part = updated.recent(look_behind);
    let rate = weekly_rate(forecast_part.chain(history_part))?;

    Ok(Aggregate {
        rain_forecasted: rate > config.rainfall_limit,
        weekly_rate: rate,
        effective_look_ahead: effective,
        history: updated,
    })
}
