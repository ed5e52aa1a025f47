//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART / USB-CDC in production) as fixed-format status lines.
//! A status display adapter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::scheduler::CycleOutcome;
use crate::state::CatchUp;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// `mm:ss` countdown, hours folded into minutes.
pub fn countdown(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(cfg) => {
                info!(
                    "START | lat={:.4} lon={:.4} | ahead={}h behind={}h | limit={:.2}in/wk | every {}s",
                    cfg.latitude,
                    cfg.longitude,
                    cfg.look_ahead_hours,
                    cfg.look_behind_hours,
                    cfg.rainfall_limit,
                    cfg.check_interval_seconds,
                );
            }
            AppEvent::CaughtUp(CatchUp::UpToDate) => {
                info!("SCHED | history up to date");
            }
            AppEvent::CaughtUp(CatchUp::Replayed(n)) => {
                info!("SCHED | replayed {} missed interval(s) from cache", n);
            }
            AppEvent::CaughtUp(CatchUp::Reset) => {
                warn!("SCHED | cache too short for downtime, history cleared");
            }
            AppEvent::CheckStarted => {
                info!("FCST  | fetching forecast");
            }
            AppEvent::CycleCompleted(cycle) => {
                let watering = if cycle.rain_forecasted {
                    "DISABLED"
                } else {
                    "ENABLED"
                };
                match cycle.outcome {
                    CycleOutcome::Fresh { weekly_rate, hours } => info!(
                        "FCST  | download OK ({}h) | {:.2}in/wk | watering {}",
                        hours, weekly_rate, watering
                    ),
                    CycleOutcome::FromCache {
                        weekly_rate,
                        cause,
                        cached_left,
                    } => warn!(
                        "FCST  | {} | using cached data ({}h left) | {:.2}in/wk | watering {}",
                        cause, cached_left, weekly_rate, watering
                    ),
                    CycleOutcome::CacheExhausted { cause } => warn!(
                        "FCST  | {} | insufficient cache, retrying soon | watering {}",
                        cause, watering
                    ),
                }
            }
            AppEvent::ValveMoved { position, outcome } => {
                info!("VALVE | {} | {:?}", position, outcome);
            }
            AppEvent::ValveFailed(position) => {
                error!("VALVE | {} FAILED, no position confirmation", position);
            }
            AppEvent::NextCheck { in_secs } => {
                info!("SCHED | next update {}", countdown(*in_secs));
            }
            AppEvent::PersistFailed => {
                error!("STATE | could not save record");
            }
            AppEvent::Shutdown => {
                info!("STOP  | relays released, state saved");
            }
        }
    }
}
