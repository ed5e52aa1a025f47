//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the persisted record, the check scheduler and the
//! valve actuator.  It exposes a clean, hardware-agnostic API.  All I/O
//! flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!  ForecastPort ──▶ ┌────────────────────────────┐ ──▶ EventSink
//!     TimePort ──▶  │        AppService          │ ──▶ StatePort
//!                   │ Scheduler · Rainfall · Valve│
//!    ValvePort ◀──  └────────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::error::{Error, ValvePosition};
use crate::scheduler::{Cycle, ScheduleController, ScheduleState};
use crate::state::{CatchUp, PersistedState};
use crate::valve::{HardwareProbe, ValveActuator, ValveState};

use super::events::AppEvent;
use super::ports::{EventSink, ForecastPort, StatePort, TimePort, ValvePort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    record: PersistedState,
    scheduler: ScheduleController,
    valve: ValveActuator,
    catch_up: CatchUp,
    cycles: u64,
}

impl AppService {
    /// Construct the service from a loaded (or freshly set up) record.
    ///
    /// On a known station the missed intervals are replayed from the cache
    /// first.  Does **not** touch hardware; call [`start`](Self::start) next.
    pub fn new(
        mut record: PersistedState,
        probe: HardwareProbe,
        first_run: bool,
        clock: &impl TimePort,
    ) -> Self {
        let now = clock.now_epoch_secs();
        let catch_up = if first_run {
            CatchUp::UpToDate
        } else {
            record.catch_up(now)
        };
        let scheduler = ScheduleController::new(&record, now, first_run);
        let valve = ValveActuator::new(record.config.valve_has_sensor, probe);
        Self {
            record,
            scheduler,
            valve,
            catch_up,
            cycles: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the configuration and, on a known station, drive the valve
    /// to the persisted decision.
    pub fn start(
        &mut self,
        clock: &impl TimePort,
        hw: &mut impl ValvePort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) {
        sink.emit(&AppEvent::Started(self.record.config.clone()));
        if self.scheduler.is_first_run() {
            info!("AppService started (first run)");
        } else {
            sink.emit(&AppEvent::CaughtUp(self.catch_up));
            info!(
                "AppService started, re-asserting watering {}",
                if self.record.rain_forecasted {
                    "DISABLED"
                } else {
                    "ENABLED"
                }
            );
            self.actuate(self.record.rain_forecasted, hw, delay, sink);
        }
        sink.emit(&AppEvent::NextCheck {
            in_secs: self.seconds_until_next_check(clock),
        });
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run a check if one is due: fetch → aggregate → persist → actuate.
    ///
    /// Returns the completed cycle, or `None` while waiting.
    pub fn tick(
        &mut self,
        clock: &impl TimePort,
        forecast: &mut impl ForecastPort,
        hw: &mut impl ValvePort,
        delay: &mut impl DelayNs,
        store: &mut impl StatePort,
        sink: &mut impl EventSink,
    ) -> Option<Cycle> {
        let now = clock.now_epoch_secs();
        if !self.scheduler.poll(now) {
            return None;
        }
        self.cycles += 1;
        sink.emit(&AppEvent::CheckStarted);

        // 1. Fetch via ForecastPort, fold into the record
        let fetched = forecast.fetch(self.record.config.location());
        let cycle = self.scheduler.resolve(fetched, &mut self.record, now);
        hw.set_data_error(cycle.data_error());
        sink.emit(&AppEvent::CycleCompleted(cycle));

        // 2. Persist
        self.persist(store, sink);

        // 3. Actuate
        if cycle.actuate {
            self.actuate(cycle.rain_forecasted, hw, delay, sink);
        }

        // 4. Back to waiting
        self.scheduler.finish(&self.record);
        sink.emit(&AppEvent::NextCheck {
            in_secs: self.seconds_until_next_check(clock),
        });
        Some(cycle)
    }

    /// Check now, regardless of the schedule.
    pub fn force_check(
        &mut self,
        clock: &impl TimePort,
        forecast: &mut impl ForecastPort,
        hw: &mut impl ValvePort,
        delay: &mut impl DelayNs,
        store: &mut impl StatePort,
        sink: &mut impl EventSink,
    ) -> Option<Cycle> {
        info!("Manual forecast check requested");
        self.scheduler.force();
        self.tick(clock, forecast, hw, delay, store, sink)
    }

    /// Persist the record and release both relays.
    pub fn shutdown(
        &mut self,
        hw: &mut impl ValvePort,
        store: &mut impl StatePort,
        sink: &mut impl EventSink,
    ) {
        self.valve.release(hw);
        self.persist(store, sink);
        sink.emit(&AppEvent::Shutdown);
        info!("AppService shut down");
    }

    /// Write the record now.  A failed save is reported through the sink
    /// and the log; the next cycle writes the record again.
    pub fn persist(&self, store: &mut impl StatePort, sink: &mut impl EventSink) -> bool {
        match store.save(&self.record) {
            Ok(()) => true,
            Err(e) => {
                warn!("State save failed: {}", e);
                sink.emit(&AppEvent::PersistFailed);
                false
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn seconds_until_next_check(&self, clock: &impl TimePort) -> u64 {
        self.scheduler.seconds_until_due(clock.now_epoch_secs())
    }

    pub fn record(&self) -> &PersistedState {
        &self.record
    }

    /// Current decision (`true` = watering disabled).
    pub fn rain_forecasted(&self) -> bool {
        self.record.rain_forecasted
    }

    pub fn schedule_state(&self) -> ScheduleState {
        self.scheduler.state()
    }

    pub fn valve_state(&self) -> ValveState {
        self.valve.state()
    }

    /// Checks executed since startup.
    pub fn cycle_count(&self) -> u64 {
        self.cycles
    }

    // ── Internal ──────────────────────────────────────────────

    fn actuate(
        &mut self,
        rain_forecasted: bool,
        hw: &mut impl ValvePort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) {
        let enabled = !rain_forecasted;
        match self.valve.set_target(enabled, hw, delay) {
            Ok(outcome) => sink.emit(&AppEvent::ValveMoved {
                position: ValvePosition::for_watering(enabled),
                outcome,
            }),
            Err(Error::ValveMoveTimeout(position)) => {
                sink.emit(&AppEvent::ValveFailed(position));
            }
            Err(e) => warn!("Valve error: {}", e),
        }
    }

}
