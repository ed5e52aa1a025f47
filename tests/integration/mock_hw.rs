//! Mock adapters for integration tests.
//!
//! Records every valve call so tests can assert on the full command
//! history without touching real GPIO, and scripts forecast responses,
//! storage and time.

use std::cell::Cell;
use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use rainbypass::app::events::AppEvent;
use rainbypass::app::ports::{
    EventSink, ForecastPort, StateError, StatePort, TimePort, ValvePort,
};
use rainbypass::config::{Location, StationConfig};
use rainbypass::error::{FetchError, ValvePosition};
use rainbypass::state::PersistedState;

pub const T0: i64 = 1_700_000_000;
pub const HOUR: i64 = 3600;

pub fn station(look_ahead: u16, look_behind: u16, limit: f32) -> StationConfig {
    StationConfig {
        latitude: 35.2,
        longitude: -80.8,
        look_ahead_hours: look_ahead,
        look_behind_hours: look_behind,
        rainfall_limit: limit,
        ..StationConfig::default()
    }
}

// ── Valve call record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValveCall {
    Drive(ValvePosition),
    Release,
    Lights(bool),
    DataError(bool),
}

/// How the simulated limit switches respond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Switches {
    /// Target reads active after this many samples.
    ReachAfter(u32),
    /// Never reads active.
    Stuck,
}

pub struct MockHardware {
    pub calls: Vec<ValveCall>,
    pub switches: Switches,
    pub polls: u32,
    /// Request abort once this many samples were taken.
    pub abort_after: Option<u32>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(switches: Switches) -> Self {
        Self {
            calls: Vec::new(),
            switches,
            polls: 0,
            abort_after: None,
        }
    }

    pub fn drives(&self) -> Vec<ValvePosition> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ValveCall::Drive(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn data_error(&self) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            ValveCall::DataError(on) => Some(*on),
            _ => None,
        })
    }

    /// Both relays are de-asserted after the last drive.
    pub fn relays_released(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ValveCall::Drive(_) => Some(false),
                ValveCall::Release => Some(true),
                _ => None,
            })
            .unwrap_or(true)
    }
}

impl ValvePort for MockHardware {
    fn drive_relays(&mut self, target: ValvePosition) {
        self.calls.push(ValveCall::Drive(target));
    }

    fn release_relays(&mut self) {
        self.calls.push(ValveCall::Release);
    }

    fn set_watering_lights(&mut self, enabled: bool) {
        self.calls.push(ValveCall::Lights(enabled));
    }

    fn set_data_error(&mut self, on: bool) {
        self.calls.push(ValveCall::DataError(on));
    }

    fn position_reached(&mut self, _target: ValvePosition) -> bool {
        self.polls += 1;
        match self.switches {
            Switches::ReachAfter(n) => self.polls > n,
            Switches::Stuck => false,
        }
    }

    fn abort_requested(&mut self) -> bool {
        self.abort_after.is_some_and(|n| self.polls >= n)
    }
}

// ── MockForecast ──────────────────────────────────────────────

/// Scripted responses; transport failure once the script runs out.
#[derive(Default)]
pub struct MockForecast {
    pub responses: VecDeque<Result<Vec<f32>, FetchError>>,
    pub requests: Vec<Location>,
}

#[allow(dead_code)]
impl MockForecast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, response: Result<Vec<f32>, FetchError>) -> Self {
        self.responses.push_back(response);
        self
    }

    pub fn dry(hours: usize) -> Self {
        Self::new().then(Ok(vec![0.0; hours]))
    }
}

impl ForecastPort for MockForecast {
    fn fetch(&mut self, location: Location) -> Result<Vec<f32>, FetchError> {
        self.requests.push(location);
        self.responses
            .pop_front()
            .unwrap_or(Err(FetchError::Transport("offline")))
    }
}

// ── MockStore ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStore {
    pub record: Option<PersistedState>,
    pub saves: usize,
    pub fail_saves: bool,
}

impl StatePort for MockStore {
    fn load(&self) -> Result<PersistedState, StateError> {
        self.record.clone().ok_or(StateError::NotFound)
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), StateError> {
        if self.fail_saves {
            return Err(StateError::IoError);
        }
        self.record = Some(state.clone());
        self.saves += 1;
        Ok(())
    }
}

// ── MockClock / VirtualDelay ──────────────────────────────────

pub struct MockClock {
    now: Cell<i64>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn at(now: i64) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn advance(&self, secs: i64) {
        self.now.set(self.now.get() + secs);
    }
}

impl TimePort for MockClock {
    fn now_epoch_secs(&self) -> i64 {
        self.now.get()
    }
}

/// Counts requested sleep time instead of sleeping.
#[derive(Default)]
pub struct VirtualDelay {
    pub elapsed_ms: u64,
}

impl DelayNs for VirtualDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ms += u64::from(ns) / 1_000_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += u64::from(ms);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn last_next_check(&self) -> Option<u64> {
        self.events.iter().rev().find_map(|e| match e {
            AppEvent::NextCheck { in_secs } => Some(*in_secs),
            _ => None,
        })
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
