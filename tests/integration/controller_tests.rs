//! Forecast cycle tests: scheduling, decisions and the cached fallback.

use rainbypass::app::events::AppEvent;
use rainbypass::app::service::AppService;
use rainbypass::error::{Error, FetchError, ValvePosition};
use rainbypass::history::RainHistory;
use rainbypass::scheduler::{CycleOutcome, ScheduleState};
use rainbypass::state::PersistedState;
use rainbypass::valve::{HardwareProbe, ValveOutcome};

use crate::mock_hw::*;

struct Rig {
    clock: MockClock,
    forecast: MockForecast,
    hw: MockHardware,
    delay: VirtualDelay,
    store: MockStore,
    sink: RecordingSink,
}

impl Rig {
    fn new(forecast: MockForecast) -> Self {
        Self {
            clock: MockClock::at(T0),
            forecast,
            hw: MockHardware::new(Switches::Stuck),
            delay: VirtualDelay::default(),
            store: MockStore::default(),
            sink: RecordingSink::default(),
        }
    }

    fn service(&mut self, record: PersistedState, first_run: bool) -> AppService {
        let mut app = AppService::new(record, HardwareProbe::default(), first_run, &self.clock);
        app.start(&self.clock, &mut self.hw, &mut self.delay, &mut self.sink);
        app
    }

    fn tick(&mut self, app: &mut AppService) -> Option<rainbypass::scheduler::Cycle> {
        app.tick(
            &self.clock,
            &mut self.forecast,
            &mut self.hw,
            &mut self.delay,
            &mut self.store,
            &mut self.sink,
        )
    }
}

#[test]
fn first_run_fetches_at_once_and_disables_watering() {
    let mut rig = Rig::new(MockForecast::new().then(Ok(vec![0.1, 0.05, 0.2, 0.0])));
    let record = PersistedState::new(station(3, 0, 1.0), T0);
    let mut app = rig.service(record, true);
    assert_eq!(app.schedule_state(), ScheduleState::AwaitingFirstFetch);

    let cycle = rig.tick(&mut app).expect("first run checks immediately");
    match cycle.outcome {
        CycleOutcome::Fresh { weekly_rate, hours } => {
            assert!((weekly_rate - 14.0).abs() < 1e-3, "rate {weekly_rate}");
            assert_eq!(hours, 4);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(cycle.rain_forecasted);
    assert!(app.rain_forecasted());

    assert_eq!(rig.hw.drives(), vec![ValvePosition::Closed]);
    assert!(rig.hw.relays_released());
    assert_eq!(rig.hw.data_error(), Some(false));
    assert_eq!(rig.forecast.requests.len(), 1);
    assert_eq!(rig.forecast.requests[0].latitude, 35.2);

    let saved = rig.store.record.as_ref().unwrap();
    assert_eq!(saved.cached_forecast, vec![0.1, 0.05, 0.2, 0.0]);
    assert_eq!(saved.historical_rain.iter().copied().collect::<Vec<_>>(), vec![0.1]);
    assert_eq!(saved.last_check_time, T0);
    assert!(saved.rain_forecasted);

    assert_eq!(
        app.schedule_state(),
        ScheduleState::Waiting {
            next_due: T0 + HOUR
        }
    );
    assert_eq!(rig.sink.last_next_check(), Some(3600));
    assert!(rig.sink.events.contains(&AppEvent::ValveMoved {
        position: ValvePosition::Closed,
        outcome: ValveOutcome::FireAndForget,
    }));
}

#[test]
fn dry_forecast_enables_watering_on_first_run() {
    let mut rig = Rig::new(MockForecast::dry(5));
    let mut app = rig.service(PersistedState::new(station(4, 0, 1.0), T0), true);

    let cycle = rig.tick(&mut app).unwrap();
    assert!(!cycle.rain_forecasted);
    assert!(!cycle.changed);
    // Unchanged, but the first cycle always drives the valve.
    assert!(cycle.actuate);
    assert_eq!(rig.hw.drives(), vec![ValvePosition::Open]);
}

#[test]
fn waits_for_the_interval() {
    let mut rig = Rig::new(MockForecast::dry(60).then(Ok(vec![0.0; 60])));
    let mut app = rig.service(PersistedState::new(station(48, 48, 1.0), T0), true);
    assert!(rig.tick(&mut app).is_some());

    rig.clock.advance(HOUR - 1);
    assert!(rig.tick(&mut app).is_none());
    assert_eq!(app.seconds_until_next_check(&rig.clock), 1);
    assert_eq!(rig.forecast.requests.len(), 1);

    rig.clock.advance(1);
    assert!(rig.tick(&mut app).is_some());
    assert_eq!(rig.forecast.requests.len(), 2);
    assert_eq!(app.cycle_count(), 2);
}

#[test]
fn failures_degrade_through_cache_then_retry_shortly() {
    let mut rig = Rig::new(MockForecast::new());
    let mut record = PersistedState::new(station(4, 4, 1.0), T0 - HOUR + 1);
    record.cached_forecast = vec![0.001; 7];
    record.historical_rain = RainHistory::from(vec![0.002; 3]);
    let mut app = rig.service(record, false);
    assert_eq!(
        app.schedule_state(),
        ScheduleState::Waiting { next_due: T0 + 1 }
    );

    rig.clock.advance(1);
    for expected_left in [6, 5, 4] {
        let cycle = rig.tick(&mut app).expect("due");
        match cycle.outcome {
            CycleOutcome::FromCache {
                cached_left, cause, ..
            } => {
                assert_eq!(cached_left, expected_left);
                assert_eq!(cause, Error::Fetch(FetchError::Transport("offline")));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!app.record().historical_rain.is_empty());
        assert_eq!(rig.hw.data_error(), Some(true));
        assert_eq!(rig.sink.last_next_check(), Some(3600));
        rig.clock.advance(HOUR);
    }

    let cycle = rig.tick(&mut app).unwrap();
    assert!(matches!(cycle.outcome, CycleOutcome::CacheExhausted { .. }));
    assert!(app.record().historical_rain.is_empty());
    assert!(!cycle.rain_forecasted);
    assert_eq!(app.seconds_until_next_check(&rig.clock), 60);
    assert_eq!(rig.store.record.as_ref().unwrap(), app.record());

    // Network back: a fresh forecast clears the data-error light.
    rig.forecast.responses.push_back(Ok(vec![0.0; 10]));
    rig.clock.advance(59);
    assert!(rig.tick(&mut app).is_none());
    rig.clock.advance(1);
    let cycle = rig.tick(&mut app).unwrap();
    assert!(matches!(cycle.outcome, CycleOutcome::Fresh { hours: 10, .. }));
    assert_eq!(rig.hw.data_error(), Some(false));
    assert_eq!(app.record().cached_forecast.len(), 10);
}

#[test]
fn short_forecast_without_cache_keeps_decision() {
    let mut rig = Rig::new(MockForecast::new().then(Ok(vec![0.5, 0.5])));
    let mut record = PersistedState::new(station(4, 4, 1.0), T0);
    record.rain_forecasted = true;
    let mut app = rig.service(record, true);

    let cycle = rig.tick(&mut app).unwrap();
    assert_eq!(
        cycle.outcome,
        CycleOutcome::CacheExhausted {
            cause: Error::ForecastTooShort { got: 2, need: 4 }
        }
    );
    assert!(cycle.rain_forecasted);
    assert!(!cycle.changed);
    assert_eq!(app.seconds_until_next_check(&rig.clock), 60);
}

#[test]
fn unchanged_decision_leaves_valve_alone() {
    let mut rig = Rig::new(MockForecast::dry(10).then(Ok(vec![1.0; 10])));
    let mut record = PersistedState::new(station(4, 4, 1.0), T0 - HOUR + 10);
    record.cached_forecast = vec![0.0; 4];
    let mut app = rig.service(record, false);
    let at_start = rig.hw.drives().len();

    rig.clock.advance(10);
    let cycle = rig.tick(&mut app).unwrap();
    assert!(!cycle.actuate);
    assert_eq!(rig.hw.drives().len(), at_start);

    rig.clock.advance(HOUR);
    let cycle = rig.tick(&mut app).unwrap();
    assert!(cycle.changed && cycle.actuate);
    assert_eq!(rig.hw.drives().last(), Some(&ValvePosition::Closed));
}

#[test]
fn force_valve_drives_every_cycle() {
    let mut rig = Rig::new(MockForecast::dry(10).then(Ok(vec![0.0; 10])));
    let mut config = station(4, 4, 1.0);
    config.force_valve = true;
    let mut app = rig.service(PersistedState::new(config, T0 - HOUR), false);
    let at_start = rig.hw.drives().len();

    assert!(rig.tick(&mut app).unwrap().actuate);
    rig.clock.advance(HOUR);
    assert!(rig.tick(&mut app).unwrap().actuate);
    assert_eq!(rig.hw.drives().len(), at_start + 2);
}

#[test]
fn manual_check_skips_the_wait() {
    let mut rig = Rig::new(MockForecast::dry(10).then(Ok(vec![0.0; 10])));
    let mut app = rig.service(PersistedState::new(station(4, 4, 1.0), T0), true);
    rig.tick(&mut app).unwrap();

    rig.clock.advance(600);
    let cycle = app.force_check(
        &rig.clock,
        &mut rig.forecast,
        &mut rig.hw,
        &mut rig.delay,
        &mut rig.store,
        &mut rig.sink,
    );
    assert!(cycle.is_some());
    assert_eq!(rig.forecast.requests.len(), 2);
    assert_eq!(app.seconds_until_next_check(&rig.clock), 3600);
}

#[test]
fn save_failure_is_reported_not_fatal() {
    let mut rig = Rig::new(MockForecast::dry(10));
    rig.store.fail_saves = true;
    let mut app = rig.service(PersistedState::new(station(4, 4, 1.0), T0), true);

    assert!(rig.tick(&mut app).is_some());
    assert!(rig.sink.events.contains(&AppEvent::PersistFailed));
    assert!(matches!(app.schedule_state(), ScheduleState::Waiting { .. }));
}
