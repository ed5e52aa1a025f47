//! Startup: first-run setup, restart catch-up and persistence.

use rainbypass::adapters::log_sink::LogEventSink;
use rainbypass::adapters::nvs::NvsAdapter;
use rainbypass::app::events::AppEvent;
use rainbypass::app::ports::{StateError, StatePort};
use rainbypass::app::service::AppService;
use rainbypass::config::{SetupAnswers, SetupText, StationConfig};
use rainbypass::error::ValvePosition;
use rainbypass::scheduler::ScheduleState;
use rainbypass::state::{CatchUp, PersistedState};
use rainbypass::valve::HardwareProbe;

use crate::mock_hw::*;

fn cached(len: usize) -> Vec<f32> {
    (0..len).map(|i| i as f32 / 100.0).collect()
}

#[test]
fn restart_reasserts_persisted_decision() {
    let clock = MockClock::at(T0);
    let mut hw = MockHardware::new(Switches::Stuck);
    let mut delay = VirtualDelay::default();
    let mut sink = RecordingSink::default();
    let mut forecast = MockForecast::dry(10);
    let mut store = MockStore::default();

    let mut record = PersistedState::new(station(4, 4, 1.0), T0 - 600);
    record.rain_forecasted = true;
    let mut app = AppService::new(record, HardwareProbe::default(), false, &clock);
    app.start(&clock, &mut hw, &mut delay, &mut sink);

    assert_eq!(hw.drives(), vec![ValvePosition::Closed]);
    assert!(sink.events.contains(&AppEvent::CaughtUp(CatchUp::UpToDate)));
    assert_eq!(sink.last_next_check(), Some(3000));
    assert!(
        app.tick(&clock, &mut forecast, &mut hw, &mut delay, &mut store, &mut sink)
            .is_none()
    );
    assert!(forecast.requests.is_empty());
}

#[test]
fn restart_replays_missed_hours_from_cache() {
    let clock = MockClock::at(T0);
    let mut hw = MockHardware::new(Switches::Stuck);
    let mut sink = RecordingSink::default();

    let mut record = PersistedState::new(station(4, 4, 1.0), T0 - 3 * HOUR - 600);
    record.cached_forecast = cached(12);
    let mut app = AppService::new(record, HardwareProbe::default(), false, &clock);
    app.start(&clock, &mut hw, &mut VirtualDelay::default(), &mut sink);

    assert!(sink.events.contains(&AppEvent::CaughtUp(CatchUp::Replayed(3))));
    let history: Vec<f32> = app.record().historical_rain.iter().copied().collect();
    assert_eq!(history, vec![0.02, 0.01, 0.0]);
    assert_eq!(app.record().cached_forecast.len(), 9);
    assert_eq!(app.seconds_until_next_check(&clock), 3000);
}

#[test]
fn restart_with_short_cache_resets_and_checks_now() {
    let clock = MockClock::at(T0);
    let mut hw = MockHardware::new(Switches::Stuck);
    let mut delay = VirtualDelay::default();
    let mut sink = RecordingSink::default();
    let mut forecast = MockForecast::dry(10);
    let mut store = MockStore::default();

    let mut record = PersistedState::new(station(4, 4, 1.0), T0 - 2 * HOUR);
    record.cached_forecast = cached(5);
    record.historical_rain = vec![0.3; 20].into();
    let mut app = AppService::new(record, HardwareProbe::default(), false, &clock);
    app.start(&clock, &mut hw, &mut delay, &mut sink);

    assert!(sink.events.contains(&AppEvent::CaughtUp(CatchUp::Reset)));
    assert!(app.record().cached_forecast.is_empty());
    assert_eq!(app.schedule_state(), ScheduleState::Fetching);
    assert_eq!(sink.last_next_check(), Some(0));

    let cycle = app
        .tick(&clock, &mut forecast, &mut hw, &mut delay, &mut store, &mut sink)
        .unwrap();
    assert!(!cycle.data_error());
    assert_eq!(app.record().historical_rain.len(), 1);
}

#[test]
fn state_survives_restart_through_nvs() {
    let clock = MockClock::at(T0);
    let mut hw = MockHardware::new(Switches::Stuck);
    let mut delay = VirtualDelay::default();
    let mut sink = LogEventSink::new();
    let mut forecast = MockForecast::new().then(Ok(vec![0.2; 50]));
    let mut nvs = NvsAdapter::new().unwrap();

    let mut app = AppService::new(
        PersistedState::new(station(48, 24, 1.0), T0),
        HardwareProbe::default(),
        true,
        &clock,
    );
    app.start(&clock, &mut hw, &mut delay, &mut sink);
    let cycle = app
        .tick(&clock, &mut forecast, &mut hw, &mut delay, &mut nvs, &mut sink)
        .unwrap();
    assert!(cycle.rain_forecasted);

    let loaded = nvs.load().unwrap();
    assert_eq!(&loaded, app.record());

    clock.advance(600);
    let restarted = AppService::new(loaded, HardwareProbe::default(), false, &clock);
    assert!(restarted.rain_forecasted());
    assert_eq!(
        restarted.schedule_state(),
        ScheduleState::Waiting {
            next_due: T0 + HOUR
        }
    );
}

#[test]
fn unusable_record_falls_back_to_setup() {
    let mut nvs = NvsAdapter::new().unwrap();
    assert_eq!(nvs.load(), Err(StateError::NotFound));

    nvs.write_raw(b"{\"latitude\": ");
    assert_eq!(nvs.load(), Err(StateError::Corrupted));

    let mut bad = PersistedState::new(StationConfig::default(), T0);
    bad.config.latitude = 200.0;
    nvs.write_raw(&bad.to_json().unwrap());
    assert!(matches!(nvs.load(), Err(StateError::Invalid(_))));

    let answers = SetupAnswers::parse(SetupText {
        latitude: "35.2",
        longitude: "-80.8",
        look_ahead_hours: "500",
        look_behind_hours: "24",
        rainfall_limit: "1.0",
        valve_has_sensor: "no",
    })
    .unwrap();
    let config = StationConfig::from_setup(answers).unwrap();
    assert_eq!(config.look_ahead_hours, 168);
    assert_eq!(config.check_interval_seconds, 3600);

    let clock = MockClock::at(T0);
    let record = PersistedState::new(config, T0);
    nvs.save(&record).unwrap();
    let app = AppService::new(record, HardwareProbe::default(), true, &clock);
    assert_eq!(app.schedule_state(), ScheduleState::AwaitingFirstFetch);
    assert_eq!(nvs.load().unwrap(), *app.record());
}

#[test]
fn first_run_save_failure_is_retried_by_first_check() {
    let clock = MockClock::at(T0);
    let mut hw = MockHardware::new(Switches::Stuck);
    let mut delay = VirtualDelay::default();
    let mut sink = RecordingSink::default();
    let mut forecast = MockForecast::dry(10);
    let mut store = MockStore {
        fail_saves: true,
        ..MockStore::default()
    };

    let mut app = AppService::new(
        PersistedState::new(station(4, 4, 1.0), T0),
        HardwareProbe::default(),
        true,
        &clock,
    );
    assert!(!app.persist(&mut store, &mut sink));
    assert_eq!(sink.events, vec![AppEvent::PersistFailed]);
    assert!(store.record.is_none());

    store.fail_saves = false;
    app.start(&clock, &mut hw, &mut delay, &mut sink);
    assert!(
        app.tick(&clock, &mut forecast, &mut hw, &mut delay, &mut store, &mut sink)
            .is_some()
    );
    assert_eq!(store.record.as_ref(), Some(app.record()));
    assert!(app.persist(&mut store, &mut sink));
    assert_eq!(store.saves, 2);
}
