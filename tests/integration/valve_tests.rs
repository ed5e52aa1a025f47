//! Valve actuation through the service and directly: confirmation,
//! timeout, abort, and relay release on every path.

use rainbypass::adapters::hardware::HardwareAdapter;
use rainbypass::app::events::AppEvent;
use rainbypass::app::ports::ValvePort;
use rainbypass::app::service::AppService;
use rainbypass::drivers::hw_init::{self, gpio_read, sim_set_input};
use rainbypass::drivers::relay::RelayState;
use rainbypass::error::{Error, ValvePosition};
use rainbypass::pins;
use rainbypass::state::PersistedState;
use rainbypass::valve::{
    HardwareProbe, SENSOR_POLL_MS, VALVE_TIMEOUT_MS, ValveActuator, ValveOutcome, ValveState,
};

use crate::mock_hw::*;

const WIRED: HardwareProbe = HardwareProbe {
    gpio: true,
    position_sensor: false,
};

fn sensor_station() -> PersistedState {
    let mut config = station(4, 4, 1.0);
    config.valve_has_sensor = true;
    PersistedState::new(config, T0)
}

#[test]
fn confirmed_move_stops_polling() {
    let mut hw = MockHardware::new(Switches::ReachAfter(3));
    let mut delay = VirtualDelay::default();
    let mut valve = ValveActuator::new(true, WIRED);

    assert_eq!(
        valve.set_target(false, &mut hw, &mut delay),
        Ok(ValveOutcome::Confirmed)
    );
    assert_eq!(hw.polls, 4);
    assert_eq!(delay.elapsed_ms, 3 * u64::from(SENSOR_POLL_MS));
    assert_eq!(hw.drives(), vec![ValvePosition::Closed]);
    assert!(hw.relays_released());
    assert!(hw.calls.contains(&ValveCall::Lights(false)));
    assert_eq!(valve.state(), ValveState::Idle);
}

#[test]
fn repeated_target_polls_again() {
    let mut hw = MockHardware::new(Switches::ReachAfter(0));
    let mut delay = VirtualDelay::default();
    let mut valve = ValveActuator::new(true, WIRED);

    valve.set_target(true, &mut hw, &mut delay).unwrap();
    valve.set_target(true, &mut hw, &mut delay).unwrap();
    assert_eq!(hw.drives(), vec![ValvePosition::Open, ValvePosition::Open]);
    assert_eq!(hw.polls, 2);
}

#[test]
fn configured_sensor_timeout_is_failure() {
    let mut hw = MockHardware::new(Switches::Stuck);
    let mut delay = VirtualDelay::default();
    let mut valve = ValveActuator::new(true, WIRED);

    assert_eq!(
        valve.set_target(true, &mut hw, &mut delay),
        Err(Error::ValveMoveTimeout(ValvePosition::Open))
    );
    assert_eq!(delay.elapsed_ms, u64::from(VALVE_TIMEOUT_MS));
    assert_eq!(valve.state(), ValveState::Failed);
    assert!(hw.relays_released());
}

#[test]
fn detected_sensor_timeout_is_tolerated() {
    let mut hw = MockHardware::new(Switches::Stuck);
    let mut delay = VirtualDelay::default();
    let probe = HardwareProbe {
        gpio: true,
        position_sensor: true,
    };
    let mut valve = ValveActuator::new(false, probe);

    assert_eq!(
        valve.set_target(false, &mut hw, &mut delay),
        Ok(ValveOutcome::Unconfirmed)
    );
    assert_eq!(valve.state(), ValveState::Idle);
    assert!(hw.relays_released());
}

#[test]
fn no_gpio_means_fire_and_forget() {
    let mut hw = MockHardware::new(Switches::Stuck);
    let mut delay = VirtualDelay::default();
    let mut valve = ValveActuator::new(true, HardwareProbe::default());

    assert_eq!(
        valve.set_target(true, &mut hw, &mut delay),
        Ok(ValveOutcome::FireAndForget)
    );
    assert_eq!(hw.polls, 0);
    assert_eq!(delay.elapsed_ms, 0);
    assert!(hw.relays_released());
}

#[test]
fn abort_cuts_the_wait_short() {
    let mut hw = MockHardware::new(Switches::Stuck);
    hw.abort_after = Some(5);
    let mut delay = VirtualDelay::default();
    let mut valve = ValveActuator::new(true, WIRED);

    assert_eq!(
        valve.set_target(true, &mut hw, &mut delay),
        Ok(ValveOutcome::Aborted)
    );
    assert!(delay.elapsed_ms < u64::from(VALVE_TIMEOUT_MS));
    assert!(hw.relays_released());
}

#[test]
fn service_reports_valve_failure() {
    let clock = MockClock::at(T0);
    let mut forecast = MockForecast::dry(10);
    let mut hw = MockHardware::new(Switches::Stuck);
    let mut delay = VirtualDelay::default();
    let mut store = MockStore::default();
    let mut sink = RecordingSink::default();

    let mut app = AppService::new(sensor_station(), WIRED, true, &clock);
    app.start(&clock, &mut hw, &mut delay, &mut sink);
    let cycle = app
        .tick(&clock, &mut forecast, &mut hw, &mut delay, &mut store, &mut sink)
        .unwrap();

    assert!(cycle.actuate);
    assert!(sink.events.contains(&AppEvent::ValveFailed(ValvePosition::Open)));
    assert_eq!(app.valve_state(), ValveState::Failed);
    // The decision and the schedule survive a stuck valve.
    assert!(store.record.is_some());
    assert_eq!(app.seconds_until_next_check(&clock), 3600);
    assert!(hw.relays_released());
}

#[test]
fn shutdown_releases_relays_and_saves() {
    let clock = MockClock::at(T0);
    let mut hw = MockHardware::new(Switches::ReachAfter(0));
    let mut delay = VirtualDelay::default();
    let mut store = MockStore::default();
    let mut sink = RecordingSink::default();

    let mut app = AppService::new(sensor_station(), WIRED, false, &clock);
    app.start(&clock, &mut hw, &mut delay, &mut sink);
    // Leave a relay asserted, as if power was cut mid-move.
    hw.drive_relays(ValvePosition::Closed);
    assert!(!hw.relays_released());

    app.shutdown(&mut hw, &mut store, &mut sink);
    assert!(hw.relays_released());
    assert_eq!(store.record.as_ref(), Some(app.record()));
    assert_eq!(sink.events.last(), Some(&AppEvent::Shutdown));
}

#[test]
fn hardware_adapter_confirms_with_limit_switch() {
    let probe = hw_init::init_peripherals().unwrap();
    let mut hw = HardwareAdapter::default();
    let mut delay = VirtualDelay::default();
    let mut valve = ValveActuator::new(true, probe);

    sim_set_input(pins::CLOSED_SENSOR_GPIO, false);
    assert_eq!(
        valve.set_target(false, &mut hw, &mut delay),
        Ok(ValveOutcome::Confirmed)
    );
    assert_eq!(hw.relay_state(), RelayState::Released);
    assert!(!gpio_read(pins::OPEN_RELAY_GPIO));
    assert!(!gpio_read(pins::CLOSE_RELAY_GPIO));
    assert!(gpio_read(pins::DISABLED_LED_GPIO));
    assert!(!gpio_read(pins::ENABLED_LED_GPIO));
    assert_eq!(hw.lights().watering(), Some(false));
}
