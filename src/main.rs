//! RainBypass firmware main entry point.
//!
//! Hexagonal architecture with an event-driven control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter   SystemClock     │
//! │  (ValvePort)       (EventSink)    (StatePort)  (TimePort)      │
//! │  NwsForecastClient WifiStation                                 │
//! │  (ForecastPort)    (link + SNTP)                               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  ScheduleController · ForecastAggregator · Valve       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use embedded_hal::delay::DelayNs;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use rainbypass::adapters::forecast::NwsForecastClient;
use rainbypass::adapters::hardware::HardwareAdapter;
use rainbypass::adapters::log_sink::LogEventSink;
use rainbypass::adapters::nvs::NvsAdapter;
use rainbypass::adapters::time::{BlockingDelay, SystemClock};
use rainbypass::adapters::wifi::WifiStation;
use rainbypass::app::ports::{StatePort, TimePort};
use rainbypass::app::service::AppService;
use rainbypass::config::{SetupAnswers, SetupText, StationConfig};
use rainbypass::drivers::hw_init;
use rainbypass::events::{self, Event};
use rainbypass::state::PersistedState;
use rainbypass::valve::HardwareProbe;

/// Main loop period; also bounds button latency.
const LOOP_PERIOD_MS: u32 = 100;
const WIFI_RETRY_MS: u32 = 5_000;
const TIME_SYNC_TIMEOUT_MS: u32 = 30_000;

// First-run answers, fixed at build time.
const SETUP: SetupText<'static> = SetupText {
    latitude: env_or_empty(option_env!("RAINBYPASS_LAT")),
    longitude: env_or_empty(option_env!("RAINBYPASS_LON")),
    look_ahead_hours: env_or_empty(option_env!("RAINBYPASS_LOOK_AHEAD")),
    look_behind_hours: env_or_empty(option_env!("RAINBYPASS_LOOK_BEHIND")),
    rainfall_limit: env_or_empty(option_env!("RAINBYPASS_LIMIT")),
    valve_has_sensor: env_or_empty(option_env!("RAINBYPASS_VALVE_SENSOR")),
};
const WIFI_SSID: &str = env_or_empty(option_env!("RAINBYPASS_WIFI_SSID"));
const WIFI_PASS: &str = env_or_empty(option_env!("RAINBYPASS_WIFI_PASS"));

const fn env_or_empty(value: Option<&'static str>) -> &'static str {
    match value {
        Some(v) => v,
        None => "",
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RainBypass v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. GPIO + capability probe ────────────────────────────
    let probe = match hw_init::init_peripherals() {
        Ok(p) => p,
        Err(e) => {
            error!("GPIO init failed: {}, valve will not be polled", e);
            HardwareProbe::default()
        }
    };
    if let Err(e) = hw_init::init_isr_service() {
        warn!("ISR service init failed: {}, button is polled only", e);
    }

    let mut hw = HardwareAdapter::default();
    let mut delay = BlockingDelay;
    let mut sink = LogEventSink::new();
    let clock = SystemClock::new();

    // ── 3. Network + wall clock ───────────────────────────────
    let mut wifi = WifiStation::new(peripherals.modem, sysloop, Some(nvs_partition))?;
    wifi.set_credentials(WIFI_SSID, WIFI_PASS)
        .context("RAINBYPASS_WIFI_SSID / RAINBYPASS_WIFI_PASS")?;
    while let Err(e) = wifi.connect() {
        warn!("WiFi: {}, retrying in {} s", e, WIFI_RETRY_MS / 1000);
        delay.delay_ms(WIFI_RETRY_MS);
    }
    while let Err(e) = wifi.sync_time(&clock, &mut delay, TIME_SYNC_TIMEOUT_MS) {
        warn!("{}, still waiting", e);
    }

    // ── 4. Persisted state (or first-run setup) ───────────────
    let mut store = NvsAdapter::new()?;
    let (record, first_run) = match store.load() {
        Ok(record) => (record, false),
        Err(e) => {
            warn!("No usable state ({}), running first-run setup", e);
            (first_run_record(&clock)?, true)
        }
    };

    // ── 5. Application service ────────────────────────────────
    let mut app = AppService::new(record, probe, first_run, &clock);
    if first_run && !app.persist(&mut store, &mut sink) {
        warn!("First-run record not saved yet; the first check retries");
    }
    app.start(&clock, &mut hw, &mut delay, &mut sink);
    let mut forecast = NwsForecastClient::new();

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        hw.poll_button();
        wifi.poll(hw_init::monotonic_ms());
        events::push_event(Event::ControlTick);

        let mut stop = false;
        events::drain_events(|event| match event {
            Event::ShutdownRequested => stop = true,
            Event::ForceCheck if !stop => {
                app.force_check(&clock, &mut forecast, &mut hw, &mut delay, &mut store, &mut sink);
            }
            Event::ControlTick if !stop => {
                app.tick(&clock, &mut forecast, &mut hw, &mut delay, &mut store, &mut sink);
            }
            _ => {}
        });

        if stop || events::shutdown_requested() {
            app.shutdown(&mut hw, &mut store, &mut sink);
            break;
        }

        delay.delay_ms(LOOP_PERIOD_MS);
    }

    info!("Stopped; power-cycle to restart");
    Ok(())
}

fn first_run_record(clock: &SystemClock) -> Result<PersistedState> {
    let answers = SetupAnswers::parse(SETUP).context("first-run setup answers")?;
    let config = StationConfig::from_setup(answers).context("first-run setup answers")?;
    Ok(PersistedState::new(config, clock.now_epoch_secs()))
}
