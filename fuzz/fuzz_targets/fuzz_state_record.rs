//! Fuzz target: `PersistedState::from_json`
//!
//! Any record that loads must be within the clamped ranges and must
//! survive a save/load cycle unchanged.
//!
//! cargo fuzz run fuzz_state_record

#![no_main]

use libfuzzer_sys::fuzz_target;
use rainbypass::config::MAX_WINDOW_HOURS;
use rainbypass::history::HISTORY_CAPACITY;
use rainbypass::state::PersistedState;

fuzz_target!(|data: &[u8]| {
    let Ok(state) = PersistedState::from_json(data) else {
        return;
    };
    let cfg = &state.config;
    assert!((1..=MAX_WINDOW_HOURS).contains(&cfg.look_ahead_hours));
    assert!((1..=MAX_WINDOW_HOURS).contains(&cfg.look_behind_hours));
    assert!(cfg.check_interval_seconds > 0);
    assert!(state.historical_rain.len() <= HISTORY_CAPACITY);

    let bytes = state.to_json().expect("loaded record serialises");
    let again = PersistedState::from_json(&bytes).expect("saved record loads");
    assert_eq!(again.config, state.config);
    assert_eq!(again.last_check_time, state.last_check_time);
});
