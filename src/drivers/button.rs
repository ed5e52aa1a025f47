//! ISR-debounced button driver with short and long press detection.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up. GPIO fires on falling edge;
//! the ISR records the raw timestamp into an atomic, and [`ButtonDriver::tick`]
//! (called from the main loop and from the valve sensor poll) runs the
//! debounce + gesture state machine.
//!
//! ## Gesture detection
//!
//! | Gesture     | Condition                         | Effect                    |
//! |-------------|-----------------------------------|---------------------------|
//! | Short press | Released before 3 s               | check the forecast now    |
//! | Long press  | Held for 3 s                      | persist and shut down     |

use core::sync::atomic::{AtomicU32, Ordering};

use crate::drivers::hw_init;

const DEBOUNCE_MS: u32 = 50;
const LONG_PRESS_MS: u32 = 3000;

/// Raw ISR timestamp (milliseconds since boot, truncated to u32).
/// Written by the ISR, read by the main loop.
static BUTTON_ISR_TIMESTAMP: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Idle,
    DebounceWait { since_ms: u32 },
    Pressed { since_ms: u32 },
}

pub struct ButtonDriver {
    gpio: i32,
    state: GestureState,
    last_isr_ms: u32,
}

impl ButtonDriver {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            state: GestureState::Idle,
            last_isr_ms: BUTTON_ISR_TIMESTAMP.load(Ordering::Acquire),
        }
    }

    /// Advance the gesture state machine.  `now_ms` is monotonic time.
    pub fn tick(&mut self, now_ms: u32) -> Option<ButtonEvent> {
        let isr_ms = BUTTON_ISR_TIMESTAMP.load(Ordering::Acquire);
        let new_edge = isr_ms != self.last_isr_ms && isr_ms != 0;

        match self.state {
            GestureState::Idle => {
                if new_edge {
                    self.last_isr_ms = isr_ms;
                    self.state = GestureState::DebounceWait { since_ms: now_ms };
                }
                None
            }

            GestureState::DebounceWait { since_ms } => {
                if now_ms.wrapping_sub(since_ms) >= DEBOUNCE_MS {
                    self.state = if self.is_pressed() {
                        GestureState::Pressed { since_ms }
                    } else {
                        GestureState::Idle
                    };
                }
                None
            }

            GestureState::Pressed { since_ms } => {
                if now_ms.wrapping_sub(since_ms) >= LONG_PRESS_MS {
                    self.state = GestureState::Idle;
                    return Some(ButtonEvent::LongPress);
                }
                if !self.is_pressed() {
                    self.state = GestureState::Idle;
                    return Some(ButtonEvent::ShortPress);
                }
                None
            }
        }
    }

    fn is_pressed(&self) -> bool {
        !hw_init::gpio_read(self.gpio)
    }
}

/// ISR handler: register this on the button GPIO falling edge.
/// Safe to call from interrupt context (lock-free atomic store).
pub fn button_isr_handler(now_ms: u32) {
    BUTTON_ISR_TIMESTAMP.store(now_ms.max(1), Ordering::Release);
}
