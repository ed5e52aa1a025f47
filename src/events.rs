//! Interrupt-safe event queue and the shutdown flag.
//!
//! Events are produced by:
//! - the button gesture detector (manual check, shutdown)
//! - software (control tick)
//!
//! Events are consumed by the main control loop, one at a time, in FIFO
//! order.  The shutdown request is additionally latched in an atomic flag
//! so long blocking waits (the valve sensor poll) can see it without
//! draining the queue.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Button      │────▶│  Event Queue │────▶│  Main Loop   │
//! │ Software    │────▶│  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//!        │                                        ▲
//!        └──────────── SHUTDOWN flag ─────────────┘ (valve poll)
//! ```

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Maximum number of pending events.
const EVENT_QUEUE_CAP: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// Terminate: persist state and release the relays.
    ShutdownRequested = 0,
    /// Check the forecast now, regardless of the schedule.
    ForceCheck = 1,
    /// Main loop heartbeat.
    ControlTick = 2,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Producers push, the main loop pops.  Slots are atomics so no
// `static mut` is needed.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
static EVENT_BUFFER: [AtomicU8; EVENT_QUEUE_CAP] = [const { AtomicU8::new(0) }; EVENT_QUEUE_CAP];

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Push an event into the queue.
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // full, event dropped
    }

    EVENT_BUFFER[head as usize].store(event as u8, Ordering::Relaxed);
    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event.  Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None;
    }

    let raw = EVENT_BUFFER[tail as usize].load(Ordering::Relaxed);
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback, FIFO.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

// ── Shutdown flag ─────────────────────────────────────────────

/// Latch a shutdown request and queue the matching event.
pub fn request_shutdown() {
    if !SHUTDOWN.swap(true, Ordering::AcqRel) {
        push_event(Event::ShutdownRequested);
    }
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::Acquire)
}

/// Clear the latch (after a handled shutdown, or between tests).
pub fn clear_shutdown() {
    SHUTDOWN.store(false, Ordering::Release);
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        0 => Some(Event::ShutdownRequested),
        1 => Some(Event::ForceCheck),
        2 => Some(Event::ControlTick),
        _ => None,
    }
}
