//! Rolling hourly rainfall history.
//!
//! Index 0 is the most recent hour.  New observations are inserted at the
//! front; once the seven-day capacity is reached the oldest hour falls off
//! the back.  Stored inline in a `heapless::Deque` so the history never
//! allocates.

use heapless::Deque;
use serde::{Deserialize, Serialize};

use crate::config::MAX_WINDOW_HOURS;

/// Capacity in hours (7 days).
pub const HISTORY_CAPACITY: usize = MAX_WINDOW_HOURS as usize;

/// Serialises as a plain array of inches/hour values, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<f32>", into = "Vec<f32>")]
pub struct RainHistory {
    hours: Deque<f32, HISTORY_CAPACITY>,
}

impl RainHistory {
    pub const fn new() -> Self {
        Self {
            hours: Deque::new(),
        }
    }

    /// Record a new most-recent hour, evicting the oldest when full.
    pub fn push_front(&mut self, inches: f32) {
        if self.hours.is_full() {
            self.hours.pop_back();
        }
        // Cannot fail: a slot was freed above.
        let _ = self.hours.push_front(inches);
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    pub fn clear(&mut self) {
        self.hours.clear();
    }

    /// Newest-first iterator.
    pub fn iter(&self) -> impl Iterator<Item = &f32> + '_ {
        self.hours.iter()
    }

    /// The `n` most recent hours (fewer if the history is shorter).
    pub fn recent(&self, n: usize) -> impl Iterator<Item = f32> + '_ {
        self.hours.iter().take(n).copied()
    }
}

impl PartialEq for RainHistory {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl From<Vec<f32>> for RainHistory {
    /// Keeps at most the first [`HISTORY_CAPACITY`] (newest) entries.
    fn from(values: Vec<f32>) -> Self {
        let mut hours = Deque::new();
        for v in values.into_iter().take(HISTORY_CAPACITY) {
            let _ = hours.push_back(v);
        }
        Self { hours }
    }
}

impl From<RainHistory> for Vec<f32> {
    fn from(history: RainHistory) -> Self {
        history.hours.iter().copied().collect()
    }
}
