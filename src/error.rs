//! Unified error types for the RainBypass controller.
//!
//! One `Error` enum that every subsystem converts into, so the control loop
//! can branch on each failure explicitly.  None of these is fatal: the
//! loop degrades (stale cache, short retry, unconfirmed valve) and keeps
//! running.  All variants are `Copy`.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The forecast could not be fetched or parsed.
    Fetch(FetchError),
    /// The forecast arrived but covers fewer hours than the look-ahead window.
    ForecastTooShort { got: usize, need: usize },
    /// A fetch failed and the cached forecast cannot stand in for it.
    CacheExhausted { cached: usize, need: usize },
    /// Neither the forecast slice nor the history contributed a sample.
    EmptyWindow,
    /// The valve did not report the target position within the timeout.
    ValveMoveTimeout(ValvePosition),
    /// Persisted state is missing or failed validation.
    ConfigInvalid(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "fetch: {e}"),
            Self::ForecastTooShort { got, need } => {
                write!(f, "forecast too short ({got} of {need} hours)")
            }
            Self::CacheExhausted { cached, need } => {
                write!(f, "insufficient cached data ({cached} hours, need more than {need})")
            }
            Self::EmptyWindow => write!(f, "empty sample window"),
            Self::ValveMoveTimeout(pos) => write!(f, "valve {pos} timed out"),
            Self::ConfigInvalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Fetch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure.
    Transport(&'static str),
    /// Server answered with a non-success status code.
    Http(u16),
    /// Response body did not contain a usable `hourly-qpf` series.
    Parse(&'static str),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Http(status) => write!(f, "HTTP status {status}"),
            Self::Parse(msg) => write!(f, "parse: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<FetchError> for Error {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

// ---------------------------------------------------------------------------
// Valve position
// ---------------------------------------------------------------------------

/// Physical end positions of the bypass valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValvePosition {
    /// Water flows to the sprinklers (watering enabled).
    Open,
    /// Water is blocked (watering disabled).
    Closed,
}

impl ValvePosition {
    /// Target position for a watering decision.
    pub const fn for_watering(enabled: bool) -> Self {
        if enabled { Self::Open } else { Self::Closed }
    }
}

impl fmt::Display for ValvePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "opening"),
            Self::Closed => write!(f, "closing"),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
