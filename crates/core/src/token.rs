//! State tokens
//!
//! A [`StateToken`] marks the point in time after which synchronization
//! events count. Tokens are truncated to the resolution of the monitor that
//! evaluates them, so that a monitor with coarse timestamps never rejects an
//! event that happened in the same tick as the token was taken.

use std::fmt;
use std::time::Duration;

use jiff::Timestamp;

/// Timestamp resolution of the default log based monitors
pub const SECOND_RESOLUTION: Duration = Duration::from_secs(1);

/// Timestamp resolution of status API based monitors
pub const MICROSECOND_RESOLUTION: Duration = Duration::from_micros(1);

/// Marker rejecting any event that happened before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateToken {
    time: Timestamp,
}

impl StateToken {
    /// Create a token for the current instant truncated to `resolution`
    pub fn now(resolution: Duration) -> Self {
        Self::at(Timestamp::now(), resolution)
    }

    /// Create a token for `time` truncated to `resolution`
    pub fn at(time: Timestamp, resolution: Duration) -> Self {
        Self {
            time: truncate(time, resolution),
        }
    }

    /// Create a token for `time` without truncation
    pub fn exact(time: Timestamp) -> Self {
        Self { time }
    }

    /// The earliest instant this token accepts
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// Whether an event at `instant` happened at or after this token
    pub fn accepts_instant(&self, instant: Timestamp) -> bool {
        instant >= self.time
    }

    /// Whether `other` was taken at or after this token
    pub fn accepts(&self, other: &StateToken) -> bool {
        self.accepts_instant(other.time)
    }
}

impl fmt::Display for StateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "time {}", self.time)
    }
}

/// Truncate `time` down to a multiple of `resolution` since the Unix epoch
pub fn truncate(time: Timestamp, resolution: Duration) -> Timestamp {
    let step = resolution.as_nanos() as i128;
    if step <= 1 {
        return time;
    }
    let nanos = time.as_nanosecond();
    // Truncation only ever moves towards the epoch range, so it stays valid.
    Timestamp::from_nanosecond(nanos - nanos.rem_euclid(step)).unwrap_or(time)
}

/// Signed distance from `earlier` to `later`, saturating at zero
pub fn elapsed_between(earlier: Timestamp, later: Timestamp) -> Duration {
    let delta = later.as_nanosecond() - earlier.as_nanosecond();
    if delta <= 0 {
        Duration::ZERO
    } else {
        Duration::from_nanos(u64::try_from(delta).unwrap_or(u64::MAX))
    }
}
