//! Time primitives shared by the model and the checkers.
//!
//! Absolute instants are [`Timestamp`]s on the synchronized clock, durations are
//! [`chrono::TimeDelta`] and raw manifest timing is integer ticks that only become
//! comparable after going through the [`Timescale`] of the template declaring them.
use std::num::NonZeroU64;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

/// An absolute point on the synchronized wall clock.
pub type Timestamp = DateTime<Utc>;

/// Number of ticks per second used by a segment template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timescale(NonZeroU64);

impl Timescale {
    pub fn new(ticks_per_second: u64) -> Option<Self> {
        NonZeroU64::new(ticks_per_second).map(Self)
    }

    pub fn ticks_per_second(&self) -> u64 {
        self.0.get()
    }

    /// Convert a tick count to a wall-clock duration, truncated to whole nanoseconds.
    ///
    /// The tick count may be negative, which happens when a segment starts before the
    /// presentation time offset of its template. `None` when the result does not fit a
    /// [`TimeDelta`].
    pub fn to_duration(&self, ticks: i128) -> Option<TimeDelta> {
        let ticks_per_second = i128::from(self.0.get());
        let secs = i64::try_from(ticks.div_euclid(ticks_per_second)).ok()?;
        let nanos = ticks.rem_euclid(ticks_per_second) * 1_000_000_000 / ticks_per_second;
        TimeDelta::new(secs, u32::try_from(nanos).ok()?)
    }
}

/// `timestamp + delta`, clamped to the range [`Timestamp`] can represent.
pub fn saturating_add(timestamp: Timestamp, delta: TimeDelta) -> Timestamp {
    timestamp
        .checked_add_signed(delta)
        .unwrap_or(if delta < TimeDelta::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Renders an instant the way notices print it.
pub fn format_timestamp(timestamp: Timestamp) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
