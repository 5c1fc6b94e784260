//! Time primitives shared by every controller component.
//!
//! Two independent time bases exist on the device:
//!
//! | Type          | Source                         | Used for                                  |
//! |---------------|--------------------------------|-------------------------------------------|
//! | [`Millis`]    | monotonic uptime (always valid)| draw detection, pump run time, throttles  |
//! | [`EpochSecs`] | SNTP-synced wall clock         | vacation, lockouts, cooldowns, last run   |
//!
//! Subtraction between instants is checked: if two readings disagree on
//! ordering (wall clock stepped backwards after a resync) the elapsed time
//! is reported as `None` or saturates to zero instead of wrapping.

use serde::{Deserialize, Serialize};

/// Number of weekdays in the learning grid (0 = Monday … 6 = Sunday).
pub const WEEKDAYS: usize = 7;

/// Number of half-hour slots per day.
pub const SLOTS_PER_DAY: usize = 48;

/// Short weekday names indexed by the internal weekday index.
pub const WEEKDAY_NAMES: [&str; WEEKDAYS] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

// ---------------------------------------------------------------------------
// Monotonic milliseconds
// ---------------------------------------------------------------------------

/// Monotonic uptime in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Millis(pub u64);

impl Millis {
    /// Milliseconds elapsed since `earlier`, or `None` if `earlier` is in the future.
    pub fn checked_since(self, earlier: Millis) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }

    /// Milliseconds elapsed since `earlier`, clamped at zero.
    pub fn saturating_since(self, earlier: Millis) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Whole seconds elapsed since `earlier`, clamped at zero.
    pub fn secs_since(self, earlier: Millis) -> u64 {
        self.saturating_since(earlier) / 1000
    }

    /// `self + ms`, saturating.
    pub fn add_ms(self, ms: u64) -> Millis {
        Millis(self.0.saturating_add(ms))
    }
}

// ---------------------------------------------------------------------------
// Wall-clock seconds
// ---------------------------------------------------------------------------

/// Wall-clock timestamp in seconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct EpochSecs(pub u64);

impl EpochSecs {
    /// Seconds elapsed since `earlier`, or `None` if `earlier` is in the future.
    pub fn checked_since(self, earlier: EpochSecs) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }

    /// Seconds elapsed since `earlier`, clamped at zero.
    pub fn saturating_since(self, earlier: EpochSecs) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

// ---------------------------------------------------------------------------
// Broken-down local time
// ---------------------------------------------------------------------------

/// A valid wall-clock reading broken down into local calendar fields.
///
/// `weekday` follows the C library convention used by the clock source:
/// 1 = Sunday, 2 = Monday, …, 7 = Saturday. Use [`WallClock::weekday_index`]
/// to obtain the Monday-based index used by the learning grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub epoch: EpochSecs,
    /// 1 = Sunday … 7 = Saturday.
    pub weekday: u8,
    /// 1 … 366.
    pub day_of_year: u16,
    pub hour: u8,
    pub minute: u8,
}

impl WallClock {
    /// Monday-based weekday index (0 = Monday … 6 = Sunday).
    pub fn weekday_index(&self) -> usize {
        weekday_index(self.weekday)
    }

    /// Half-hour slot of the day (0 … 47).
    pub fn slot(&self) -> usize {
        slot_index(self.hour, self.minute)
    }
}

/// Convert a 1 = Sunday … 7 = Saturday weekday into 0 = Monday … 6 = Sunday.
///
/// Out-of-range inputs are clamped into the grid.
pub fn weekday_index(raw: u8) -> usize {
    match raw {
        1 => 6,
        2..=7 => usize::from(raw - 2),
        0 => 0,
        _ => 6,
    }
}

/// Half-hour slot for a time of day: `hour * 2 + (minute >= 30)`, clamped to 0 … 47.
pub fn slot_index(hour: u8, minute: u8) -> usize {
    let slot = usize::from(hour) * 2 + usize::from(minute >= 30);
    slot.min(SLOTS_PER_DAY - 1)
}
