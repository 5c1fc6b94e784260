//! Vacation-mode monitor.
//!
//! The household is considered away after a full day without a confirmed
//! draw. While away, learning decay, scheduled pre-heat and disinfection
//! runs are suppressed so an empty house neither forgets its habits nor
//! heats a loop nobody uses. Draw detection keeps running; the next
//! confirmed draw ends vacation mode.

use log::{info, warn};

use crate::clock::EpochSecs;

/// Seconds without a confirmed draw before vacation mode starts.
pub const VACATION_AFTER_SECS: u64 = 86_400;
/// Spacing of the periodic status line while away.
const STATUS_LOG_SECS: u64 = 3_600;

#[derive(Debug, Default)]
pub struct VacationMonitor {
    /// Unset until the first valid clock reading.
    last_draw: Option<EpochSecs>,
    active: bool,
    last_status_log: Option<EpochSecs>,
}

impl VacationMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_draw(&self) -> Option<EpochSecs> {
        self.last_draw
    }

    /// Evaluate on a tick with a valid clock. Returns `true` on the tick
    /// that enters vacation mode.
    pub fn poll(&mut self, now: EpochSecs) -> bool {
        let Some(last) = self.last_draw else {
            self.last_draw = Some(now);
            return false;
        };

        let since = now.saturating_since(last);
        let entered = !self.active && since >= VACATION_AFTER_SECS;
        if entered {
            self.active = true;
            warn!(
                "Entering vacation mode: no water draw for {}h, automatic runs suspended",
                since / 3_600
            );
        }

        if self.active {
            let due = self
                .last_status_log
                .is_none_or(|t| now.saturating_since(t) >= STATUS_LOG_SECS);
            if due {
                info!("Vacation mode: {}h since last water draw", since / 3_600);
                self.last_status_log = Some(now);
            }
        }
        entered
    }

    /// Record a confirmed draw. Returns `true` if this ended vacation mode.
    ///
    /// Without a wall clock the draw time is unknown; the reference is
    /// cleared so the next valid tick restarts the countdown from then.
    pub fn record_draw(&mut self, now: Option<EpochSecs>) -> bool {
        self.last_draw = now;
        if !self.active {
            return false;
        }
        self.active = false;
        self.last_status_log = None;
        warn!("Exiting vacation mode: water draw detected, resuming normal operation");
        true
    }
}
