//! Time-based pump triggers.
//!
//! Two schedulers share the [`ScheduleMark`] so that a slot which already
//! produced a run (pre-heat or maintenance) never fires a second time.
//!
//! ```text
//! ┌───────────────────────────────┐    ┌──────────────────────────────┐
//! │ AntiStagnationScheduler       │    │ ScheduleEvaluator            │
//! │  weekly window, pump idle,    │    │  every 30 s: matrix[wd][slot]│
//! │  only when disabled / away    │    │  ≥ threshold and slot ≠ mark │
//! └──────────────┬────────────────┘    └──────────────┬───────────────┘
//!                │ marks slot, 30 min lockout ───────▶│ suppressed
//!                ▼                                    ▼
//!        start(AntiStagnation)                 start(Scheduled)
//! ```

use log::info;

use crate::clock::{EpochSecs, Millis, WallClock};
use crate::config::ControllerConfig;
use crate::learning::LearningMatrix;

/// Lockout after a maintenance run, during which draw detection and
/// scheduled pre-heat are suppressed.
pub const LOCKOUT_SECS: u64 = 1_800;

/// Minimum spacing between two schedule evaluations.
pub const SCHEDULE_CHECK_INTERVAL_MS: u64 = 30_000;

/// Hours on the maintenance weekday during which the status line is logged.
const STATUS_LOG_LAST_HOUR: u8 = 6;

/// The last (weekday, slot) pair that produced a timed trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleMark {
    pub weekday: usize,
    pub slot: usize,
}

impl ScheduleMark {
    pub fn of(wall: &WallClock) -> Self {
        Self {
            weekday: wall.weekday_index(),
            slot: wall.slot(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Anti-stagnation
// ═══════════════════════════════════════════════════════════════

/// Weekly maintenance run that keeps an unused pump from seizing.
///
/// No lockout is applied at boot: `last_run` stays empty until the first
/// run, so a window reached right after power-up still fires. The ESPHome
/// component this controller replaces stamps the first valid clock reading
/// as a run instead, holding off draws and pre-heat for 30 minutes after
/// every reboot.
#[derive(Debug, Default)]
pub struct AntiStagnationScheduler {
    last_run: Option<EpochSecs>,
    /// Set when the window fires; cleared once the clock leaves the
    /// configured (weekday, hour).
    ran_this_week: bool,
    /// Hour of the last status line, so it is printed once per hour.
    last_log_hour: Option<u8>,
}

impl AntiStagnationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_run(&self) -> Option<EpochSecs> {
        self.last_run
    }

    /// Whether `now` falls inside the lockout following the last run.
    pub fn in_lockout(&self, now: EpochSecs) -> bool {
        self.lockout_remaining(now).is_some()
    }

    /// Seconds of lockout left, if any.
    pub fn lockout_remaining(&self, now: EpochSecs) -> Option<u64> {
        let since = now.saturating_since(self.last_run?);
        (since < LOCKOUT_SECS).then(|| LOCKOUT_SECS - since)
    }

    /// Evaluate the maintenance window.
    ///
    /// `needed` is true when automatic operation is off (pump disabled or
    /// vacation mode). Returns `true` when a maintenance run should start
    /// now; the run time is recorded before returning.
    pub fn poll(
        &mut self,
        wall: &WallClock,
        needed: bool,
        pump_running: bool,
        cfg: &ControllerConfig,
    ) -> bool {
        if pump_running {
            return false;
        }

        let on_day = wall.weekday_index() == usize::from(cfg.anti_stagnation_weekday);
        if !on_day || wall.hour != cfg.anti_stagnation_hour {
            self.ran_this_week = false;
        }
        if !needed {
            return false;
        }

        let window_end =
            u16::from(cfg.anti_stagnation_minute_start) + u16::from(cfg.anti_stagnation_window_mins);
        let in_window = on_day
            && wall.hour == cfg.anti_stagnation_hour
            && wall.minute >= cfg.anti_stagnation_minute_start
            && u16::from(wall.minute) < window_end;

        if in_window && !self.ran_this_week {
            self.ran_this_week = true;
            self.last_run = Some(wall.epoch);
            return true;
        }

        if on_day && wall.hour <= STATUS_LOG_LAST_HOUR && self.last_log_hour != Some(wall.hour) {
            if self.ran_this_week {
                info!("Anti-stagnation already completed this week");
            } else {
                let hours_until =
                    (i16::from(cfg.anti_stagnation_hour) - i16::from(wall.hour)).rem_euclid(24);
                info!("Anti-stagnation scheduled in {} hours", hours_until);
            }
            self.last_log_hour = Some(wall.hour);
        }
        false
    }
}

// ═══════════════════════════════════════════════════════════════
//  Learned pre-heat schedule
// ═══════════════════════════════════════════════════════════════

/// Consults the learning matrix and fires once per qualifying slot.
#[derive(Debug, Default)]
pub struct ScheduleEvaluator {
    last_check: Option<Millis>,
    mark: Option<ScheduleMark>,
}

impl ScheduleEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_mark(&self) -> Option<ScheduleMark> {
        self.mark
    }

    /// Record a slot as already triggered.
    pub fn mark(&mut self, mark: ScheduleMark) {
        self.mark = Some(mark);
    }

    /// Evaluate the current slot. Returns the newly marked slot when the
    /// matrix meets the threshold and the slot has not fired yet; the
    /// caller starts the pump if it is idle.
    pub fn evaluate(
        &mut self,
        wall: &WallClock,
        now: Millis,
        matrix: &LearningMatrix,
        threshold: u8,
    ) -> Option<ScheduleMark> {
        if let Some(last) = self.last_check {
            if now.saturating_since(last) < SCHEDULE_CHECK_INTERVAL_MS {
                return None;
            }
        }
        self.last_check = Some(now);

        let here = ScheduleMark::of(wall);
        if !matrix.threshold_met(here.weekday, here.slot, threshold) {
            return None;
        }
        if self.mark == Some(here) {
            log::debug!(
                "Schedule threshold met for d={} slot={} but already triggered",
                here.weekday, here.slot
            );
            return None;
        }

        info!(
            "Scheduled pre-heat for d={} slot={} ({:02}:{:02}, weight={})",
            here.weekday,
            here.slot,
            wall.hour,
            wall.minute,
            matrix.get(here.weekday, here.slot)
        );
        self.mark = Some(here);
        Some(here)
    }
}
