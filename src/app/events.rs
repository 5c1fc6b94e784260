//! Outbound application events.
//!
//! The [`HotWaterController`](super::service::HotWaterController) emits
//! these through the [`EventSink`](super::ports::EventSink) port. Adapters
//! on the other side decide what to do with them: log to serial, publish
//! to a dashboard, etc.

use serde::Serialize;

use crate::control::{CycleSummary, PumpTrigger, StartRejected};
use crate::detection::DrawConfirmed;
use crate::scheduler::ScheduleMark;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The controller finished loading persisted state.
    Started { learning_from_storage: bool },

    /// The pump relay was energised.
    PumpStarted {
        trigger: PumpTrigger,
        baseline_return_c: f32,
    },

    /// A run ended.
    PumpStopped(CycleSummary),

    /// A start request was refused.
    StartRejected {
        trigger: PumpTrigger,
        reason: StartRejected,
    },

    /// The draw detector confirmed an opened tap.
    DrawConfirmed(DrawConfirmed),

    VacationEntered { hours_since_draw: u64 },
    VacationExited,

    /// Outlet elevation above the baseline signalled a boiler hot cycle.
    DisinfectionDetected { elevation_c: f32 },

    /// The weekly maintenance window fired.
    AntiStagnationRun { mark: ScheduleMark },

    /// A learned slot triggered pre-heat.
    ScheduledPreheat { mark: ScheduleMark, weight: u8 },

    LearningReinforced {
        weekday: usize,
        slot: usize,
        weight: u8,
    },
    LearningDecayed,
    LearningReset,
    LearningToggled(bool),

    /// Automatic operation was switched on or off.
    PumpEnableChanged(bool),

    /// Periodic status snapshot.
    Status(StatusReport),
}

/// A point-in-time status snapshot suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub pump_running: bool,
    pub trigger: Option<PumpTrigger>,
    /// Whole seconds the current run has lasted.
    pub run_elapsed_secs: Option<u64>,
    pub pump_enabled: bool,
    pub learning_enabled: bool,
    pub vacation_mode: bool,
    pub disinfection_mode: bool,
    pub clock_valid: bool,
    pub outlet_c: Option<f32>,
    pub return_c: Option<f32>,
    pub last_cycle_duration_secs: u64,
    pub last_cycle_energy_kwh: f32,
    pub disinfection_baseline_c: Option<f32>,
    /// Seconds of anti-stagnation lockout left, if any.
    pub lockout_remaining_secs: Option<u64>,
    pub anti_stagnation_interval_secs: u32,
    pub anti_stagnation_runtime_secs: u32,
}
