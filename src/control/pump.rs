//! Recirculation pump run-state machine.
//!
//! ```text
//!            start(trigger) ok
//!   Idle ─────────────────────────▶ Running { trigger, started, baseline_return }
//!    ▲                                  │
//!    └────────── stop(reason) ──────────┘
//! ```
//!
//! Every trigger source (button, settings surface, draw detector, learned
//! schedule, disinfection detector, anti-stagnation window) goes through
//! [`PumpController::start`]; every stop goes through
//! [`PumpController::stop`]. The controller owns no hardware. The service
//! mirrors its state onto the relay and the green indicator.
//!
//! ## Stop rules (evaluated each tick while running)
//!
//! | Order | Condition                                    | Reason                   |
//! |-------|----------------------------------------------|--------------------------|
//! | 1     | elapsed ≥ `max_run_secs`                     | `SafetyTimeout`          |
//! | 2     | anti-stagnation and elapsed ≥ runtime        | `AntiStagnationComplete` |
//! | 3     | disinfection mode                            | (runs to the ceiling)    |
//! | 4     | elapsed ≥ `min_run_secs` and return reached  | `TargetReached`          |

use core::fmt;

use log::{info, warn};
use serde::Serialize;

use crate::clock::{EpochSecs, Millis};
use crate::config::ControllerConfig;

use super::energy::EnergyMeter;

/// Tolerance subtracted from the return target before stopping (°C).
pub const RETURN_TARGET_TOLERANCE_C: f32 = 0.2;

// ───────────────────────────────────────────────────────────────
// Trigger / reason enums
// ───────────────────────────────────────────────────────────────

/// Why the pump was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PumpTrigger {
    ManualButton,
    ManualUi,
    WaterDraw,
    Scheduled,
    Disinfection,
    AntiStagnation,
}

impl PumpTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManualButton => "Manual Button",
            Self::ManualUi => "Web UI",
            Self::WaterDraw => "Water Draw",
            Self::Scheduled => "Schedule",
            Self::Disinfection => "Disinfection",
            Self::AntiStagnation => "Anti-Stagnation",
        }
    }

    /// Triggers that must run even when the return line is already hot.
    pub fn ignores_return_temp(self) -> bool {
        matches!(self, Self::AntiStagnation | Self::Disinfection)
    }

    /// Triggers allowed while automatic operation is disabled.
    pub fn bypasses_pump_enable(self) -> bool {
        matches!(self, Self::AntiStagnation)
    }
}

impl fmt::Display for PumpTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a start request was refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartRejected {
    /// No pump relay is bound.
    NoPump,
    AlreadyRunning,
    /// Automatic operation is disabled and the trigger does not bypass it.
    Disabled,
    /// The return sensor has no valid reading.
    ReturnSensorInvalid,
    /// The loop is already hot at the taps.
    AlreadyHot { return_c: f32, threshold_c: f32 },
}

impl fmt::Display for StartRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPump => write!(f, "no pump bound"),
            Self::AlreadyRunning => write!(f, "pump already running"),
            Self::Disabled => write!(f, "pump disabled"),
            Self::ReturnSensorInvalid => write!(f, "return sensor invalid"),
            Self::AlreadyHot {
                return_c,
                threshold_c,
            } => write!(
                f,
                "return already hot ({:.1}°C >= {:.1}°C)",
                return_c, threshold_c
            ),
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    SafetyTimeout,
    AntiStagnationComplete,
    TargetReached,
    ManualButton,
    ManualUi,
    PumpDisabled,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SafetyTimeout => "Safety timeout",
            Self::AntiStagnationComplete => "Anti-stagnation complete",
            Self::TargetReached => "Target reached",
            Self::ManualButton => "Manual stop",
            Self::ManualUi => "Web UI stop",
            Self::PumpDisabled => "Pump disabled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ───────────────────────────────────────────────────────────────
// Session state
// ───────────────────────────────────────────────────────────────

/// Gate inputs owned by the service rather than the controller.
#[derive(Debug, Clone, Copy)]
pub struct StartGate {
    pub pump_bound: bool,
    pub pump_enabled: bool,
}

#[derive(Debug, Clone, Copy)]
struct PumpSession {
    trigger: PumpTrigger,
    started: Millis,
    baseline_return_c: f32,
    energy: EnergyMeter,
}

/// Result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleSummary {
    pub trigger: PumpTrigger,
    pub reason: StopReason,
    pub duration_secs: u64,
    pub energy_kwh: f32,
    pub samples: u32,
    pub disinfection: bool,
}

/// Pump run-state machine with safety ceiling and energy accounting.
#[derive(Debug, Default)]
pub struct PumpController {
    session: Option<PumpSession>,
    disinfection_mode: bool,
    last_cycle_secs: u64,
    last_cycle_kwh: f32,
    last_run_epoch: Option<EpochSecs>,
}

impl PumpController {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Trigger of the current run, `None` while idle.
    pub fn trigger(&self) -> Option<PumpTrigger> {
        self.session.map(|s| s.trigger)
    }

    pub fn disinfection_mode(&self) -> bool {
        self.disinfection_mode
    }

    /// Return temperature captured when the current run started.
    pub fn baseline_return(&self) -> Option<f32> {
        self.session.map(|s| s.baseline_return_c)
    }

    /// Whole seconds since the current run started.
    pub fn elapsed_secs(&self, now: Millis) -> Option<u64> {
        self.session.map(|s| now.secs_since(s.started))
    }

    pub fn last_cycle_duration_secs(&self) -> u64 {
        self.last_cycle_secs
    }

    pub fn last_cycle_energy_kwh(&self) -> f32 {
        self.last_cycle_kwh
    }

    pub fn last_run_epoch(&self) -> Option<EpochSecs> {
        self.last_run_epoch
    }

    /// Whether a run finished less than `max_age_secs` before `now`.
    /// Without a valid clock or a previous run nothing counts as recent.
    pub fn ran_recently(&self, now: Option<EpochSecs>, max_age_secs: u32) -> bool {
        match (now, self.last_run_epoch) {
            (Some(now), Some(last)) => now.saturating_since(last) < u64::from(max_age_secs),
            _ => false,
        }
    }

    // ── Transitions ───────────────────────────────────────────

    /// Try to start a run. On success the caller energises the relay.
    pub fn start(
        &mut self,
        trigger: PumpTrigger,
        gate: StartGate,
        return_c: Option<f32>,
        now: Millis,
        cfg: &ControllerConfig,
    ) -> Result<(), StartRejected> {
        if !gate.pump_bound {
            return Err(StartRejected::NoPump);
        }
        if self.session.is_some() {
            return Err(StartRejected::AlreadyRunning);
        }
        if !gate.pump_enabled && !trigger.bypasses_pump_enable() {
            return Err(StartRejected::Disabled);
        }
        let Some(return_c) = return_c else {
            return Err(StartRejected::ReturnSensorInvalid);
        };
        if !trigger.ignores_return_temp() && return_c >= cfg.min_return_temp_c {
            return Err(StartRejected::AlreadyHot {
                return_c,
                threshold_c: cfg.min_return_temp_c,
            });
        }

        self.disinfection_mode = trigger == PumpTrigger::Disinfection;
        self.session = Some(PumpSession {
            trigger,
            started: now,
            baseline_return_c: return_c,
            energy: EnergyMeter::new(now),
        });

        if self.disinfection_mode {
            info!(
                "Pump ON - disinfection mode (trigger: {}, baseline return={:.2}°C, runs to max time)",
                trigger, return_c
            );
        } else {
            info!("Pump ON (trigger: {}, baseline return={:.2}°C)", trigger, return_c);
        }
        Ok(())
    }

    /// Per-tick supervision of a running pump. Returns the reason the run
    /// must end now, if any; the caller then invokes [`stop`](Self::stop).
    pub fn control(
        &mut self,
        outlet_c: Option<f32>,
        return_c: Option<f32>,
        now: Millis,
        cfg: &ControllerConfig,
    ) -> Option<StopReason> {
        let disinfection = self.disinfection_mode;
        let session = self.session.as_mut()?;

        if let (Some(out), Some(ret)) = (outlet_c, return_c) {
            session.energy.sample(out, ret, cfg.pump_flow_rate_lpm, now);
        }

        let elapsed = now.secs_since(session.started);
        if elapsed >= u64::from(cfg.max_run_secs) {
            return Some(StopReason::SafetyTimeout);
        }

        if session.trigger == PumpTrigger::AntiStagnation {
            return (elapsed >= u64::from(cfg.anti_stagnation_runtime_secs))
                .then_some(StopReason::AntiStagnationComplete);
        }

        if disinfection {
            return None;
        }

        let ret = return_c?;
        let target = session.baseline_return_c + cfg.return_rise_threshold_c
            - RETURN_TARGET_TOLERANCE_C;
        (elapsed >= u64::from(cfg.min_run_secs) && ret >= target)
            .then_some(StopReason::TargetReached)
    }

    /// End the current run. `epoch` is the wall clock if valid. Returns
    /// `None` when the pump was not running.
    pub fn stop(
        &mut self,
        reason: StopReason,
        now: Millis,
        epoch: Option<EpochSecs>,
    ) -> Option<CycleSummary> {
        let Some(session) = self.session.take() else {
            warn!("Stop requested ({}) but pump is idle", reason);
            return None;
        };

        let summary = CycleSummary {
            trigger: session.trigger,
            reason,
            duration_secs: now.secs_since(session.started),
            energy_kwh: session.energy.kwh(),
            samples: session.energy.samples(),
            disinfection: self.disinfection_mode,
        };

        self.last_cycle_secs = summary.duration_secs;
        self.last_cycle_kwh = summary.energy_kwh;
        self.last_run_epoch = epoch;
        self.disinfection_mode = false;

        info!(
            "Pump cycle complete: duration={}s energy={:.4} kWh ({} samples)",
            summary.duration_secs, summary.energy_kwh, summary.samples
        );
        if summary.disinfection {
            info!("Pump OFF - disinfection cycle complete ({})", reason);
        } else {
            info!("Pump OFF ({})", reason);
        }
        Some(summary)
    }
}
