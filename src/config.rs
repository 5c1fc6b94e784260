//! Controller configuration parameters
//!
//! All tunable parameters for the recirculation controller.
//! Values can be overridden through the settings surface and are persisted
//! to NVS by the [`ConfigPort`](crate::app::ports::ConfigPort) adapter.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Temperature thresholds ---
    /// Outlet rise (°C) a draw must accumulate before it is confirmed
    pub temp_rise_threshold_c: f32,
    /// Return rise (°C) above the start baseline that ends a normal run
    pub return_rise_threshold_c: f32,
    /// Outlet elevation (°C) above baseline that signals a disinfection cycle
    pub disinfection_temp_threshold_c: f32,
    /// Return temperature (°C) at which water is already considered hot
    pub min_return_temp_c: f32,

    // --- Pump ---
    /// Pump flow rate (L/min), used for energy accounting
    pub pump_flow_rate_lpm: f32,
    /// Minimum run time before a temperature stop is allowed (seconds)
    pub min_run_secs: u32,
    /// Absolute safety ceiling on any single run (seconds)
    pub max_run_secs: u32,

    // --- Draw detection ---
    /// Rise must persist this long before it is confirmed (milliseconds)
    pub min_draw_duration_ms: u32,
    /// A draw does not start a new run if one finished within this window (seconds)
    pub user_request_max_age_secs: u32,

    // --- Disinfection ---
    /// Minimum spacing between two disinfection detections (seconds)
    pub disinfection_cooldown_secs: u32,

    // --- Anti-stagnation ---
    /// Maintenance interval exposed on the settings surface (seconds)
    pub anti_stagnation_interval_secs: u32,
    /// Maintenance run length (seconds)
    pub anti_stagnation_runtime_secs: u32,
    /// Maintenance weekday (0 = Monday … 6 = Sunday)
    pub anti_stagnation_weekday: u8,
    /// Maintenance hour (0-23)
    pub anti_stagnation_hour: u8,
    /// First minute of the maintenance window
    pub anti_stagnation_minute_start: u8,
    /// Window length in minutes
    pub anti_stagnation_window_mins: u8,

    // --- Learning ---
    /// Weight added to a slot on every confirmed draw
    pub learn_increment: u8,
    /// Slot weight at which a scheduled pre-heat fires
    pub schedule_threshold: u8,
    /// Daily multiplicative decay applied to every slot
    pub decay_factor: f32,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Temperature thresholds
            temp_rise_threshold_c: 1.5,
            return_rise_threshold_c: 1.5,
            disinfection_temp_threshold_c: 10.0,
            min_return_temp_c: 30.0,

            // Pump
            pump_flow_rate_lpm: 3.0,
            min_run_secs: 30,
            max_run_secs: 480, // 8 min

            // Draw detection
            min_draw_duration_ms: 15_000,
            user_request_max_age_secs: 1_800, // 30 min

            // Disinfection
            disinfection_cooldown_secs: 3_600, // 1 h

            // Anti-stagnation
            anti_stagnation_interval_secs: 172_800, // 48 h
            anti_stagnation_runtime_secs: 15,
            anti_stagnation_weekday: 6, // Sunday
            anti_stagnation_hour: 3,
            anti_stagnation_minute_start: 0,
            anti_stagnation_window_mins: 5,

            // Learning
            learn_increment: 40,
            schedule_threshold: 120,
            decay_factor: 0.98,

            // Timing
            control_loop_interval_ms: 1000, // 1 Hz
        }
    }
}

impl ControllerConfig {
    /// Range-check every field.
    ///
    /// Out-of-range values are rejected, never clamped, so a bad settings
    /// write cannot silently disable a safety limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.1..=5.0).contains(&self.temp_rise_threshold_c) {
            return Err(ConfigError::ValidationFailed(
                "temp_rise_threshold_c must be 0.1–5.0",
            ));
        }
        if !(0.1..=10.0).contains(&self.return_rise_threshold_c) {
            return Err(ConfigError::ValidationFailed(
                "return_rise_threshold_c must be 0.1–10.0",
            ));
        }
        if !(5.0..=20.0).contains(&self.disinfection_temp_threshold_c) {
            return Err(ConfigError::ValidationFailed(
                "disinfection_temp_threshold_c must be 5.0–20.0",
            ));
        }
        if !(20.0..=45.0).contains(&self.min_return_temp_c) {
            return Err(ConfigError::ValidationFailed(
                "min_return_temp_c must be 20.0–45.0",
            ));
        }
        if !(0.5..=50.0).contains(&self.pump_flow_rate_lpm) {
            return Err(ConfigError::ValidationFailed(
                "pump_flow_rate_lpm must be 0.5–50.0",
            ));
        }
        if self.max_run_secs == 0 || self.min_run_secs >= self.max_run_secs {
            return Err(ConfigError::ValidationFailed(
                "min_run_secs must be < max_run_secs",
            ));
        }
        if self.anti_stagnation_runtime_secs == 0
            || self.anti_stagnation_runtime_secs >= self.max_run_secs
        {
            return Err(ConfigError::ValidationFailed(
                "anti_stagnation_runtime_secs must be 1..max_run_secs",
            ));
        }
        if self.anti_stagnation_weekday > 6 || self.anti_stagnation_hour > 23 {
            return Err(ConfigError::ValidationFailed(
                "anti-stagnation weekday must be 0–6 and hour 0–23",
            ));
        }
        let window_end =
            u16::from(self.anti_stagnation_minute_start) + u16::from(self.anti_stagnation_window_mins);
        if self.anti_stagnation_window_mins == 0 || window_end > 60 {
            return Err(ConfigError::ValidationFailed(
                "anti-stagnation window must fit inside one hour",
            ));
        }
        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            return Err(ConfigError::ValidationFailed("decay_factor must be in (0, 1)"));
        }
        if self.learn_increment == 0 || self.schedule_threshold == 0 {
            return Err(ConfigError::ValidationFailed(
                "learn_increment and schedule_threshold must be non-zero",
            ));
        }
        if !(100..=5000).contains(&self.control_loop_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "control_loop_interval_ms must be 100–5000",
            ));
        }
        Ok(())
    }
}
