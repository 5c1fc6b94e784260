//! Inbound commands to the application service.
//!
//! These represent actions requested from the settings surface that the
//! [`HotWaterController`](super::service::HotWaterController) interprets
//! and acts upon. The physical button is sampled by the service itself.

use crate::config::ControllerConfig;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Start the pump now (trigger `ManualUi`).
    PumpOn,

    /// Stop a running pump.
    PumpOff,

    /// Resume automatic operation.
    EnablePump,

    /// Suspend automatic operation; stops a running pump.
    DisablePump,

    /// Switch usage learning on or off.
    SetLearningEnabled(bool),

    /// Persist the learning matrix immediately.
    SaveLearning,

    /// Return the learning matrix to the seed pattern.
    ResetLearning,

    /// Hot-reload configuration (validated before it is applied).
    UpdateConfig(ControllerConfig),

    /// Explicitly persist the current config on the next auto-save check.
    SaveConfig,
}
