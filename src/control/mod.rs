//! Pump control: run-state machine and loop energy accounting.

pub mod energy;
pub mod pump;

pub use energy::EnergyMeter;
pub use pump::{CycleSummary, PumpController, PumpTrigger, StartRejected, StopReason};
