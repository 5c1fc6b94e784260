//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the orchestration of the recirculation controller:
//! per-tick sequencing of the detectors, schedulers and pump state machine,
//! user requests and persistence. All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
