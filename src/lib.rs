//! hotcirc controller library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

#[cfg(all(target_os = "espidf", not(feature = "espidf")))]
compile_error!("building for ESP-IDF requires `--features espidf`");

pub mod app;
pub mod clock;
pub mod config;
pub mod control;
pub mod detection;
pub mod error;
pub mod learning;
pub mod pins;
pub mod scheduler;
pub mod vacation;

pub mod adapters;
pub mod drivers;
pub mod sensors;

pub use app::service::HotWaterController;
pub use config::ControllerConfig;
pub use error::{Error, Result};
