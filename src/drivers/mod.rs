//! Actuator drivers and front-panel input helpers.

pub mod button;
pub mod indicator;
pub mod pump;
