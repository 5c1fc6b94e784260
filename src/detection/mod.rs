//! Temperature-signal detectors.
//!
//! Both detectors are pure state machines over the outlet temperature.
//! They never touch the pump; the service turns their verdicts into
//! [`PumpController::start`](crate::control::pump::PumpController::start)
//! calls.
//!
//! | Detector                | Time base  | Verdict                         |
//! |-------------------------|------------|---------------------------------|
//! | [`DrawDetector`]        | uptime ms  | a tap was opened (rising edge)  |
//! | [`DisinfectionDetector`]| epoch secs | the boiler ran a hot cycle      |

pub mod disinfection;
pub mod draw;

pub use disinfection::DisinfectionDetector;
pub use draw::{DrawConfirmed, DrawDetector};
