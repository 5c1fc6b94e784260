//! GPIO / peripheral pin assignments for the recirculation controller board
//! (ESP32-S3).
//!
//! Single source of truth for documentation and logging. The binary
//! takes the matching typed pins from `Peripherals`; keep both in sync.

// ---------------------------------------------------------------------------
// Pump relay
// ---------------------------------------------------------------------------

/// Digital output: HIGH energises the pump relay coil (via transistor).
pub const PUMP_RELAY_GPIO: i32 = 10;

// ---------------------------------------------------------------------------
// Temperature probes: NTC thermistors on ADC1
// ---------------------------------------------------------------------------

/// Outlet probe at the water-heater hot outlet. ADC1 channel 3.
pub const OUTLET_NTC_GPIO: i32 = 4;
/// Return probe at the far end of the loop. ADC1 channel 4.
pub const RETURN_NTC_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Front panel
// ---------------------------------------------------------------------------

/// Green LED: pump running.
pub const LED_GREEN_GPIO: i32 = 11;
/// Yellow LED: learning feedback.
pub const LED_YELLOW_GPIO: i32 = 12;

/// Momentary push-button (active-low, internal pull-up).
pub const BUTTON_GPIO: i32 = 16;
