//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ HotWaterController (domain)
//! ```
//!
//! Driven adapters (sensors, relay and indicators, clock, event sinks,
//! storage) implement these traits. The
//! [`HotWaterController`](super::service::HotWaterController) consumes them
//! via generics, so the domain core never touches hardware directly.
//!
//! ## Contract notes
//!
//! - **SensorPort** reports unusable readings as `None`, never NaN.
//! - **ActuatorPort** calls are idempotent and infallible from the
//!   domain's point of view; pin errors are the adapter's to log.
//! - **ConfigPort** implementations MUST validate before persisting.

use crate::clock::{Millis, WallClock};
use crate::config::ControllerConfig;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One reading of every input, taken at the start of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    /// Outlet (tank top) temperature, °C.
    pub outlet_c: Option<f32>,
    /// Return (end of loop) temperature, °C.
    pub return_c: Option<f32>,
    /// Button level; `None` when no button is bound.
    pub button_pressed: Option<bool>,
}

/// Read-side port: the domain calls this to obtain sensor data.
pub trait SensorPort {
    /// Read every input and return a unified snapshot.
    fn read_all(&mut self) -> SensorSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Front-panel indicator LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Pump running.
    Green,
    /// Learning feedback.
    Yellow,
}

/// Write-side port: the domain calls this to command actuators.
pub trait ActuatorPort {
    /// Whether a pump relay is bound at all.
    fn has_pump(&self) -> bool {
        true
    }

    /// Energise the pump relay.
    fn pump_on(&mut self);

    /// De-energise the pump relay.
    fn pump_off(&mut self);

    /// Drive an indicator LED. Unbound indicators are ignored.
    fn set_indicator(&mut self, led: Indicator, on: bool);

    /// Blocking delay, used only for the learning-reset flash sequence.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic uptime plus an optional synchronised wall clock.
pub trait ClockPort {
    /// Milliseconds since boot. Never goes backwards.
    fn uptime_ms(&self) -> Millis;

    /// Local wall-clock time, or `None` until the clock is synchronised.
    fn wall_clock(&self) -> Option<WallClock>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped, so a bad settings write cannot raise the pump's
/// safety ceiling or disable the hot-return check.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ControllerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent namespaced blob storage.
///
/// Write operations MUST be atomic, with no partial writes on power loss.
/// The ESP-IDF NVS API guarantees this natively; the in-memory simulation
/// achieves it trivially.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// The caller's buffer is smaller than the stored value.
    BufferTooSmall { needed: usize },
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::BufferTooSmall { needed } => write!(f, "buffer too small ({} bytes needed)", needed),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
