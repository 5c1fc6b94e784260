//! Temperature probes and the aggregating [`SensorHub`].
//!
//! Every probe reports `Option<f32>`. Readings outside the plausible
//! range for a domestic hot-water loop are mapped to `None` here so the
//! domain never sees NaN or a disconnected-probe rail value.

pub mod temperature;

/// Lowest plausible probe reading, °C.
pub const MIN_VALID_C: f32 = -40.0;
/// Highest plausible probe reading, °C.
pub const MAX_VALID_C: f32 = 125.0;

/// A single temperature probe.
pub trait TemperatureProbe {
    /// Current reading in °C, or `None` if the probe cannot be read.
    fn read_celsius(&mut self) -> Option<f32>;
}

impl<P: TemperatureProbe + ?Sized> TemperatureProbe for Box<P> {
    fn read_celsius(&mut self) -> Option<f32> {
        (**self).read_celsius()
    }
}

/// Reject NaN and out-of-range readings.
pub fn sanitize(reading: Option<f32>) -> Option<f32> {
    reading.filter(|c| (MIN_VALID_C..=MAX_VALID_C).contains(c))
}

/// Outlet and return probes read together once per tick.
pub struct SensorHub<T: TemperatureProbe> {
    outlet: T,
    ret: T,
}

impl<T: TemperatureProbe> SensorHub<T> {
    pub fn new(outlet: T, ret: T) -> Self {
        Self { outlet, ret }
    }

    /// `(outlet, return)`, both sanitised.
    pub fn read(&mut self) -> (Option<f32>, Option<f32>) {
        (
            sanitize(self.outlet.read_celsius()),
            sanitize(self.ret.read_celsius()),
        )
    }
}
