//! Heat delivered into the recirculation loop
//!
//! Power is estimated from the pump's nominal flow and the outlet/return
//! temperature difference, then integrated over the real interval between
//! samples.

use crate::clock::Millis;

/// Volumetric heat capacity of water, J/(L·°C).
pub const WATER_HEAT_CAPACITY: f32 = 4186.0;

/// Shorter sample intervals are skipped.
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 50;

/// Integrating energy meter for one pump run
#[derive(Debug, Clone, Copy)]
pub struct EnergyMeter {
    wh: f32,
    samples: u32,
    last: Millis,
}

impl EnergyMeter {
    /// Start a new accumulation at `now`.
    pub fn new(now: Millis) -> Self {
        Self {
            wh: 0.0,
            samples: 0,
            last: now,
        }
    }

    /// Instantaneous power (W) for a flow (L/min) and temperature difference.
    pub fn power_w(flow_lpm: f32, delta_t: f32) -> f32 {
        (flow_lpm / 60.0) * delta_t * WATER_HEAT_CAPACITY
    }

    /// Add one sample. Both readings must be valid; only a positive
    /// outlet-over-return difference contributes. Returns the Wh added.
    pub fn sample(&mut self, outlet_c: f32, return_c: f32, flow_lpm: f32, now: Millis) -> f32 {
        let dt_ms = now.saturating_since(self.last);
        if dt_ms < MIN_SAMPLE_INTERVAL_MS {
            return 0.0;
        }
        self.last = now;

        let delta_t = outlet_c - return_c;
        if delta_t <= 0.0 {
            return 0.0;
        }
        let dt_h = dt_ms as f32 / 3_600_000.0;
        let wh = Self::power_w(flow_lpm, delta_t) * dt_h;
        self.wh += wh;
        self.samples += 1;
        wh
    }

    pub fn wh(&self) -> f32 {
        self.wh
    }

    pub fn kwh(&self) -> f32 {
        self.wh / 1000.0
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }
}
