//! Water-draw detector.
//!
//! The outlet sensor sits on a short pipe stub above the tank. While no tap
//! is open the stub cools; when a tap opens, stratified hot water from the
//! tank top reaches the sensor and its reading climbs at roughly
//! 0.015–0.04 °C/s. A draw is confirmed once that climb has lasted
//! `min_draw_duration_ms` and accumulated `temp_rise_threshold_c`.
//!
//! ```text
//!            rate ≥ 0.010 && Δ > 0.03
//!   Idle ───────────────────────────────▶ Tracking { start, start_temp }
//!    ▲                                        │ elapsed ≥ min && rise ≥ thr
//!    │ rate ≤ -0.01 / rise < 0 / 30 s         ▼
//!    └──────────────────────────────────── Confirmed ──(rate < -0.01)──▶ Idle
//! ```
//!
//! Sensor resolution is about 0.0625 °C, so the 0.03 °C delta floor rejects
//! single-LSB jitter.

use log::{debug, info, trace, warn};

use crate::clock::Millis;
use crate::config::ControllerConfig;

/// Minimum spacing between two evaluated samples.
pub const SAMPLE_INTERVAL_MS: u64 = 1_000;
/// Rise rate (°C/s) that opens a candidate episode.
pub const START_RATE_C_PER_S: f32 = 0.010;
/// Per-sample delta (°C) that must be exceeded to open a candidate.
pub const START_DELTA_C: f32 = 0.03;
/// Falling rate (°C/s) that ends an episode.
pub const FALL_RATE_C_PER_S: f32 = -0.01;
/// Unconfirmed candidates are dropped after this long.
pub const STALL_TIMEOUT_MS: u64 = 30_000;

/// A confirmed water draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawConfirmed {
    /// Outlet rise since the episode started (°C).
    pub rise_c: f32,
    /// Episode length at confirmation (ms).
    pub duration_ms: u64,
}

impl DrawConfirmed {
    /// Average rise rate over the episode (°C/s).
    pub fn avg_rate(&self) -> f32 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        self.rise_c / (self.duration_ms as f32 / 1000.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    temp_c: f32,
    at: Millis,
}

#[derive(Debug, Clone, Copy)]
struct Episode {
    started: Millis,
    start_temp_c: f32,
    confirmed: bool,
}

/// Rising-edge detector over the outlet temperature.
#[derive(Debug, Default)]
pub struct DrawDetector {
    last: Option<Sample>,
    episode: Option<Episode>,
}

impl DrawDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any candidate episode. The last sample is kept so tracking
    /// resumes on the next evaluation without a fresh warm-up.
    pub fn reset(&mut self) {
        self.episode = None;
    }

    /// Forget everything, including the last sample.
    pub fn clear(&mut self) {
        self.last = None;
        self.episode = None;
    }

    /// Whether a candidate (confirmed or not) is being tracked.
    pub fn is_tracking(&self) -> bool {
        self.episode.is_some()
    }

    /// Feed one outlet reading. Returns `Some` exactly once per episode, on
    /// the sample that confirms it.
    pub fn observe(
        &mut self,
        outlet_c: Option<f32>,
        now: Millis,
        cfg: &ControllerConfig,
    ) -> Option<DrawConfirmed> {
        let Some(t_now) = outlet_c.filter(|t| t.is_finite()) else {
            if self.last.is_some() {
                warn!("Outlet temperature invalid, draw tracking reset");
            }
            self.clear();
            return None;
        };

        let Some(last) = self.last else {
            debug!("Outlet tracking initialised at {:.2}°C", t_now);
            self.last = Some(Sample { temp_c: t_now, at: now });
            self.episode = None;
            return None;
        };

        let elapsed_ms = match now.checked_since(last.at) {
            Some(ms) if ms >= SAMPLE_INTERVAL_MS => ms,
            Some(_) => return None,
            None => {
                // Uptime went backwards; restart from this sample.
                self.last = Some(Sample { temp_c: t_now, at: now });
                self.episode = None;
                return None;
            }
        };

        let delta = t_now - last.temp_c;
        let rate = delta / (elapsed_ms as f32 / 1000.0);
        trace!(
            "Outlet {:.2}°C delta={:.3} rate={:.3}°C/s",
            t_now, delta, rate
        );

        let confirmed = if rate >= START_RATE_C_PER_S && delta > START_DELTA_C {
            self.on_rising(t_now, delta, rate, now, cfg)
        } else {
            self.on_flat_or_falling(t_now, rate, now);
            None
        };

        self.last = Some(Sample { temp_c: t_now, at: now });
        confirmed
    }

    fn on_rising(
        &mut self,
        t_now: f32,
        delta: f32,
        rate: f32,
        now: Millis,
        cfg: &ControllerConfig,
    ) -> Option<DrawConfirmed> {
        let ep = self.episode.get_or_insert_with(|| {
            info!(
                "Potential water draw started (T={:.2}°C, delta={:.3}°C, rate={:.3}°C/s)",
                t_now, delta, rate
            );
            Episode {
                started: now,
                start_temp_c: t_now,
                confirmed: false,
            }
        });

        let rise_c = t_now - ep.start_temp_c;
        let duration_ms = now.saturating_since(ep.started);

        if ep.confirmed {
            return None;
        }

        if duration_ms >= u64::from(cfg.min_draw_duration_ms) {
            if rise_c >= cfg.temp_rise_threshold_c {
                ep.confirmed = true;
                let draw = DrawConfirmed { rise_c, duration_ms };
                info!(
                    "Water draw confirmed: duration={:.1}s rise={:.2}°C avg={:.3}°C/s",
                    duration_ms as f32 / 1000.0,
                    rise_c,
                    draw.avg_rate()
                );
                return Some(draw);
            }
            debug!(
                "Draw duration reached but rise {:.2}°C < {:.2}°C",
                rise_c, cfg.temp_rise_threshold_c
            );
        }

        if duration_ms > STALL_TIMEOUT_MS {
            debug!("Slow rise never reached threshold after {}ms, dropping", duration_ms);
            self.episode = None;
        }
        None
    }

    fn on_flat_or_falling(&mut self, t_now: f32, rate: f32, now: Millis) {
        let Some(ep) = self.episode else {
            return;
        };

        if ep.confirmed {
            if rate < FALL_RATE_C_PER_S {
                debug!("Water draw ended (rate={:.3}°C/s)", rate);
                self.episode = None;
            }
            return;
        }

        let rise_c = t_now - ep.start_temp_c;
        let duration_ms = now.saturating_since(ep.started);
        if rate <= FALL_RATE_C_PER_S || rise_c < 0.0 || duration_ms > STALL_TIMEOUT_MS {
            debug!(
                "Draw candidate dropped (rate={:.3}°C/s rise={:.2}°C after {}ms)",
                rate, rise_c, duration_ms
            );
            self.episode = None;
        }
    }
}
