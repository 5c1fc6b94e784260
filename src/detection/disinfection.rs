//! Boiler disinfection-cycle detector.
//!
//! A legionella cycle lifts the tank roughly 10 °C above its normal set
//! point. The detector compares the idle outlet reading against a slow
//! baseline and reports an elevation once per cooldown period.
//!
//! The baseline is sampled at pump stop, when fresh tank water sits at the
//! sensor and the pipe stub has not yet cooled. Idle readings would drag
//! it down.

use log::{debug, info};

use crate::clock::EpochSecs;
use crate::config::ControllerConfig;

/// Weight of the previous baseline in the exponential update.
const BASELINE_KEEP: f32 = 0.9;

#[derive(Debug, Default)]
pub struct DisinfectionDetector {
    baseline_c: Option<f32>,
    last_detection: Option<EpochSecs>,
}

impl DisinfectionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Option<f32> {
        self.baseline_c
    }

    pub fn last_detection(&self) -> Option<EpochSecs> {
        self.last_detection
    }

    /// Check an idle outlet reading. Returns the elevation above baseline
    /// when a new disinfection cycle is detected. The caller must only
    /// invoke this while the pump is idle.
    pub fn check(
        &mut self,
        outlet_c: Option<f32>,
        now: EpochSecs,
        cfg: &ControllerConfig,
    ) -> Option<f32> {
        let t_now = outlet_c?;
        let baseline = self.baseline_c?;
        let elevation = t_now - baseline;
        if elevation < cfg.disinfection_temp_threshold_c {
            return None;
        }

        if let Some(last) = self.last_detection {
            let since = now.saturating_since(last);
            if since < u64::from(cfg.disinfection_cooldown_secs) {
                debug!(
                    "High outlet {:.1}°C ignored, {}s since last disinfection (need {})",
                    t_now, since, cfg.disinfection_cooldown_secs
                );
                return None;
            }
        }

        info!(
            "Disinfection cycle detected: outlet={:.1}°C baseline={:.1}°C elevation={:.1}°C",
            t_now, baseline, elevation
        );
        self.last_detection = Some(now);
        Some(elevation)
    }

    /// Fold a post-run outlet reading into the baseline (0.9 old / 0.1 new),
    /// or initialise it on first use.
    pub fn update_baseline(&mut self, outlet_c: f32) {
        match self.baseline_c {
            None => {
                info!("Disinfection baseline initialised at {:.1}°C", outlet_c);
                self.baseline_c = Some(outlet_c);
            }
            Some(old) => {
                let new = old * BASELINE_KEEP + outlet_c * (1.0 - BASELINE_KEEP);
                info!(
                    "Disinfection baseline {:.1}°C -> {:.1}°C (reading {:.1}°C)",
                    old, new, outlet_c
                );
                self.baseline_c = Some(new);
            }
        }
    }
}
