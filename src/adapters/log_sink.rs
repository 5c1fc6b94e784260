//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! Status snapshots are rendered as a single JSON line so they can be
//! scraped from the serial console.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::clock::WEEKDAY_NAMES;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                learning_from_storage,
            } => {
                info!(
                    "START | learning={}",
                    if *learning_from_storage { "stored" } else { "seed" }
                );
            }
            AppEvent::PumpStarted {
                trigger,
                baseline_return_c,
            } => {
                info!(
                    "PUMP | on | trigger={} | baseline_return={:.2}\u{00b0}C",
                    trigger, baseline_return_c
                );
            }
            AppEvent::PumpStopped(s) => {
                info!(
                    "PUMP | off | trigger={} | reason={} | {}s | {:.4}kWh ({} samples){}",
                    s.trigger,
                    s.reason,
                    s.duration_secs,
                    s.energy_kwh,
                    s.samples,
                    if s.disinfection { " | disinfection" } else { "" },
                );
            }
            AppEvent::StartRejected { trigger, reason } => {
                info!("PUMP | rejected | trigger={} | {}", trigger, reason);
            }
            AppEvent::DrawConfirmed(d) => {
                info!(
                    "DRAW | confirmed | rise={:.2}\u{00b0}C | {:.1}s | avg={:.3}\u{00b0}C/s",
                    d.rise_c,
                    d.duration_ms as f32 / 1000.0,
                    d.avg_rate()
                );
            }
            AppEvent::VacationEntered { hours_since_draw } => {
                warn!("VACATION | entered | {}h since last draw", hours_since_draw);
            }
            AppEvent::VacationExited => {
                warn!("VACATION | exited");
            }
            AppEvent::DisinfectionDetected { elevation_c } => {
                info!("DISINFECT | detected | elevation={:.1}\u{00b0}C", elevation_c);
            }
            AppEvent::AntiStagnationRun { mark } => {
                warn!(
                    "ANTISTAG | run | {} slot={}",
                    day_name(mark.weekday),
                    mark.slot
                );
            }
            AppEvent::ScheduledPreheat { mark, weight } => {
                info!(
                    "SCHED | preheat | {} slot={} | weight={}",
                    day_name(mark.weekday),
                    mark.slot,
                    weight
                );
            }
            AppEvent::LearningReinforced {
                weekday,
                slot,
                weight,
            } => {
                info!(
                    "LEARN | reinforced | {} slot={} | weight={}",
                    day_name(*weekday),
                    slot,
                    weight
                );
            }
            AppEvent::LearningDecayed => info!("LEARN | decayed"),
            AppEvent::LearningReset => warn!("LEARN | reset to seed pattern"),
            AppEvent::LearningToggled(on) => {
                info!("LEARN | {}", if *on { "enabled" } else { "disabled" });
            }
            AppEvent::PumpEnableChanged(on) => {
                info!("PUMP | automatic {}", if *on { "enabled" } else { "disabled" });
            }
            AppEvent::Status(report) => match serde_json::to_string(report) {
                Ok(json) => info!("STATUS | {}", json),
                Err(e) => warn!("STATUS | serialisation failed: {}", e),
            },
        }
    }
}

fn day_name(weekday: usize) -> &'static str {
    WEEKDAY_NAMES.get(weekday).copied().unwrap_or("???")
}
