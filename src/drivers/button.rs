//! Front-panel button gesture classifier.
//!
//! ## Hardware
//!
//! Active-low momentary switch with a pull-up. The level is sampled once
//! per control tick through the sensor port; at a 1 Hz tick the sampling
//! itself debounces the contact.
//!
//! ## Gesture detection (classified on release)
//!
//! | Gesture          | Hold time      | Action                          |
//! |------------------|----------------|---------------------------------|
//! | `TogglePump`     | ≤ 3 s          | stop if running, else start     |
//! | `ToggleLearning` | > 3 s, ≤ 10 s  | learning on/off                 |
//! | `ResetLearning`  | > 10 s         | matrix back to the seed pattern |

use crate::clock::Millis;

const LONG_PRESS_MS: u64 = 3_000;
const VERY_LONG_PRESS_MS: u64 = 10_000;

/// Gestures emitted after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonGesture {
    TogglePump,
    ToggleLearning,
    ResetLearning,
}

impl ButtonGesture {
    /// Classify a completed press by its hold time.
    pub fn from_hold(held_ms: u64) -> Self {
        if held_ms > VERY_LONG_PRESS_MS {
            Self::ResetLearning
        } else if held_ms > LONG_PRESS_MS {
            Self::ToggleLearning
        } else {
            Self::TogglePump
        }
    }
}

#[derive(Debug, Default)]
pub struct PressClassifier {
    pressed_since: Option<Millis>,
}

impl PressClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.pressed_since.is_some()
    }

    /// Feed the current level. Returns a gesture on the release edge.
    pub fn update(&mut self, pressed: bool, now: Millis) -> Option<ButtonGesture> {
        match (pressed, self.pressed_since) {
            (true, None) => {
                self.pressed_since = Some(now);
                None
            }
            (false, Some(since)) => {
                self.pressed_since = None;
                let held = now.saturating_since(since);
                log::debug!("Button released after {}ms", held);
                Some(ButtonGesture::from_hold(held))
            }
            _ => None,
        }
    }
}
