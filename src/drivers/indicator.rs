//! Discrete indicator LED (active high).

use embedded_hal::digital::OutputPin;
use log::debug;

pub struct IndicatorLed<P: OutputPin> {
    pin: P,
    lit: Option<bool>,
}

impl<P: OutputPin> IndicatorLed<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, lit: None }
    }

    pub fn set(&mut self, on: bool) {
        if self.lit == Some(on) {
            return;
        }
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.lit = Some(on),
            // Cosmetic only.
            Err(e) => debug!("Indicator write failed ({:?})", e),
        }
    }

    pub fn is_lit(&self) -> bool {
        self.lit == Some(true)
    }
}
