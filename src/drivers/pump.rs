//! Recirculation pump relay driver.
//!
//! A single digital output switches the pump relay. The driver remembers
//! the level it last wrote so repeated `on()`/`off()` calls from the
//! control loop do not hammer the GPIO.
//!
//! Pin errors are logged and swallowed: a relay that cannot be switched
//! off is a wiring fault the firmware cannot fix, and the controller's
//! run-time ceiling keeps issuing `off()` every cycle regardless.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct PumpRelay<P: OutputPin> {
    pin: P,
    /// Level last written; `None` until the first write.
    on: Option<bool>,
}

impl<P: OutputPin> PumpRelay<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, on: None }
    }

    pub fn on(&mut self) {
        self.set(true);
    }

    pub fn off(&mut self) {
        self.set(false);
    }

    pub fn is_on(&self) -> bool {
        self.on == Some(true)
    }

    fn set(&mut self, on: bool) {
        if self.on == Some(on) {
            return;
        }
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.on = Some(on),
            Err(e) => warn!("Pump relay write failed ({:?})", e),
        }
    }
}
