//! Hardware adapter. Bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`], the optional pump relay, indicator LEDs and
//! front-panel button, and exposes them through [`SensorPort`] and
//! [`ActuatorPort`]. Everything is generic over `embedded-hal` traits, so
//! the same adapter drives ESP-IDF `PinDriver`s on the device and plain
//! mock pins on the host.
//!
//! Any output may be left unbound. A missing relay makes
//! [`ActuatorPort::has_pump`] report `false`, which the controller treats
//! as a rejected start.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::debug;

use crate::app::ports::{ActuatorPort, Indicator, SensorPort, SensorSnapshot};
use crate::drivers::indicator::IndicatorLed;
use crate::drivers::pump::PumpRelay;
use crate::sensors::{SensorHub, TemperatureProbe};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<O, I, T, D>
where
    O: OutputPin,
    I: InputPin,
    T: TemperatureProbe,
    D: DelayNs,
{
    sensors: SensorHub<T>,
    pump: Option<PumpRelay<O>>,
    green: Option<IndicatorLed<O>>,
    yellow: Option<IndicatorLed<O>>,
    /// Active-low push button.
    button: Option<I>,
    delay: D,
}

impl<O, I, T, D> HardwareAdapter<O, I, T, D>
where
    O: OutputPin,
    I: InputPin,
    T: TemperatureProbe,
    D: DelayNs,
{
    /// Adapter with sensors only; outputs are attached with the `with_*` builders.
    pub fn new(sensors: SensorHub<T>, delay: D) -> Self {
        Self {
            sensors,
            pump: None,
            green: None,
            yellow: None,
            button: None,
            delay,
        }
    }

    pub fn with_pump(mut self, pin: O) -> Self {
        self.pump = Some(PumpRelay::new(pin));
        self
    }

    pub fn with_indicators(mut self, green: Option<O>, yellow: Option<O>) -> Self {
        self.green = green.map(IndicatorLed::new);
        self.yellow = yellow.map(IndicatorLed::new);
        self
    }

    pub fn with_button(mut self, pin: I) -> Self {
        self.button = Some(pin);
        self
    }

    pub fn pump_is_on(&self) -> bool {
        self.pump.as_ref().is_some_and(PumpRelay::is_on)
    }

    fn read_button(&mut self) -> Option<bool> {
        let pin = self.button.as_mut()?;
        match pin.is_low() {
            Ok(pressed) => Some(pressed),
            Err(e) => {
                debug!("Button read failed ({:?})", e);
                None
            }
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<O, I, T, D> SensorPort for HardwareAdapter<O, I, T, D>
where
    O: OutputPin,
    I: InputPin,
    T: TemperatureProbe,
    D: DelayNs,
{
    fn read_all(&mut self) -> SensorSnapshot {
        let (outlet_c, return_c) = self.sensors.read();
        SensorSnapshot {
            outlet_c,
            return_c,
            button_pressed: self.read_button(),
        }
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<O, I, T, D> ActuatorPort for HardwareAdapter<O, I, T, D>
where
    O: OutputPin,
    I: InputPin,
    T: TemperatureProbe,
    D: DelayNs,
{
    fn has_pump(&self) -> bool {
        self.pump.is_some()
    }

    fn pump_on(&mut self) {
        if let Some(relay) = self.pump.as_mut() {
            relay.on();
        }
    }

    fn pump_off(&mut self) {
        if let Some(relay) = self.pump.as_mut() {
            relay.off();
        }
    }

    fn set_indicator(&mut self, led: Indicator, on: bool) {
        let slot = match led {
            Indicator::Green => &mut self.green,
            Indicator::Yellow => &mut self.yellow,
        };
        if let Some(led) = slot.as_mut() {
            led.set(on);
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
