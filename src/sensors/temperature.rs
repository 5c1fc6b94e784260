//! NTC thermistor probe (10 kOhm @ 25 C, B = 3950).
//!
//! Wired as the low side of a voltage divider under a fixed 10 kOhm
//! resistor and read through a 12-bit ADC. The simplified Beta (Steinhart-Hart) equation
//! converts resistance to temperature.
//!
//! The ADC itself sits behind [`RawAdc`] so the conversion can be exercised
//! on the host and the ESP-IDF oneshot driver plugs in from `main`.

use log::debug;

use super::TemperatureProbe;

/// Source of raw 12-bit ADC counts.
pub trait RawAdc {
    type Error: core::fmt::Debug;

    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

/// Divider and thermistor constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NtcParams {
    pub r25_ohms: f32,
    pub beta: f32,
    pub divider_ohms: f32,
    pub adc_max: f32,
    pub v_ref: f32,
}

impl Default for NtcParams {
    fn default() -> Self {
        Self {
            r25_ohms: 10_000.0,
            beta: 3950.0,
            divider_ohms: 10_000.0,
            adc_max: 4095.0,
            v_ref: 3.3,
        }
    }
}

const T25_K: f32 = 298.15;

pub struct NtcThermistor<A: RawAdc> {
    adc: A,
    params: NtcParams,
    label: &'static str,
}

impl<A: RawAdc> NtcThermistor<A> {
    pub fn new(adc: A, label: &'static str) -> Self {
        Self::with_params(adc, label, NtcParams::default())
    }

    pub fn with_params(adc: A, label: &'static str, params: NtcParams) -> Self {
        Self { adc, params, label }
    }

    /// Convert raw counts to °C. Rails (open or shorted probe) give `None`.
    pub fn counts_to_celsius(params: &NtcParams, raw: u16) -> Option<f32> {
        let voltage = (f32::from(raw) / params.adc_max) * params.v_ref;
        if voltage <= 0.01 || voltage >= params.v_ref - 0.01 {
            return None;
        }
        let r_ntc = params.divider_ohms * voltage / (params.v_ref - voltage);
        let inv_t = (1.0 / T25_K) + (1.0 / params.beta) * (r_ntc / params.r25_ohms).ln();
        if inv_t <= 0.0 {
            return None;
        }
        Some((1.0 / inv_t) - 273.15)
    }
}

impl<A: RawAdc> TemperatureProbe for NtcThermistor<A> {
    fn read_celsius(&mut self) -> Option<f32> {
        match self.adc.read_raw() {
            Ok(raw) => Self::counts_to_celsius(&self.params, raw),
            Err(e) => {
                debug!("{} probe ADC read failed: {:?}", self.label, e);
                None
            }
        }
    }
}
