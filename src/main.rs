//! hotcirc firmware entry point.
//!
//! Hexagonal architecture driven by a fixed-rate control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter   Esp32Time       │
//! │  (Sensor+Actuator) (EventSink)    (Config+NVS) (ClockPort)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          HotWaterController (pure logic)               │    │
//! │  │  draw · learning · schedule · vacation · pump SM       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wi-Fi credentials and the POSIX time zone are taken from the build
//! environment (`HOTCIRC_WIFI_SSID`, `HOTCIRC_WIFI_PASS`, `HOTCIRC_TZ`).
//! Without Wi-Fi the wall clock never syncs and the controller runs on
//! draw detection alone.
#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::adc::attenuation::DB_11;
use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::adc::ADCPin;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{IOPin as _, OutputPin as _, PinDriver, Pull};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use hotcirc::adapters::hardware::HardwareAdapter;
use hotcirc::adapters::log_sink::LogEventSink;
use hotcirc::adapters::nvs::NvsAdapter;
use hotcirc::adapters::time::Esp32TimeAdapter;
use hotcirc::app::ports::ConfigPort;
use hotcirc::sensors::temperature::{NtcThermistor, RawAdc};
use hotcirc::sensors::{SensorHub, TemperatureProbe};
use hotcirc::{ControllerConfig, HotWaterController, pins};

/// Ticks between two status reports (one minute at the default 1 Hz).
const STATUS_EVERY_TICKS: u64 = 60;

// ── ADC glue ──────────────────────────────────────────────────

/// Oneshot ADC channel exposed as raw counts.
struct OneshotAdc<'d, T: ADCPin>(AdcChannelDriver<'d, T, &'d AdcDriver<'d, T::Adc>>);

impl<T: ADCPin> RawAdc for OneshotAdc<'_, T> {
    type Error = EspError;

    fn read_raw(&mut self) -> Result<u16, EspError> {
        self.0.read_raw()
    }
}

// ── Network time ──────────────────────────────────────────────

fn connect_wifi(wifi: &mut BlockingWifi<EspWifi<'static>>, ssid: &str, pass: &str) -> Result<()> {
    let config = Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("SSID too long"))?,
        password: pass.try_into().map_err(|_| anyhow!("password too long"))?,
        auth_method: if pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    });
    wifi.set_configuration(&config)?;
    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  hotcirc v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    if let Some(tz) = option_env!("HOTCIRC_TZ") {
        // SAFETY: single-threaded at this point; no other task reads the environment.
        unsafe {
            std::env::set_var("TZ", tz);
            esp_idf_svc::sys::tzset();
        }
        info!("Time zone: {}", tz);
    }

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            ControllerConfig::default()
        }
    };

    // ── 3. Wi-Fi + SNTP (optional) ────────────────────────────
    let _wifi;
    let _sntp;
    if let Some(ssid) = option_env!("HOTCIRC_WIFI_SSID") {
        let mut wifi = BlockingWifi::wrap(
            EspWifi::new(
                peripherals.modem,
                sysloop.clone(),
                Some(EspDefaultNvsPartition::take()?),
            )?,
            sysloop,
        )?;
        match connect_wifi(&mut wifi, ssid, option_env!("HOTCIRC_WIFI_PASS").unwrap_or("")) {
            Ok(()) => {
                info!("Wi-Fi connected to '{}'", ssid);
                _sntp = Some(EspSntp::new_default()?);
            }
            Err(e) => {
                warn!("Wi-Fi connect failed ({}), wall clock will stay invalid", e);
                _sntp = None;
            }
        }
        _wifi = Some(wifi);
    } else {
        warn!("No Wi-Fi credentials built in, learning and schedules stay idle");
        _wifi = None;
        _sntp = None;
    }

    // ── 4. Construct adapters ─────────────────────────────────
    let adc = AdcDriver::new(peripherals.adc1)?;
    let adc_config = AdcChannelConfig {
        attenuation: DB_11,
        ..Default::default()
    };
    let outlet: Box<dyn TemperatureProbe + '_> = Box::new(NtcThermistor::new(
        OneshotAdc(AdcChannelDriver::new(&adc, peripherals.pins.gpio4, &adc_config)?),
        "outlet",
    ));
    let ret: Box<dyn TemperatureProbe + '_> = Box::new(NtcThermistor::new(
        OneshotAdc(AdcChannelDriver::new(&adc, peripherals.pins.gpio5, &adc_config)?),
        "return",
    ));

    let mut button = PinDriver::input(peripherals.pins.gpio16.downgrade())?;
    button.set_pull(Pull::Up)?;

    let mut hw = HardwareAdapter::new(SensorHub::new(outlet, ret), FreeRtos)
        .with_pump(PinDriver::output(peripherals.pins.gpio10.downgrade_output())?)
        .with_indicators(
            Some(PinDriver::output(peripherals.pins.gpio11.downgrade_output())?),
            Some(PinDriver::output(peripherals.pins.gpio12.downgrade_output())?),
        )
        .with_button(button);
    info!(
        "Pins: relay={} outlet={} return={} green={} yellow={} button={}",
        pins::PUMP_RELAY_GPIO,
        pins::OUTLET_NTC_GPIO,
        pins::RETURN_NTC_GPIO,
        pins::LED_GREEN_GPIO,
        pins::LED_YELLOW_GPIO,
        pins::BUTTON_GPIO,
    );

    let clock = Esp32TimeAdapter::new();
    let mut log_sink = LogEventSink::new();

    // ── 5. Construct controller ───────────────────────────────
    let interval_ms = config.control_loop_interval_ms;
    let mut app = HotWaterController::new(config);
    app.start(&nvs, &mut hw, &mut log_sink);

    info!("System ready. Entering control loop ({} ms).", interval_ms);

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        app.tick(&mut hw, &clock, &mut nvs, &mut log_sink);

        // Config auto-save (5 s debounce after last change).
        app.auto_save_if_needed(&nvs);

        if app.tick_count() % STATUS_EVERY_TICKS == 0 {
            app.emit_status(&clock, &mut log_sink);
        }

        FreeRtos::delay_ms(interval_ms);
    }
}
