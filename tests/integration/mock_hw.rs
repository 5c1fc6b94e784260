//! Mock adapters for integration tests.
//!
//! `MockHardware` records every actuator call so tests can assert on the
//! full command history without touching real GPIO. `MockClock` is driven
//! by hand; `RecordingSink` keeps every emitted event.

use std::cell::Cell;

use hotcirc::adapters::nvs::NvsAdapter;
use hotcirc::app::events::AppEvent;
use hotcirc::app::ports::{
    ActuatorPort, ClockPort, EventSink, Indicator, SensorPort, SensorSnapshot,
};
use hotcirc::clock::{EpochSecs, Millis, WallClock};
use hotcirc::{ControllerConfig, HotWaterController};

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    PumpOn,
    PumpOff,
    Indicator(Indicator, bool),
    Delay(u32),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
    pub outlet_c: Option<f32>,
    pub return_c: Option<f32>,
    pub button: Option<bool>,
    pub pump_bound: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            outlet_c: Some(45.0),
            return_c: Some(22.0),
            button: Some(false),
            pump_bound: true,
        }
    }

    pub fn pump_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::PumpOn => Some(true),
                ActuatorCall::PumpOff => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn indicator(&self, led: Indicator) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::Indicator(l, on) if *l == led => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn count(&self, call: ActuatorCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn read_all(&mut self) -> SensorSnapshot {
        SensorSnapshot {
            outlet_c: self.outlet_c,
            return_c: self.return_c,
            button_pressed: self.button,
        }
    }
}

impl ActuatorPort for MockHardware {
    fn has_pump(&self) -> bool {
        self.pump_bound
    }

    fn pump_on(&mut self) {
        self.calls.push(ActuatorCall::PumpOn);
    }

    fn pump_off(&mut self) {
        self.calls.push(ActuatorCall::PumpOff);
    }

    fn set_indicator(&mut self, led: Indicator, on: bool) {
        self.calls.push(ActuatorCall::Indicator(led, on));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ActuatorCall::Delay(ms));
    }
}

// ── MockClock ─────────────────────────────────────────────────

/// Sunday 2024-01-07 00:00:00 UTC.
pub const SUNDAY_MIDNIGHT: u64 = 1_704_585_600;
/// Monday 2024-01-08 00:00:00 UTC.
pub const MONDAY_MIDNIGHT: u64 = 1_704_672_000;

pub struct MockClock {
    uptime: Cell<u64>,
    /// `None` = wall clock not synchronised.
    epoch: Cell<Option<u64>>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn unsynced() -> Self {
        Self {
            uptime: Cell::new(0),
            epoch: Cell::new(None),
        }
    }

    pub fn at(epoch: u64) -> Self {
        Self {
            uptime: Cell::new(0),
            epoch: Cell::new(Some(epoch)),
        }
    }

    /// Move both time bases forward.
    pub fn advance_ms(&self, ms: u64) {
        self.uptime.set(self.uptime.get() + ms);
        if let Some(e) = self.epoch.get() {
            // Wall clock advances in whole seconds relative to uptime.
            let before = (self.uptime.get() - ms) / 1000;
            let after = self.uptime.get() / 1000;
            self.epoch.set(Some(e + (after - before)));
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs * 1000);
    }

    /// Jump the wall clock without moving uptime (SNTP step).
    pub fn set_epoch(&self, epoch: Option<u64>) {
        self.epoch.set(epoch);
    }

    pub fn epoch(&self) -> Option<u64> {
        self.epoch.get()
    }
}

impl ClockPort for MockClock {
    fn uptime_ms(&self) -> Millis {
        Millis(self.uptime.get())
    }

    fn wall_clock(&self) -> Option<WallClock> {
        self.epoch.get().map(wall_clock_utc)
    }
}

/// Break a Unix timestamp down as UTC, following the `tm` conventions the
/// device clock reports (1 = Sunday, day-of-year from 1).
pub fn wall_clock_utc(epoch: u64) -> WallClock {
    let days = epoch / 86_400;
    let secs_of_day = epoch % 86_400;

    // 1970-01-01 was a Thursday (tm_wday 4).
    let weekday = ((days + 4) % 7) as u8 + 1;

    let mut year = 1970u64;
    let mut remaining = days;
    loop {
        let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
        let len = if leap { 366 } else { 365 };
        if remaining < len {
            break;
        }
        remaining -= len;
        year += 1;
    }

    WallClock {
        epoch: EpochSecs(epoch),
        weekday,
        day_of_year: remaining as u16 + 1,
        hour: (secs_of_day / 3_600) as u8,
        minute: ((secs_of_day % 3_600) / 60) as u8,
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig: controller wired to all mocks ────────────────────────

pub struct Rig {
    pub app: HotWaterController,
    pub hw: MockHardware,
    pub clock: MockClock,
    pub nvs: NvsAdapter,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(clock: MockClock) -> Self {
        Self::with_store(clock, NvsAdapter::new().expect("host NVS"))
    }

    /// Boot a controller against an existing store.
    pub fn with_store(clock: MockClock, nvs: NvsAdapter) -> Self {
        let mut app = HotWaterController::new(ControllerConfig::default());
        let mut hw = MockHardware::new();
        let mut sink = RecordingSink::new();
        app.start(&nvs, &mut hw, &mut sink);
        Self {
            app,
            hw,
            clock,
            nvs,
            sink,
        }
    }

    /// Run one tick at the current time.
    pub fn tick(&mut self) {
        self.app
            .tick(&mut self.hw, &self.clock, &mut self.nvs, &mut self.sink);
    }

    /// Advance one second, then tick.
    pub fn step(&mut self) {
        self.clock.advance_secs(1);
        self.tick();
    }

    pub fn run(&mut self, secs: u32) {
        for _ in 0..secs {
            self.step();
        }
    }

    /// Raise the outlet by `rate` °C every second for `secs` ticks.
    pub fn ramp_outlet(&mut self, rate: f32, secs: u32) {
        for _ in 0..secs {
            self.hw.outlet_c = self.hw.outlet_c.map(|t| t + rate);
            self.step();
        }
    }

    pub fn manual_on(&mut self) {
        self.app
            .manual_pump_on(&mut self.hw, &self.clock, &mut self.sink);
    }

    pub fn manual_off(&mut self) {
        self.app
            .manual_pump_off(&mut self.hw, &self.clock, &mut self.sink);
    }

    /// Hold the button for `secs` ticks, then release on the next tick.
    pub fn press_button(&mut self, secs: u32) {
        self.hw.button = Some(true);
        self.run(secs);
        self.hw.button = Some(false);
        self.step();
    }
}
