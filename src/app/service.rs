//! Application service: the hexagonal core.
//!
//! [`HotWaterController`] owns every detector, scheduler, the learning
//! matrix and the pump state machine. It exposes a clean,
//! hardware-agnostic API. All I/O flows through port traits injected at
//! call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!   ClockPort ──▶ │      HotWaterController      │
//! ActuatorPort ◀──│ detectors · matrix · pump SM │ ◀─▶ StoragePort
//!                 └──────────────────────────────┘
//! ```
//!
//! ## Tick order
//!
//! 1. read sensors and clock
//! 2. valid clock: prime decay day, vacation check, anti-stagnation window
//! 3. draw detection (reset while pumping or locked out)
//! 4. valid clock and not on vacation: daily decay; if automatic operation
//!    is enabled, disinfection check and learned schedule
//! 5. pump supervision, button, indicators, periodic matrix log

use log::{debug, info, warn};

use crate::clock::{EpochSecs, Millis, WallClock};
use crate::config::ControllerConfig;
use crate::control::pump::StartGate;
use crate::control::{PumpController, PumpTrigger, StartRejected, StopReason};
use crate::detection::{DisinfectionDetector, DrawDetector};
use crate::drivers::button::{ButtonGesture, PressClassifier};
use crate::error::Error;
use crate::learning::{DecayClock, LearningMatrix, RECORD_LEN};
use crate::scheduler::{AntiStagnationScheduler, ScheduleEvaluator, ScheduleMark};
use crate::vacation::VacationMonitor;

use super::commands::AppCommand;
use super::events::{AppEvent, StatusReport};
use super::ports::{
    ActuatorPort, ClockPort, ConfigError, ConfigPort, EventSink, Indicator, SensorPort,
    SensorSnapshot, StorageError, StoragePort,
};

/// NVS namespace holding the learning record.
pub const LEARNING_NAMESPACE: &str = "hotcirc";
/// NVS key of the learning record.
pub const LEARNING_KEY: &str = "learn";

/// Yellow indicator window after a confirmed draw.
const DRAW_INDICATOR_MS: u64 = 5_000;
/// Yellow indicator window after learning is re-enabled.
const LEARNING_ON_INDICATOR_MS: u64 = 2_000;
const MATRIX_LOG_INTERVAL_MS: u64 = 60_000;
const RESET_FLASH_STEPS: u32 = 6;
const RESET_FLASH_STEP_MS: u32 = 200;
const CONFIG_AUTOSAVE_DELAY_SECS: f32 = 5.0;

/// Both time bases, captured once per call.
#[derive(Debug, Clone, Copy)]
struct Now {
    ms: Millis,
    wall: Option<WallClock>,
}

impl Now {
    fn read(clock: &impl ClockPort) -> Self {
        Self {
            ms: clock.uptime_ms(),
            wall: clock.wall_clock(),
        }
    }

    fn epoch(&self) -> Option<EpochSecs> {
        self.wall.map(|w| w.epoch)
    }
}

// ───────────────────────────────────────────────────────────────
// HotWaterController
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct HotWaterController {
    config: ControllerConfig,
    matrix: LearningMatrix,
    decay: DecayClock,
    draw: DrawDetector,
    disinfection: DisinfectionDetector,
    vacation: VacationMonitor,
    anti_stagnation: AntiStagnationScheduler,
    schedule: ScheduleEvaluator,
    pump: PumpController,
    button: PressClassifier,

    /// Master switch for automatic operation.
    pump_enabled: bool,
    learning_enabled: bool,
    /// Yellow indicator stays on until this instant.
    yellow_until: Option<Millis>,
    last_matrix_log: Millis,
    snapshot: SensorSnapshot,

    tick_count: u64,
    config_dirty: bool,
    dirty_since_tick: u64,
}

impl HotWaterController {
    /// Construct the controller from configuration.
    ///
    /// An invalid configuration is replaced by the defaults. The learning
    /// matrix starts from the seed pattern; call [`start`](Self::start) to
    /// load the persisted copy.
    pub fn new(config: ControllerConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!("Rejected configuration ({}), using defaults", e);
                ControllerConfig::default()
            }
        };
        Self {
            config,
            matrix: LearningMatrix::seeded(),
            decay: DecayClock::new(),
            draw: DrawDetector::new(),
            disinfection: DisinfectionDetector::new(),
            vacation: VacationMonitor::new(),
            anti_stagnation: AntiStagnationScheduler::new(),
            schedule: ScheduleEvaluator::new(),
            pump: PumpController::new(),
            button: PressClassifier::new(),
            pump_enabled: true,
            learning_enabled: true,
            yellow_until: None,
            last_matrix_log: Millis(0),
            snapshot: SensorSnapshot::default(),
            tick_count: 0,
            config_dirty: false,
            dirty_since_tick: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the persisted learning matrix and put the outputs in a known state.
    pub fn start(
        &mut self,
        store: &impl StoragePort,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let learning_from_storage = self.load_learning(store);
        hw.pump_off();
        hw.set_indicator(Indicator::Green, false);
        hw.set_indicator(Indicator::Yellow, false);
        if !hw.has_pump() {
            warn!("No pump relay bound, pump requests will be rejected");
        }
        info!(
            "Controller started (dT outlet={:.1}°C, dT return={:.1}°C)",
            self.config.temp_rise_threshold_c, self.config.return_rise_threshold_c
        );
        sink.emit(&AppEvent::Started {
            learning_from_storage,
        });
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`]; this avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        clock: &impl ClockPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let now = Now::read(clock);
        self.snapshot = hw.read_all();

        // 1. Clock-driven monitors
        if let Some(wall) = now.wall {
            self.decay.prime(wall.day_of_year);
            if self.vacation.poll(wall.epoch) {
                let hours_since_draw = self
                    .vacation
                    .last_draw()
                    .map_or(0, |t| wall.epoch.saturating_since(t) / 3_600);
                sink.emit(&AppEvent::VacationEntered { hours_since_draw });
            }
            self.check_anti_stagnation(&wall, now, hw, sink);
        }

        // 2. Draw detection runs in every mode; it is how vacation ends.
        self.detect_water_draw(now, hw, sink);

        // 3. Learning upkeep and automatic triggers
        if let Some(wall) = now.wall {
            if !self.vacation.is_active() {
                self.decay_if_due(&wall, store, sink);
                if self.pump_enabled {
                    self.check_disinfection(&wall, now, hw, sink);
                    self.check_schedule(&wall, now, hw, sink);
                }
            }
        }

        // 4. Outputs
        self.pump_control(now, hw, sink);
        self.handle_button(now, hw, store, sink);
        self.update_indicators(now, hw);

        if now.ms.saturating_since(self.last_matrix_log) >= MATRIX_LOG_INTERVAL_MS {
            self.log_learning_matrix();
            self.last_matrix_log = now.ms;
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process a settings-surface command.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut impl ActuatorPort,
        clock: &impl ClockPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<(), ConfigError> {
        match cmd {
            AppCommand::PumpOn => self.manual_pump_on(hw, clock, sink),
            AppCommand::PumpOff => self.manual_pump_off(hw, clock, sink),
            AppCommand::EnablePump => self.enable_pump(sink),
            AppCommand::DisablePump => self.disable_pump(hw, clock, sink),
            AppCommand::SetLearningEnabled(on) => self.set_learning_enabled(on, clock, sink),
            AppCommand::SaveLearning => {
                info!("Manual learning save requested");
                // Failure is logged inside; the command itself succeeds.
                let _ = self.save_learning_matrix(store);
            }
            AppCommand::ResetLearning => self.reset_learning(hw, store, sink),
            AppCommand::UpdateConfig(new_config) => {
                self.update_config(new_config)?;
                info!("Configuration updated at runtime");
            }
            AppCommand::SaveConfig => {
                self.config_dirty = true;
                self.dirty_since_tick = 0;
                info!("Explicit config save requested (will flush on next auto-save check)");
            }
        }
        Ok(())
    }

    // ── User requests ─────────────────────────────────────────

    /// A confirmed draw (or equivalent user demand for hot water).
    pub fn handle_user_request(
        &mut self,
        hw: &mut impl ActuatorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        let now = Now::read(clock);
        self.user_request(now, hw, sink);
    }

    /// Start the pump from the settings surface.
    pub fn manual_pump_on(
        &mut self,
        hw: &mut impl ActuatorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        let now = Now::read(clock);
        self.start_pump(PumpTrigger::ManualUi, now, hw, sink);
    }

    /// Stop the pump from the settings surface.
    pub fn manual_pump_off(
        &mut self,
        hw: &mut impl ActuatorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        if self.pump.is_running() {
            let now = Now::read(clock);
            self.stop_pump(StopReason::ManualUi, now, hw, sink);
        }
    }

    /// Resume automatic operation.
    pub fn enable_pump(&mut self, sink: &mut impl EventSink) {
        self.pump_enabled = true;
        info!("Pump enabled, automatic operation resumed");
        sink.emit(&AppEvent::PumpEnableChanged(true));
    }

    /// Suspend automatic operation. Learning is preserved; a running pump
    /// is stopped.
    pub fn disable_pump(
        &mut self,
        hw: &mut impl ActuatorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        self.pump_enabled = false;
        info!("Pump disabled, automatic operation suspended (learning preserved)");
        sink.emit(&AppEvent::PumpEnableChanged(false));
        if self.pump.is_running() {
            let now = Now::read(clock);
            self.stop_pump(StopReason::PumpDisabled, now, hw, sink);
        }
    }

    /// Switch learning on or off. Re-enabling briefly lights the yellow
    /// indicator; while disabled it stays on.
    pub fn set_learning_enabled(
        &mut self,
        enabled: bool,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        self.apply_learning_enabled(enabled, clock.uptime_ms(), sink);
    }

    // ── Learning persistence ──────────────────────────────────

    /// Load the learning matrix, falling back to the seed pattern.
    /// Returns `true` if a valid stored copy was used.
    pub fn load_learning(&mut self, store: &impl StoragePort) -> bool {
        let loaded = match read_learning(store) {
            Ok(m) => {
                info!(
                    "Learning matrix loaded from flash (checksum: 0x{:08X})",
                    m.checksum()
                );
                self.matrix = m;
                true
            }
            Err(Error::Storage(StorageError::NotFound)) => {
                info!("No saved learning matrix, initialising with typical daily pattern");
                self.matrix = LearningMatrix::seeded();
                false
            }
            Err(e) => {
                warn!("Stored learning matrix unusable ({}), using typical daily pattern", e);
                self.matrix = LearningMatrix::seeded();
                false
            }
        };
        self.log_learning_matrix();
        loaded
    }

    /// Persist the learning matrix.
    pub fn save_learning_matrix(&self, store: &mut impl StoragePort) -> Result<(), StorageError> {
        let record = self.matrix.to_record();
        match store.write(LEARNING_NAMESPACE, LEARNING_KEY, &record) {
            Ok(()) => {
                info!(
                    "Learning matrix saved to flash (checksum: 0x{:08X})",
                    self.matrix.checksum()
                );
                Ok(())
            }
            Err(e) => {
                warn!("Failed to save learning matrix: {}", e);
                Err(e)
            }
        }
    }

    /// Return the matrix to the seed pattern, persist it and flash the
    /// yellow indicator. The flash is the one blocking sequence.
    pub fn reset_learning(
        &mut self,
        hw: &mut impl ActuatorPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        warn!("Resetting learning matrix");
        self.matrix.reset_to_seed();
        let _ = self.save_learning_matrix(store);
        self.log_learning_matrix();
        sink.emit(&AppEvent::LearningReset);

        for i in 0..RESET_FLASH_STEPS {
            hw.set_indicator(Indicator::Yellow, i % 2 == 0);
            hw.delay_ms(RESET_FLASH_STEP_MS);
        }
    }

    // ── Settings surface ──────────────────────────────────────

    /// Set the four temperature thresholds (°C).
    pub fn set_thresholds(
        &mut self,
        temp_rise_c: f32,
        return_rise_c: f32,
        disinfection_rise_c: f32,
        min_return_c: f32,
    ) -> Result<(), ConfigError> {
        self.modify_config(|c| {
            c.temp_rise_threshold_c = temp_rise_c;
            c.return_rise_threshold_c = return_rise_c;
            c.disinfection_temp_threshold_c = disinfection_rise_c;
            c.min_return_temp_c = min_return_c;
        })?;
        info!(
            "Thresholds set: outlet rise={:.1}°C return rise={:.1}°C disinfection={:.1}°C min return={:.1}°C",
            temp_rise_c, return_rise_c, disinfection_rise_c, min_return_c
        );
        Ok(())
    }

    /// Set the pump's nominal flow rate (L/min) used for energy accounting.
    pub fn set_pump_flow_rate(&mut self, lpm: f32) -> Result<(), ConfigError> {
        self.modify_config(|c| c.pump_flow_rate_lpm = lpm)?;
        info!("Pump flow rate set to {:.1} L/min", lpm);
        Ok(())
    }

    pub fn set_anti_stagnation_interval(&mut self, secs: u32) -> Result<(), ConfigError> {
        self.modify_config(|c| c.anti_stagnation_interval_secs = secs)?;
        info!("Anti-stagnation interval set to {}h", secs / 3_600);
        Ok(())
    }

    pub fn set_anti_stagnation_runtime(&mut self, secs: u32) -> Result<(), ConfigError> {
        self.modify_config(|c| c.anti_stagnation_runtime_secs = secs)?;
        info!("Anti-stagnation runtime set to {}s", secs);
        Ok(())
    }

    /// Replace the whole configuration after validating it.
    pub fn update_config(&mut self, config: ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.mark_config_dirty();
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn matrix(&self) -> &LearningMatrix {
        &self.matrix
    }

    pub fn is_pump_running(&self) -> bool {
        self.pump.is_running()
    }

    /// Trigger of the current run, `None` while idle.
    pub fn pump_trigger(&self) -> Option<PumpTrigger> {
        self.pump.trigger()
    }

    pub fn pump_enabled(&self) -> bool {
        self.pump_enabled
    }

    pub fn learning_enabled(&self) -> bool {
        self.learning_enabled
    }

    pub fn vacation_mode(&self) -> bool {
        self.vacation.is_active()
    }

    pub fn disinfection_mode(&self) -> bool {
        self.pump.disinfection_mode()
    }

    pub fn last_cycle_energy_kwh(&self) -> f32 {
        self.pump.last_cycle_energy_kwh()
    }

    pub fn last_cycle_duration_secs(&self) -> u64 {
        self.pump.last_cycle_duration_secs()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Build a status snapshot.
    pub fn status_report(&self, clock: &impl ClockPort) -> StatusReport {
        let wall = clock.wall_clock();
        StatusReport {
            pump_running: self.pump.is_running(),
            trigger: self.pump.trigger(),
            run_elapsed_secs: self.pump.elapsed_secs(clock.uptime_ms()),
            pump_enabled: self.pump_enabled,
            learning_enabled: self.learning_enabled,
            vacation_mode: self.vacation.is_active(),
            disinfection_mode: self.pump.disinfection_mode(),
            clock_valid: wall.is_some(),
            outlet_c: self.snapshot.outlet_c,
            return_c: self.snapshot.return_c,
            last_cycle_duration_secs: self.pump.last_cycle_duration_secs(),
            last_cycle_energy_kwh: self.pump.last_cycle_energy_kwh(),
            disinfection_baseline_c: self.disinfection.baseline(),
            lockout_remaining_secs: wall
                .and_then(|w| self.anti_stagnation.lockout_remaining(w.epoch)),
            anti_stagnation_interval_secs: self.config.anti_stagnation_interval_secs,
            anti_stagnation_runtime_secs: self.config.anti_stagnation_runtime_secs,
        }
    }

    /// Emit a status snapshot through the sink.
    pub fn emit_status(&self, clock: &impl ClockPort, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Status(self.status_report(clock)));
    }

    // ── Internal: triggers ────────────────────────────────────

    fn check_anti_stagnation(
        &mut self,
        wall: &WallClock,
        now: Now,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let needed = !self.pump_enabled || self.vacation.is_active();
        if !self
            .anti_stagnation
            .poll(wall, needed, self.pump.is_running(), &self.config)
        {
            return;
        }

        let mark = ScheduleMark::of(wall);
        self.schedule.mark(mark);
        warn!(
            "Anti-stagnation maintenance run ({}), {}s, slot d={} s={} locked for 30 min",
            if self.pump_enabled { "vacation mode" } else { "pump disabled" },
            self.config.anti_stagnation_runtime_secs,
            mark.weekday,
            mark.slot
        );
        sink.emit(&AppEvent::AntiStagnationRun { mark });
        self.start_pump(PumpTrigger::AntiStagnation, now, hw, sink);
    }

    fn detect_water_draw(&mut self, now: Now, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        if self.pump.is_running() {
            // Pump-driven heating would read as a draw.
            self.draw.reset();
            return;
        }
        if let Some(epoch) = now.epoch() {
            if self.anti_stagnation.in_lockout(epoch) {
                self.draw.reset();
                return;
            }
        }

        if let Some(draw) = self.draw.observe(self.snapshot.outlet_c, now.ms, &self.config) {
            sink.emit(&AppEvent::DrawConfirmed(draw));
            self.user_request(now, hw, sink);
        }
    }

    fn user_request(&mut self, now: Now, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        if self.vacation.record_draw(now.epoch()) {
            sink.emit(&AppEvent::VacationExited);
        }

        if self.learning_enabled {
            if let Some(wall) = now.wall {
                let (weekday, slot) = (wall.weekday_index(), wall.slot());
                let weight = self
                    .matrix
                    .reinforce(weekday, slot, self.config.learn_increment);
                info!(
                    "Learned: {} slot={} ({:02}:{:02}) -> {}",
                    crate::clock::WEEKDAY_NAMES[weekday],
                    slot,
                    wall.hour,
                    wall.minute,
                    weight
                );
                sink.emit(&AppEvent::LearningReinforced {
                    weekday,
                    slot,
                    weight,
                });
            }
        }

        self.yellow_until = Some(now.ms.add_ms(DRAW_INDICATOR_MS));

        if self.pump.is_running() {
            debug!("Pump already running, request acknowledged");
        } else if self
            .pump
            .ran_recently(now.epoch(), self.config.user_request_max_age_secs)
        {
            debug!("Recent pump run, draw request skipped");
        } else {
            self.start_pump(PumpTrigger::WaterDraw, now, hw, sink);
        }
    }

    fn decay_if_due(&mut self, wall: &WallClock, store: &mut impl StoragePort, sink: &mut impl EventSink) {
        if !self.decay.is_due(wall.day_of_year) {
            return;
        }
        self.matrix.decay(self.config.decay_factor);
        info!("Learning matrix decayed (factor {:.2})", self.config.decay_factor);
        sink.emit(&AppEvent::LearningDecayed);
        let _ = self.save_learning_matrix(store);
    }

    fn check_disinfection(
        &mut self,
        wall: &WallClock,
        now: Now,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        if self.pump.is_running() {
            return;
        }
        if let Some(elevation_c) =
            self.disinfection
                .check(self.snapshot.outlet_c, wall.epoch, &self.config)
        {
            sink.emit(&AppEvent::DisinfectionDetected { elevation_c });
            self.start_pump(PumpTrigger::Disinfection, now, hw, sink);
        }
    }

    fn check_schedule(
        &mut self,
        wall: &WallClock,
        now: Now,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        if self.anti_stagnation.in_lockout(wall.epoch) {
            return;
        }
        let Some(mark) =
            self.schedule
                .evaluate(wall, now.ms, &self.matrix, self.config.schedule_threshold)
        else {
            return;
        };

        sink.emit(&AppEvent::ScheduledPreheat {
            mark,
            weight: self.matrix.get(mark.weekday, mark.slot),
        });
        if self.pump.is_running() {
            debug!("Pump already running, scheduled trigger recorded but not started");
        } else {
            self.start_pump(PumpTrigger::Scheduled, now, hw, sink);
        }
    }

    // ── Internal: pump ────────────────────────────────────────

    fn start_pump(
        &mut self,
        trigger: PumpTrigger,
        now: Now,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> bool {
        let gate = StartGate {
            pump_bound: hw.has_pump(),
            pump_enabled: self.pump_enabled,
        };
        match self
            .pump
            .start(trigger, gate, self.snapshot.return_c, now.ms, &self.config)
        {
            Ok(()) => {
                hw.pump_on();
                hw.set_indicator(Indicator::Green, true);
                self.draw.reset();
                sink.emit(&AppEvent::PumpStarted {
                    trigger,
                    baseline_return_c: self.pump.baseline_return().unwrap_or_default(),
                });
                true
            }
            Err(reason) => {
                match reason {
                    StartRejected::NoPump | StartRejected::ReturnSensorInvalid => {
                        warn!("Cannot start pump ({}): {}", trigger, reason);
                    }
                    StartRejected::AlreadyHot { .. } => {
                        info!("Pump start skipped ({}): {}", trigger, reason);
                    }
                    StartRejected::Disabled | StartRejected::AlreadyRunning => {
                        debug!("Pump start blocked ({}): {}", trigger, reason);
                    }
                }
                sink.emit(&AppEvent::StartRejected { trigger, reason });
                false
            }
        }
    }

    fn pump_control(&mut self, now: Now, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        let SensorSnapshot {
            outlet_c, return_c, ..
        } = self.snapshot;
        if let Some(reason) = self.pump.control(outlet_c, return_c, now.ms, &self.config) {
            self.stop_pump(reason, now, hw, sink);
        }
    }

    fn stop_pump(
        &mut self,
        reason: StopReason,
        now: Now,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let Some(summary) = self.pump.stop(reason, now.ms, now.epoch()) else {
            return;
        };
        hw.pump_off();
        hw.set_indicator(Indicator::Green, false);

        // Fresh tank water sits at the outlet right now.
        if summary.disinfection {
            debug!("Disinfection run, baseline left unchanged");
        } else if let Some(outlet_c) = self.snapshot.outlet_c {
            self.disinfection.update_baseline(outlet_c);
        } else {
            warn!("Outlet invalid at pump stop, disinfection baseline not updated");
        }

        self.draw.reset();
        sink.emit(&AppEvent::PumpStopped(summary));
    }

    // ── Internal: button and indicators ───────────────────────

    fn handle_button(
        &mut self,
        now: Now,
        hw: &mut impl ActuatorPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        let Some(pressed) = self.snapshot.button_pressed else {
            return;
        };
        let Some(gesture) = self.button.update(pressed, now.ms) else {
            return;
        };

        match gesture {
            ButtonGesture::ResetLearning => {
                warn!("Button held > 10 s, resetting learning matrix");
                self.reset_learning(hw, store, sink);
            }
            ButtonGesture::ToggleLearning => {
                self.apply_learning_enabled(!self.learning_enabled, now.ms, sink);
            }
            ButtonGesture::TogglePump => {
                if self.pump.is_running() {
                    self.stop_pump(StopReason::ManualButton, now, hw, sink);
                } else {
                    self.start_pump(PumpTrigger::ManualButton, now, hw, sink);
                }
            }
        }
    }

    fn apply_learning_enabled(&mut self, enabled: bool, now: Millis, sink: &mut impl EventSink) {
        self.learning_enabled = enabled;
        if enabled {
            info!("Learning enabled");
            self.yellow_until = Some(now.add_ms(LEARNING_ON_INDICATOR_MS));
        } else {
            info!("Learning disabled");
            self.yellow_until = None;
        }
        sink.emit(&AppEvent::LearningToggled(enabled));
    }

    fn update_indicators(&self, now: Now, hw: &mut impl ActuatorPort) {
        hw.set_indicator(Indicator::Green, self.pump.is_running());
        let yellow = !self.learning_enabled || self.yellow_until.is_some_and(|t| now.ms < t);
        hw.set_indicator(Indicator::Yellow, yellow);
    }

    fn log_learning_matrix(&self) {
        info!("Learning matrix (30-min slots; AM = 00:00-11:59, PM = 12:00-23:59)");
        for row in self.matrix.render_rows() {
            info!("{}", row);
        }
    }

    // ── Config dirty-flag management ──────────────────────────

    fn modify_config(&mut self, f: impl FnOnce(&mut ControllerConfig)) -> Result<(), ConfigError> {
        let mut next = self.config.clone();
        f(&mut next);
        self.update_config(next)
    }

    /// Mark the config as modified.
    pub fn mark_config_dirty(&mut self) {
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_since_tick = self.tick_count;
        }
    }

    /// Check if auto-save should trigger (5 seconds after last change).
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        let tick_secs = self.config.control_loop_interval_ms as f32 / 1000.0;
        let ticks_since_dirty = self.tick_count.saturating_sub(self.dirty_since_tick);
        if (ticks_since_dirty as f32 * tick_secs) < CONFIG_AUTOSAVE_DELAY_SECS {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config auto-saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {}", e);
                false
            }
        }
    }

    /// Force-save if dirty.
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) {
        if !self.config_dirty {
            return;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config force-saved");
            }
            Err(e) => {
                warn!("Config force-save failed: {}", e);
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}

/// Read and validate the stored learning record.
fn read_learning(store: &impl StoragePort) -> crate::error::Result<LearningMatrix> {
    let mut buf = [0u8; RECORD_LEN];
    let n = match store.read(LEARNING_NAMESPACE, LEARNING_KEY, &mut buf) {
        Ok(n) => n,
        Err(StorageError::BufferTooSmall { needed }) => {
            return Err(Error::RecordLength {
                expected: RECORD_LEN,
                found: needed,
            });
        }
        Err(e) => return Err(e.into()),
    };
    LearningMatrix::from_record(&buf[..n])
}
