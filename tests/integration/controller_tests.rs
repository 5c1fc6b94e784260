//! End-to-end scenarios for the controller tick pipeline:
//! sensors → detectors → pump state machine → actuators and events.

use crate::mock_hw::{ActuatorCall, MONDAY_MIDNIGHT, MockClock, Rig, SUNDAY_MIDNIGHT};

use hotcirc::ControllerConfig;
use hotcirc::adapters::nvs::NvsAdapter;
use hotcirc::app::events::AppEvent;
use hotcirc::app::ports::{Indicator, StoragePort};
use hotcirc::app::service::{LEARNING_KEY, LEARNING_NAMESPACE};
use hotcirc::control::{PumpTrigger, StartRejected as Rejected, StopReason};
use hotcirc::learning::LearningMatrix;

/// Rise per second that confirms a draw on the 16th rising sample.
const DRAW_RATE: f32 = 0.12;
const DRAW_SECS: u32 = 16;

fn monday_at(hour: u64, minute: u64, second: u64) -> MockClock {
    MockClock::at(MONDAY_MIDNIGHT + hour * 3_600 + minute * 60 + second)
}

fn stopped_with(rig: &Rig, reason: StopReason) -> bool {
    rig.sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::PumpStopped(s) if s.reason == reason))
}

fn rejected_with(rig: &Rig, want: fn(&Rejected) -> bool) -> bool {
    rig.sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::StartRejected { reason, .. } if want(reason)))
}

// ── Draw detection → learning → pump ─────────────────────────

#[test]
fn confirmed_draw_reinforces_slot_and_starts_pump() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();

    rig.ramp_outlet(DRAW_RATE, DRAW_SECS - 1);
    assert!(!rig.app.is_pump_running(), "not confirmed before the 15 s mark");

    rig.ramp_outlet(DRAW_RATE, 1);
    assert!(rig.hw.pump_on());
    assert_eq!(rig.app.pump_trigger(), Some(PumpTrigger::WaterDraw));
    // Monday 10:00 is weekday 0, slot 20; the seed leaves it at zero.
    assert_eq!(rig.app.matrix().get(0, 20), 40);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::DrawConfirmed(_))), 1);
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::LearningReinforced {
            weekday: 0,
            slot: 20,
            weight: 40
        }
    )));
    assert!(rig.hw.indicator(Indicator::Green));
    assert!(rig.hw.indicator(Indicator::Yellow), "draw feedback");
}

#[test]
fn external_request_learns_and_starts_pump() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();
    rig.app
        .handle_user_request(&mut rig.hw, &rig.clock, &mut rig.sink);
    assert_eq!(rig.app.pump_trigger(), Some(PumpTrigger::WaterDraw));
    assert_eq!(rig.app.matrix().get(0, 20), 40);
    assert!(rig.hw.pump_on());
}

#[test]
fn shallow_rise_is_not_a_draw() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();

    // 1.0 °C over the whole window: below the 1.5 °C threshold.
    rig.ramp_outlet(1.0 / 15.0, DRAW_SECS);
    rig.run(20);

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::DrawConfirmed(_))), 0);
    assert!(!rig.app.is_pump_running());
    assert_eq!(rig.app.matrix(), &LearningMatrix::seeded());
}

#[test]
fn return_rise_stops_run_after_minimum_time() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();
    rig.ramp_outlet(DRAW_RATE, DRAW_SECS);
    assert!(rig.app.is_pump_running());

    // Target = baseline 22.0 + 1.5 - 0.2 tolerance.
    rig.hw.return_c = Some(23.5);
    rig.run(29);
    assert!(rig.app.is_pump_running(), "minimum run time not reached");

    rig.step();
    assert!(!rig.hw.pump_on());
    assert!(stopped_with(&rig, StopReason::TargetReached));
    assert_eq!(rig.app.last_cycle_duration_secs(), 30);
    assert!(rig.app.last_cycle_energy_kwh() > 0.0);
    assert!(!rig.hw.indicator(Indicator::Green));
}

#[test]
fn draw_shortly_after_a_run_is_learned_but_not_pumped() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();
    rig.ramp_outlet(DRAW_RATE, DRAW_SECS);
    rig.hw.return_c = Some(23.5);
    rig.run(30);
    assert!(!rig.app.is_pump_running());
    rig.hw.return_c = Some(22.0);
    rig.run(5);

    let starts_before = rig.hw.count(ActuatorCall::PumpOn);
    rig.ramp_outlet(DRAW_RATE, DRAW_SECS);

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::DrawConfirmed(_))), 2);
    assert_eq!(rig.app.matrix().get(0, 20), 80);
    assert_eq!(rig.hw.count(ActuatorCall::PumpOn), starts_before);
    assert!(!rig.app.is_pump_running());
}

#[test]
fn draw_without_wall_clock_pumps_but_does_not_learn() {
    let mut rig = Rig::new(MockClock::unsynced());
    rig.tick();
    rig.ramp_outlet(DRAW_RATE, DRAW_SECS);

    assert!(rig.app.is_pump_running());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::LearningReinforced { .. })), 0);
    assert_eq!(rig.app.matrix(), &LearningMatrix::seeded());
    assert!(!rig.app.status_report(&rig.clock).clock_valid);
}

#[test]
fn invalid_outlet_reading_resets_draw_tracking() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();
    rig.ramp_outlet(DRAW_RATE, 10);
    rig.hw.outlet_c = None;
    rig.step();
    rig.hw.outlet_c = Some(46.2);
    rig.ramp_outlet(DRAW_RATE, 10);

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::DrawConfirmed(_))), 0);
}

// ── Safety ceiling ────────────────────────────────────────────

#[test]
fn pump_never_outlives_max_run_time() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();
    rig.manual_on();
    assert_eq!(rig.app.pump_trigger(), Some(PumpTrigger::ManualUi));

    // The return never warms up, so only the ceiling can stop the run.
    rig.run(479);
    assert!(rig.app.is_pump_running());
    rig.step();

    assert!(!rig.app.is_pump_running());
    assert!(!rig.hw.pump_on());
    assert!(stopped_with(&rig, StopReason::SafetyTimeout));
    assert_eq!(rig.app.last_cycle_duration_secs(), 480);
}

// ── Start gating ──────────────────────────────────────────────

#[test]
fn start_is_rejected_without_relay() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.hw.pump_bound = false;
    rig.tick();
    rig.manual_on();

    assert!(!rig.app.is_pump_running());
    assert_eq!(rig.hw.count(ActuatorCall::PumpOn), 0);
    assert!(rejected_with(&rig, |r| matches!(r, Rejected::NoPump)));
}

#[test]
fn start_is_rejected_with_invalid_or_hot_return() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.hw.return_c = None;
    rig.tick();
    rig.manual_on();
    assert!(rejected_with(&rig, |r| matches!(r, Rejected::ReturnSensorInvalid)));

    rig.hw.return_c = Some(35.0);
    rig.step();
    rig.manual_on();
    assert!(rejected_with(&rig, |r| matches!(r, Rejected::AlreadyHot { .. })));
    assert!(!rig.app.is_pump_running());
}

#[test]
fn disabling_stops_the_pump_and_blocks_automatic_starts() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();
    rig.manual_on();
    assert!(rig.app.is_pump_running());

    rig.app
        .disable_pump(&mut rig.hw, &rig.clock, &mut rig.sink);
    assert!(!rig.app.is_pump_running());
    assert!(!rig.hw.pump_on());
    assert!(stopped_with(&rig, StopReason::PumpDisabled));
    assert!(!rig.app.pump_enabled());

    rig.run(2);
    rig.manual_on();
    assert!(rejected_with(&rig, |r| matches!(r, Rejected::Disabled)));
    assert!(!rig.app.is_pump_running());

    rig.app.enable_pump(&mut rig.sink);
    assert!(rig.app.pump_enabled());
    assert!(
        rig.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::PumpEnableChanged(true)))
    );
}

// ── Vacation ──────────────────────────────────────────────────

#[test]
fn a_day_without_draws_enters_vacation_and_a_draw_ends_it() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();

    rig.clock.advance_secs(86_399);
    rig.tick();
    assert!(!rig.app.vacation_mode());

    rig.step();
    assert!(rig.app.vacation_mode());
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::VacationEntered {
            hours_since_draw: 24
        }
    )));

    rig.ramp_outlet(DRAW_RATE, DRAW_SECS);
    assert!(!rig.app.vacation_mode());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::VacationExited)), 1);
    assert_eq!(rig.app.pump_trigger(), Some(PumpTrigger::WaterDraw));
}

#[test]
fn vacation_suppresses_preheat_decay_and_disinfection() {
    // Sunday 06:29:50; a completed run seeds the outlet baseline at 45 °C.
    let mut rig = Rig::new(MockClock::at(SUNDAY_MIDNIGHT + 6 * 3_600 + 29 * 60 + 50));
    rig.tick();
    rig.manual_on();
    rig.step();
    rig.manual_off();
    assert_eq!(
        rig.app.status_report(&rig.clock).disinfection_baseline_c,
        Some(45.0)
    );

    // A day later, just before Monday 06:30 (weight 120), on a new day.
    rig.clock.advance_secs(86_400);
    rig.tick();
    assert!(rig.app.vacation_mode());

    rig.run(120);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ScheduledPreheat { .. })), 0);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::LearningDecayed)), 0);
    assert_eq!(rig.app.matrix(), &LearningMatrix::seeded());
    assert!(!rig.app.is_pump_running());

    // Boiler spike well above the baseline.
    rig.hw.outlet_c = Some(56.0);
    rig.hw.return_c = Some(40.0);
    rig.run(5);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::DisinfectionDetected { .. })),
        0
    );
    assert!(!rig.app.is_pump_running());
    assert!(rig.app.vacation_mode());
}

// ── Anti-stagnation ───────────────────────────────────────────

#[test]
fn maintenance_run_fires_once_and_locks_out_draws() {
    // Sunday 02:59:50, automatic operation off, return already hot.
    let mut rig = Rig::new(MockClock::at(SUNDAY_MIDNIGHT + 3 * 3_600 - 10));
    rig.hw.return_c = Some(35.0);
    rig.app
        .disable_pump(&mut rig.hw, &rig.clock, &mut rig.sink);
    rig.tick();

    rig.run(9);
    assert!(!rig.app.is_pump_running());
    rig.step(); // 03:00:00
    assert_eq!(rig.app.pump_trigger(), Some(PumpTrigger::AntiStagnation));
    assert!(rig.hw.pump_on());

    rig.run(14);
    assert!(rig.app.is_pump_running());
    rig.step();
    assert!(!rig.app.is_pump_running());
    assert!(stopped_with(&rig, StopReason::AntiStagnationComplete));
    assert_eq!(
        rig.app.status_report(&rig.clock).lockout_remaining_secs,
        Some(1_785)
    );

    // A draw inside the lockout is not even tracked.
    rig.ramp_outlet(DRAW_RATE, 20);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::DrawConfirmed(_))), 0);

    // The rest of the window passes without a second run.
    rig.run(300);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::AntiStagnationRun { .. })), 1);

    // After the lockout, draws are seen again (and refused while disabled).
    rig.run(1_500);
    assert_eq!(rig.app.status_report(&rig.clock).lockout_remaining_secs, None);
    rig.ramp_outlet(DRAW_RATE, DRAW_SECS);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::DrawConfirmed(_))), 1);
    assert!(!rig.app.is_pump_running());
}

#[test]
fn maintenance_is_skipped_during_normal_operation() {
    let mut rig = Rig::new(MockClock::at(SUNDAY_MIDNIGHT + 3 * 3_600 - 10));
    rig.tick();
    rig.run(400);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::AntiStagnationRun { .. })), 0);
    assert!(!rig.app.is_pump_running());
}

#[test]
fn maintenance_runs_in_vacation_with_pump_enabled() {
    // Saturday 02:59:40; a day without draws ends just before the window.
    let mut rig = Rig::new(MockClock::at(SUNDAY_MIDNIGHT - 86_400 + 3 * 3_600 - 20));
    rig.tick();
    rig.clock.advance_secs(86_400);
    rig.tick();
    assert!(rig.app.vacation_mode());
    assert!(rig.app.pump_enabled());

    rig.run(19);
    assert!(!rig.app.is_pump_running());
    rig.step(); // Sunday 03:00:00
    assert_eq!(rig.app.pump_trigger(), Some(PumpTrigger::AntiStagnation));
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::AntiStagnationRun { .. })), 1);

    rig.run(15);
    assert!(stopped_with(&rig, StopReason::AntiStagnationComplete));
}

#[test]
fn maintenance_lockout_holds_off_learned_preheat() {
    // Sunday 03:30 (slot 7) learned well above the schedule threshold.
    let mut nvs = NvsAdapter::new().unwrap();
    let mut m = LearningMatrix::seeded();
    m.reinforce(6, 7, 120);
    nvs.write(LEARNING_NAMESPACE, LEARNING_KEY, &m.to_record())
        .unwrap();

    // Maintenance window opens at 03:20; clock starts at 03:19:50.
    let mut rig = Rig::with_store(
        MockClock::at(SUNDAY_MIDNIGHT + 3 * 3_600 + 19 * 60 + 50),
        nvs,
    );
    assert_eq!(rig.app.matrix().get(6, 7), 120);
    let mut cfg = ControllerConfig::default();
    cfg.anti_stagnation_minute_start = 20;
    rig.app.update_config(cfg).unwrap();
    rig.app
        .disable_pump(&mut rig.hw, &rig.clock, &mut rig.sink);
    rig.tick();

    rig.run(9);
    rig.step(); // 03:20:00
    assert_eq!(rig.app.pump_trigger(), Some(PumpTrigger::AntiStagnation));
    rig.run(15); // 03:20:15
    assert!(!rig.app.is_pump_running());
    rig.app.enable_pump(&mut rig.sink);

    rig.run(1_784); // through 03:49:59, slot 7 active since 03:30
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ScheduledPreheat { .. })), 0);
    assert!(!rig.app.is_pump_running());

    rig.step(); // 03:50:00, lockout over
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ScheduledPreheat { .. })), 1);
    assert_eq!(rig.app.pump_trigger(), Some(PumpTrigger::Scheduled));

    rig.run(60);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ScheduledPreheat { .. })), 1);
}

// ── Learned schedule ──────────────────────────────────────────

#[test]
fn learned_slot_preheats_once() {
    // Slot 12 (06:00) seeds 80, slot 13 (06:30) seeds 120.
    let mut rig = Rig::new(monday_at(6, 29, 50));
    rig.tick();
    rig.run(29);
    assert!(!rig.app.is_pump_running(), "slot 12 is below threshold");

    rig.step(); // 06:30:20, second evaluation
    assert_eq!(rig.app.pump_trigger(), Some(PumpTrigger::Scheduled));
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ScheduledPreheat { mark, weight: 120 } if mark.weekday == 0 && mark.slot == 13
    )));

    rig.manual_off();
    assert!(stopped_with(&rig, StopReason::ManualUi));
    rig.run(120);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ScheduledPreheat { .. })), 1);
    assert!(!rig.app.is_pump_running());
}

// ── Disinfection ──────────────────────────────────────────────

#[test]
fn boiler_hot_cycle_runs_pump_without_return_stop() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();
    // A completed run seeds the outlet baseline at 45 °C.
    rig.manual_on();
    rig.step();
    rig.manual_off();
    assert_eq!(
        rig.app.status_report(&rig.clock).disinfection_baseline_c,
        Some(45.0)
    );

    rig.hw.outlet_c = Some(56.0);
    rig.hw.return_c = Some(40.0);
    rig.step();
    assert_eq!(rig.app.pump_trigger(), Some(PumpTrigger::Disinfection));
    assert!(rig.app.disinfection_mode());

    rig.run(60);
    assert!(rig.app.is_pump_running(), "no return-based stop in disinfection mode");

    rig.manual_off();
    assert!(!rig.app.disinfection_mode());
    assert_eq!(
        rig.app.status_report(&rig.clock).disinfection_baseline_c,
        Some(45.0),
        "baseline untouched by a disinfection run"
    );

    rig.run(10);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::DisinfectionDetected { .. })),
        1,
        "cooldown holds off a second detection"
    );
}

// ── Front-panel button ────────────────────────────────────────

#[test]
fn short_press_toggles_pump() {
    let mut rig = Rig::new(MockClock::unsynced());
    rig.tick();

    rig.press_button(1);
    assert_eq!(rig.app.pump_trigger(), Some(PumpTrigger::ManualButton));

    rig.press_button(1);
    assert!(!rig.app.is_pump_running());
    assert!(stopped_with(&rig, StopReason::ManualButton));
}

#[test]
fn long_press_toggles_learning_and_lights_yellow() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();

    rig.press_button(4);
    assert!(!rig.app.learning_enabled());
    assert!(rig.hw.indicator(Indicator::Yellow));

    rig.ramp_outlet(DRAW_RATE, DRAW_SECS);
    assert!(rig.app.is_pump_running());
    assert_eq!(rig.app.matrix().get(0, 20), 0, "learning is off");

    rig.press_button(4);
    assert!(rig.app.learning_enabled());
    rig.run(3);
    assert!(!rig.hw.indicator(Indicator::Yellow));
}

#[test]
fn very_long_press_resets_learning() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();
    rig.ramp_outlet(DRAW_RATE, DRAW_SECS);
    assert_ne!(rig.app.matrix(), &LearningMatrix::seeded());
    rig.manual_off();

    rig.press_button(11);

    assert_eq!(rig.app.matrix(), &LearningMatrix::seeded());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::LearningReset)), 1);
    assert_eq!(rig.hw.count(ActuatorCall::Delay(200)), 6);
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn status_report_reflects_running_cycle() {
    let mut rig = Rig::new(monday_at(10, 0, 0));
    rig.tick();
    rig.manual_on();
    rig.step();

    let status = rig.app.status_report(&rig.clock);
    assert!(status.pump_running);
    assert_eq!(status.trigger, Some(PumpTrigger::ManualUi));
    assert_eq!(status.run_elapsed_secs, Some(1));
    assert!(status.clock_valid);
    assert_eq!(status.outlet_c, Some(45.0));
    assert_eq!(status.anti_stagnation_runtime_secs, 15);

    rig.app.emit_status(&rig.clock, &mut rig.sink);
    assert!(matches!(rig.sink.events.last(), Some(AppEvent::Status(_))));
}
