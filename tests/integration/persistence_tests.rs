//! Learning-record and configuration persistence through the host NVS
//! backend, including recovery from damaged records.

use crate::mock_hw::{MONDAY_MIDNIGHT, MockClock, Rig};

use hotcirc::adapters::nvs::NvsAdapter;
use hotcirc::app::commands::AppCommand;
use hotcirc::app::events::AppEvent;
use hotcirc::app::ports::{ConfigPort, StoragePort};
use hotcirc::app::service::{LEARNING_KEY, LEARNING_NAMESPACE};
use hotcirc::learning::{LearningMatrix, RECORD_LEN};
use hotcirc::ControllerConfig;

fn reboot(rig: Rig, clock: MockClock) -> Rig {
    let Rig { nvs, .. } = rig;
    Rig::with_store(clock, nvs)
}

fn started_from_storage(rig: &Rig) -> bool {
    rig.sink.events.iter().any(|e| {
        matches!(
            e,
            AppEvent::Started {
                learning_from_storage: true
            }
        )
    })
}

#[test]
fn empty_store_boots_with_seed_pattern() {
    let rig = Rig::new(MockClock::unsynced());
    assert!(!started_from_storage(&rig));
    assert_eq!(rig.app.matrix(), &LearningMatrix::seeded());
}

#[test]
fn saved_matrix_survives_reboot() {
    let mut rig = Rig::new(MockClock::at(MONDAY_MIDNIGHT + 10 * 3_600));
    rig.tick();
    rig.ramp_outlet(0.12, 16);
    assert_eq!(rig.app.matrix().get(0, 20), 40);

    rig.app
        .handle_command(
            AppCommand::SaveLearning,
            &mut rig.hw,
            &rig.clock,
            &mut rig.nvs,
            &mut rig.sink,
        )
        .unwrap();
    let learned = rig.app.matrix().clone();

    let rig = reboot(rig, MockClock::unsynced());
    assert!(started_from_storage(&rig));
    assert_eq!(rig.app.matrix(), &learned);
}

#[test]
fn corrupted_checksum_falls_back_to_seed() {
    let mut nvs = NvsAdapter::new().unwrap();
    let mut m = LearningMatrix::seeded();
    m.reinforce(2, 30, 200);
    let mut record = m.to_record();
    record[RECORD_LEN - 4] ^= 0x5A;
    nvs.write(LEARNING_NAMESPACE, LEARNING_KEY, &record).unwrap();

    let rig = Rig::with_store(MockClock::unsynced(), nvs);
    assert!(!started_from_storage(&rig));
    assert_eq!(rig.app.matrix(), &LearningMatrix::seeded());
}

#[test]
fn record_from_older_layout_falls_back_to_seed() {
    let mut nvs = NvsAdapter::new().unwrap();
    // 7 × 24 hourly slots plus checksum.
    nvs.write(LEARNING_NAMESPACE, LEARNING_KEY, &[0u8; 172]).unwrap();

    let rig = Rig::with_store(MockClock::unsynced(), nvs);
    assert_eq!(rig.app.matrix(), &LearningMatrix::seeded());
}

#[test]
fn oversized_record_falls_back_to_seed() {
    let mut nvs = NvsAdapter::new().unwrap();
    nvs.write(LEARNING_NAMESPACE, LEARNING_KEY, &[7u8; RECORD_LEN + 8])
        .unwrap();

    let rig = Rig::with_store(MockClock::unsynced(), nvs);
    assert_eq!(rig.app.matrix(), &LearningMatrix::seeded());
}

#[test]
fn daily_decay_runs_once_and_is_persisted() {
    // Monday 23:59:58; the first tick only records the day.
    let mut rig = Rig::new(MockClock::at(MONDAY_MIDNIGHT + 86_398));
    rig.tick();
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::LearningDecayed)), 0);

    rig.run(3); // into Tuesday
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::LearningDecayed)), 1);
    assert_eq!(rig.app.matrix().get(0, 13), 118); // 120 × 0.98 = 117.6

    rig.run(60);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::LearningDecayed)), 1);

    let decayed = rig.app.matrix().clone();
    let rig = reboot(rig, MockClock::unsynced());
    assert_eq!(rig.app.matrix(), &decayed);
}

#[test]
fn reset_persists_seed_pattern() {
    let mut rig = Rig::new(MockClock::at(MONDAY_MIDNIGHT + 10 * 3_600));
    rig.tick();
    rig.ramp_outlet(0.12, 16);
    rig.app
        .handle_command(
            AppCommand::ResetLearning,
            &mut rig.hw,
            &rig.clock,
            &mut rig.nvs,
            &mut rig.sink,
        )
        .unwrap();
    assert!(rig.nvs.exists(LEARNING_NAMESPACE, LEARNING_KEY));

    let rig = reboot(rig, MockClock::unsynced());
    assert!(started_from_storage(&rig));
    assert_eq!(rig.app.matrix(), &LearningMatrix::seeded());
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn config_change_is_auto_saved_after_debounce() {
    let mut rig = Rig::new(MockClock::unsynced());
    rig.tick();

    let mut cfg = ControllerConfig::default();
    cfg.max_run_secs = 600;
    rig.app
        .handle_command(
            AppCommand::UpdateConfig(cfg),
            &mut rig.hw,
            &rig.clock,
            &mut rig.nvs,
            &mut rig.sink,
        )
        .unwrap();
    assert!(rig.app.is_config_dirty());
    assert!(!rig.app.auto_save_if_needed(&rig.nvs), "debounce not elapsed");

    let mut saved = false;
    for _ in 0..6 {
        rig.step();
        saved |= rig.app.auto_save_if_needed(&rig.nvs);
    }
    assert!(saved);
    assert!(!rig.app.is_config_dirty());
    assert_eq!(rig.nvs.load().unwrap().max_run_secs, 600);
}

#[test]
fn invalid_config_command_is_rejected() {
    let mut rig = Rig::new(MockClock::unsynced());
    let mut cfg = ControllerConfig::default();
    cfg.decay_factor = 1.5;
    let result = rig.app.handle_command(
        AppCommand::UpdateConfig(cfg),
        &mut rig.hw,
        &rig.clock,
        &mut rig.nvs,
        &mut rig.sink,
    );
    assert!(result.is_err());
    assert!(!rig.app.is_config_dirty());
    assert!((rig.app.config().decay_factor - 0.98).abs() < f32::EPSILON);
}

#[test]
fn force_save_flushes_immediately() {
    let mut rig = Rig::new(MockClock::unsynced());
    rig.app.set_pump_flow_rate(6.0).unwrap();
    rig.app.force_save_if_dirty(&rig.nvs);
    assert!(!rig.app.is_config_dirty());
    assert!((rig.nvs.load().unwrap().pump_flow_rate_lpm - 6.0).abs() < f32::EPSILON);
}
