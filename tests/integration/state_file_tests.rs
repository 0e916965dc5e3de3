//! Integration tests for the JSON state file under the service: restarts,
//! corruption and crash-safe replacement.

use std::fs;

use chrono::NaiveTime;

use crate::mock_hw::{at, MockMotor, RecordingSink};

use petfeeder::adapters::state_file::JsonStateStore;
use petfeeder::app::ports::{FeedStore, StoredState};
use petfeeder::app::service::FeederService;
use petfeeder::app::status::{status_report, CORRUPT_NOTICE};
use petfeeder::config::FeederConfig;
use petfeeder::recovery::RecoveryDecision;
use petfeeder::state::{FeedOutcome, FeedState, FeedStatus};

fn config() -> FeederConfig {
    let mut c = FeederConfig::default();
    c.feed_time = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
    c
}

#[test]
fn missing_file_loads_as_never_fed() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStateStore::new(dir.path().join("feeder_state.json"));
    assert_eq!(store.read().unwrap(), StoredState::Absent);

    let state = store.load().unwrap();
    assert!(!state.active);
    assert_eq!(state.last_feed_at, None);
}

#[test]
fn restart_after_recovery_does_not_feed_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feeder_state.json");
    let mut seeded = FeedState::default();
    seeded.apply(FeedOutcome::Success, at(1, 8, 1, 0), None, None);
    JsonStateStore::new(&path).seed(&seeded).unwrap();

    let motor = MockMotor::new();
    let mut first =
        FeederService::new(&config(), motor.clone(), JsonStateStore::new(&path), RecordingSink::new());
    assert!(matches!(first.start(at(2, 8, 5, 0)), RecoveryDecision::Recover { .. }));
    drop(first);

    // Process restarts a minute later with a fresh policy.
    let mut second =
        FeederService::new(&config(), motor.clone(), JsonStateStore::new(&path), RecordingSink::new());
    assert_eq!(second.start(at(2, 8, 6, 0)), RecoveryDecision::NotMissed);

    assert_eq!(motor.log.borrow().rotations(), 1);
    let on_disk = JsonStateStore::new(&path).load().unwrap();
    assert_eq!(on_disk.total_count, 2);
    assert_eq!(on_disk.last_feed_status, FeedStatus::Success);
}

#[test]
fn corrupt_file_is_ignored_then_quarantined() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feeder_state.json");
    fs::write(&path, "not json at all").unwrap();

    let motor = MockMotor::new();
    let mut svc =
        FeederService::new(&config(), motor, JsonStateStore::new(&path), RecordingSink::new());
    assert_eq!(svc.start(at(2, 7, 0, 0)), RecoveryDecision::NeverFed);
    assert_eq!(svc.controller().state(), &FeedState::default());

    svc.heartbeat(at(2, 8, 0, 0));

    let store = JsonStateStore::new(&path);
    assert!(store.corrupt_path().exists());
    assert_eq!(fs::read_to_string(store.corrupt_path()).unwrap(), "not json at all");
    let state = store.load().unwrap();
    assert_eq!(state.total_count, 1);
    assert!(state.is_consistent());
}

#[test]
fn every_write_leaves_parseable_json_and_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feeder_state.json");
    let mut store = JsonStateStore::new(&path);

    for h in 0..5 {
        store.record(FeedOutcome::Success, at(2, h, 0, 0), None, None).unwrap();
        let raw = fs::read(&path).unwrap();
        let parsed: FeedState = serde_json::from_slice(&raw).unwrap();
        assert!(parsed.is_consistent());
    }

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1, "temp files must not linger");
}

#[test]
fn status_of_corrupt_file_shows_empty_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feeder_state.json");
    fs::write(&path, "not json").unwrap();

    let report = status_report(&JsonStateStore::new(&path), config().feed_time, at(2, 7, 0, 0))
        .unwrap();

    assert!(report.starts_with(CORRUPT_NOTICE));
    assert!(report.contains(&FeedState::default().render()));
    assert!(report.contains("Next feed:       2025-06-02 08:00:00"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "not json", "status never rewrites");
}

#[test]
fn status_reports_last_recorded_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feeder_state.json");
    let mut store = JsonStateStore::new(&path);
    store
        .record(FeedOutcome::Failed, at(2, 8, 0, 0), Some(at(3, 8, 0, 0)), Some("EIO".into()))
        .unwrap();

    let report = status_report(&store, config().feed_time, at(2, 9, 0, 0)).unwrap();

    assert!(!report.contains(CORRUPT_NOTICE));
    assert!(report.contains("Last status:     Failed"));
    assert!(report.contains("Last error:      EIO"));
    assert!(report.contains("Next feed:       2025-06-03 08:00:00"));
}
