//! State directory handling through the public app API.

use crumb::cli::timings;
use crumb::config::{AppConfig, CliOverrides};
use crumb::profile::{ensure_profile, ProfileStatus};
use crumb_engine::timing::{PRODUCTS_FILE, UPGRADES_FILE};
use crumb_engine::TimingStore;

fn config_in(dir: &std::path::Path) -> AppConfig {
    let overrides = CliOverrides {
        state_dir: Some(dir.join("state")),
        profile_dir: Some(dir.join("chrome")),
        ..CliOverrides::default()
    };
    AppConfig::resolve_with(&overrides, |_| None)
}

#[test]
fn test_01_first_run_creates_both_cadence_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let store = TimingStore::open(&config.state_dir).unwrap();
    assert_eq!(store.upgrades().current(), 0.0);

    for file in [UPGRADES_FILE, PRODUCTS_FILE] {
        let raw = std::fs::read_to_string(config.state_dir.join(file)).unwrap();
        assert_eq!(raw, "0.0");
    }
}

#[test]
fn test_02_drift_survives_restart_until_reset() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    {
        let store = TimingStore::open(&config.state_dir).unwrap();
        store.upgrades().increment(1.0).unwrap();
        store.upgrades().increment(1.0).unwrap();
    }
    let reopened = TimingStore::open(&config.state_dir).unwrap();
    assert_eq!(reopened.upgrades().current(), 2.0);
    assert_eq!(reopened.products().current(), 0.0);

    timings::reset(&config.state_dir).unwrap();
    let after = TimingStore::open(&config.state_dir).unwrap();
    assert_eq!(after.upgrades().current(), 0.0);
}

#[test]
fn test_03_profile_is_created_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    assert_eq!(
        ensure_profile(&config.profile_dir, &config.profile).unwrap(),
        ProfileStatus::Created
    );
    // Chromium creates the profile directory on first launch.
    std::fs::create_dir_all(config.profile_path()).unwrap();
    assert_eq!(
        ensure_profile(&config.profile_dir, &config.profile).unwrap(),
        ProfileStatus::Existing
    );
    assert_eq!(config.profile_path(), dir.path().join("chrome").join("Default"));
    assert_eq!(config.state_dir, dir.path().join("state"));
}
