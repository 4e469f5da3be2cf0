#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use fintrack_config::{Config, ConfigManager};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// A fresh base directory that outlives the test.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Config pointing its data directory at an isolated temp folder, plus a
/// manager that has already saved it.
pub fn setup_test_env(receipts: bool) -> (Config, ConfigManager) {
    let base = temp_base();
    let manager = ConfigManager::with_base_dir(base.clone()).expect("create config manager");

    let mut config = Config::default();
    config.data_dir = Some(base.join("data"));
    config.notifications.transaction_receipts = receipts;
    manager.save(&config).expect("save config");

    (config, manager)
}
