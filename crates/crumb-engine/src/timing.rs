//! Persisted cadence parameters.
//!
//! Each parameter lives in its own file holding nothing but the decimal text
//! of the value (`0.0`, `3.0`). Writes replace the whole file through a
//! synced temporary sibling and a rename, so a crash leaves either the old
//! or the new value readable. The in-memory value is authoritative; the file is only a
//! durability mirror and is never read back while the process runs.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::TimingError;

/// File holding the sleep between upgrade purchase sweeps.
pub const UPGRADES_FILE: &str = "upgrades_click_sleep_time.txt";

/// File holding the sleep between product purchase sweeps.
pub const PRODUCTS_FILE: &str = "products_click_sleep_time.txt";

/// Value written when no cadence has been persisted yet.
pub const DEFAULT_CADENCE: f64 = 0.0;

/// Read the scalar at `path`, writing `default` first if nothing is there.
pub fn load_or_initialize(path: &Path, default: f64) -> Result<f64, TimingError> {
    if !path.exists() {
        persist(path, default)?;
    }
    let raw = std::fs::read_to_string(path).map_err(|source| TimingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_value(path, &raw)
}

/// Overwrite the scalar at `path` with `value`.
pub fn persist(path: &Path, value: f64) -> Result<(), TimingError> {
    check_value(path, value)?;
    let io_err = |source| TimingError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    let mut file = std::fs::File::create(&tmp).map_err(io_err)?;
    file.write_all(format_value(value).as_bytes()).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// Decimal text for a cadence value. Never uses exponent notation and
/// always carries a fractional part.
pub fn format_value(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

fn parse_value(path: &Path, raw: &str) -> Result<f64, TimingError> {
    let value: f64 = raw.trim().parse().map_err(|_| TimingError::Parse {
        path: path.to_path_buf(),
        raw: raw.to_string(),
    })?;
    check_value(path, value)?;
    Ok(value)
}

fn check_value(path: &Path, value: f64) -> Result<(), TimingError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TimingError::Invalid {
            path: path.to_path_buf(),
            value,
        })
    }
}

/// Which of the two cadence parameters a loop is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cadence {
    Upgrades,
    Products,
}

impl Cadence {
    pub fn file_name(self) -> &'static str {
        match self {
            Cadence::Upgrades => UPGRADES_FILE,
            Cadence::Products => PRODUCTS_FILE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cadence::Upgrades => "upgrades",
            Cadence::Products => "products",
        }
    }
}

/// One named, persisted, non-negative cadence value (seconds).
#[derive(Debug)]
pub struct TimingParameter {
    name: &'static str,
    path: PathBuf,
    value: Mutex<f64>,
}

impl TimingParameter {
    /// Load the parameter from `path`, initializing it to `default`.
    pub fn load(name: &'static str, path: PathBuf, default: f64) -> Result<Self, TimingError> {
        let value = load_or_initialize(&path, default)?;
        tracing::debug!(parameter = name, value, path = %path.display(), "cadence loaded");
        Ok(Self {
            name,
            path,
            value: Mutex::new(value),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current in-memory value in seconds.
    pub fn current(&self) -> f64 {
        *self.lock()
    }

    /// Current value as a sleep duration.
    pub fn current_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.current()).unwrap_or(Duration::MAX)
    }

    /// Add `step` and persist the result. The in-memory value only moves once
    /// the file write succeeded.
    pub fn increment(&self, step: f64) -> Result<f64, TimingError> {
        let mut value = self.lock();
        let next = *value + step;
        persist(&self.path, next)?;
        *value = next;
        Ok(next)
    }

    /// Replace the value and persist it.
    pub fn set(&self, next: f64) -> Result<(), TimingError> {
        let mut value = self.lock();
        persist(&self.path, next)?;
        *value = next;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, f64> {
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Both cadence parameters, shared between the clicker (writer) and the two
/// purchase loops (one reader each).
#[derive(Debug)]
pub struct TimingStore {
    upgrades: TimingParameter,
    products: TimingParameter,
}

impl TimingStore {
    /// Open or create both parameter files under `dir`.
    pub fn open(dir: &Path) -> Result<Self, TimingError> {
        std::fs::create_dir_all(dir).map_err(|source| TimingError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            upgrades: TimingParameter::load(
                Cadence::Upgrades.as_str(),
                dir.join(UPGRADES_FILE),
                DEFAULT_CADENCE,
            )?,
            products: TimingParameter::load(
                Cadence::Products.as_str(),
                dir.join(PRODUCTS_FILE),
                DEFAULT_CADENCE,
            )?,
        })
    }

    pub fn get(&self, cadence: Cadence) -> &TimingParameter {
        match cadence {
            Cadence::Upgrades => &self.upgrades,
            Cadence::Products => &self.products,
        }
    }

    pub fn upgrades(&self) -> &TimingParameter {
        &self.upgrades
    }

    pub fn products(&self) -> &TimingParameter {
        &self.products
    }

    /// Rewrite both parameters to the default cadence.
    pub fn reset(&self) -> Result<(), TimingError> {
        self.upgrades.set(DEFAULT_CADENCE)?;
        self.products.set(DEFAULT_CADENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_or_initialize_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upgrades.txt");

        let value = load_or_initialize(&path, 0.0).unwrap();
        assert_eq!(value, 0.0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0.0");
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.txt");

        let first = load_or_initialize(&path, 2.5).unwrap();
        let second = load_or_initialize(&path, 9.0).unwrap();
        assert_eq!(first, 2.5);
        assert_eq!(second, 2.5);
    }

    #[test]
    fn test_persist_replaces_whole_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence.txt");

        persist(&path, 12.0).unwrap();
        persist(&path, 3.0).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "3.0");
        assert!(!dir.path().join("cadence.txt.tmp").exists());
    }

    #[test]
    fn test_format_value_stays_plain_decimal() {
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(1e16), "10000000000000000.0");
        assert_eq!(format_value(1e-7), "0.0000001");
        for value in [1e16, 1e-7, 123.456, 3.0] {
            let text = format_value(value);
            assert!(!text.contains('e'), "{text}");
            assert_eq!(text.parse::<f64>().unwrap(), value);
        }
    }

    #[test]
    fn test_persist_large_value_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence.txt");
        persist(&path, 1e16).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "10000000000000000.0"
        );
        assert_eq!(load_or_initialize(&path, 0.0).unwrap(), 1e16);
    }

    #[test]
    fn test_accepts_surrounding_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence.txt");
        std::fs::write(&path, " 4.5\n").unwrap();
        assert_eq!(load_or_initialize(&path, 0.0).unwrap(), 4.5);
    }

    #[test]
    fn test_rejects_garbage_and_negative() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = dir.path().join("garbage.txt");
        std::fs::write(&garbage, "soon").unwrap();
        assert!(matches!(
            load_or_initialize(&garbage, 0.0),
            Err(TimingError::Parse { .. })
        ));

        let negative = dir.path().join("negative.txt");
        std::fs::write(&negative, "-1.0").unwrap();
        assert!(matches!(
            load_or_initialize(&negative, 0.0),
            Err(TimingError::Invalid { .. })
        ));

        assert!(persist(&dir.path().join("nan.txt"), f64::NAN).is_err());
    }

    #[test]
    fn test_increment_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimingStore::open(dir.path()).unwrap();

        assert_eq!(store.upgrades().increment(1.0).unwrap(), 1.0);
        assert_eq!(store.upgrades().increment(1.0).unwrap(), 2.0);
        assert_eq!(store.products().current(), 0.0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join(UPGRADES_FILE)).unwrap(),
            "2.0"
        );

        let reopened = TimingStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(Cadence::Upgrades).current(), 2.0);
        assert_eq!(
            reopened.get(Cadence::Upgrades).current_delay(),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_reset() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimingStore::open(dir.path()).unwrap();
        store.products().increment(5.0).unwrap();
        store.reset().unwrap();
        assert_eq!(store.products().current(), 0.0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join(PRODUCTS_FILE)).unwrap(),
            "0.0"
        );
    }
}
