//! Configuration loading and resolution.
//!
//! Every setting resolves as command-line flag, then `CRUMB_*` environment
//! variable, then a default under `~/.crumb`. The browser profile location
//! also accepts the older `CHROME_DATA_DIR` / `CHROME_PROFILE` names, which
//! is what existing `.env` files carry.

use std::path::{Path, PathBuf};

use crumb_engine::EngineConfig;

/// Game page opened on launch.
pub const DEFAULT_URL: &str = "https://orteil.dashnet.org/cookieclicker/";

/// Chromium profile name inside the user data directory.
pub const DEFAULT_PROFILE: &str = "Default";

pub const ENV_STATE_DIR: &str = "CRUMB_STATE_DIR";
pub const ENV_PROFILE_DIR: &str = "CRUMB_PROFILE_DIR";
pub const ENV_PROFILE: &str = "CRUMB_PROFILE";
pub const ENV_CHROMIUM_PATH: &str = "CRUMB_CHROMIUM_PATH";
pub const ENV_URL: &str = "CRUMB_URL";
pub const ENV_HEADLESS: &str = "CRUMB_HEADLESS";
pub const ENV_CLICK_STEP_SECS: &str = "CRUMB_CLICK_STEP_SECS";
pub const ENV_DRIFT_PROBABILITY: &str = "CRUMB_DRIFT_PROBABILITY";

/// Fallback for [`ENV_PROFILE_DIR`].
pub const ENV_CHROME_DATA_DIR: &str = "CHROME_DATA_DIR";
/// Fallback for [`ENV_PROFILE`].
pub const ENV_CHROME_PROFILE: &str = "CHROME_PROFILE";

/// Values given on the command line. `None` falls through to the environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub state_dir: Option<PathBuf>,
    pub profile_dir: Option<PathBuf>,
    pub profile: Option<String>,
    pub chrome: Option<PathBuf>,
    pub url: Option<String>,
    pub headless: bool,
}

/// Fully resolved application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the two cadence files.
    pub state_dir: PathBuf,
    /// Chromium `--user-data-dir`.
    pub profile_dir: PathBuf,
    /// Chromium `--profile-directory`.
    pub profile: String,
    /// Explicit browser binary; discovered when absent.
    pub chrome: Option<PathBuf>,
    pub url: String,
    pub headless: bool,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: &CliOverrides) -> Self {
        Self::resolve_with(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn resolve_with<F>(overrides: &CliOverrides, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = crumb_home();

        let state_dir = overrides
            .state_dir
            .clone()
            .or_else(|| read_env_string(&env, ENV_STATE_DIR).map(|v| expand_tilde(&v)))
            .unwrap_or_else(|| home.clone());
        let profile_dir = overrides
            .profile_dir
            .clone()
            .or_else(|| read_env_string(&env, ENV_PROFILE_DIR).map(|v| expand_tilde(&v)))
            .or_else(|| read_env_string(&env, ENV_CHROME_DATA_DIR).map(|v| expand_tilde(&v)))
            .unwrap_or_else(|| home.join("chrome-profile"));
        let profile = overrides
            .profile
            .clone()
            .or_else(|| read_env_string(&env, ENV_PROFILE))
            .or_else(|| read_env_string(&env, ENV_CHROME_PROFILE))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let chrome = overrides
            .chrome
            .clone()
            .or_else(|| read_env_string(&env, ENV_CHROMIUM_PATH).map(|v| expand_tilde(&v)));
        let url = overrides
            .url
            .clone()
            .or_else(|| read_env_string(&env, ENV_URL))
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        let headless = overrides.headless || read_env_bool(&env, ENV_HEADLESS, false);

        let mut engine = EngineConfig::default();
        engine.drift_step = read_env_f64(&env, ENV_CLICK_STEP_SECS, engine.drift_step);
        let probability = read_env_f64(
            &env,
            ENV_DRIFT_PROBABILITY,
            engine.upgrade_drift_probability,
        );
        engine.upgrade_drift_probability = probability;
        engine.product_drift_probability = probability;

        Self {
            state_dir,
            profile_dir,
            profile,
            chrome,
            url,
            headless,
            engine,
        }
    }

    /// Directory Chromium actually writes the named profile into.
    pub fn profile_path(&self) -> PathBuf {
        self.profile_dir.join(&self.profile)
    }
}

/// `~/.crumb`, or `./.crumb` when there is no home directory.
pub fn crumb_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".crumb")
}

/// Expand a leading `~/` in user-supplied paths.
pub fn expand_tilde(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

/// Whether `dir` exists or could be created by us.
pub fn is_writable_location(dir: &Path) -> bool {
    let mut cursor = Some(dir);
    while let Some(path) = cursor {
        if path.exists() {
            return std::fs::metadata(path)
                .map(|m| m.is_dir() && !m.permissions().readonly())
                .unwrap_or(false);
        }
        cursor = path.parent();
    }
    false
}

fn read_env_string<F>(env: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_env_f64<F>(env: &F, name: &str, default_value: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    read_env_string(env, name)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default_value)
}

fn read_env_bool<F>(env: &F, name: &str, default_value: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match read_env_string(env, name).as_deref() {
        Some("1") | Some("true") | Some("yes") | Some("on") => true,
        Some("0") | Some("false") | Some("no") | Some("off") => false,
        _ => default_value,
    }
}
