//! Environment readiness check.

use anyhow::Result;

use crumb_engine::timing::{self, Cadence, DEFAULT_CADENCE};

use crate::config::{is_writable_location, AppConfig};
use crate::surface::find_chromium;

/// Check the browser binary, profile and state directories.
pub async fn run(config: &AppConfig) -> Result<()> {
    println!("crumb doctor");
    println!("============");
    println!();

    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!("URL:  {}", config.url);
    println!();

    let chromium_path = find_chromium(config.chrome.as_deref());
    match &chromium_path {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome or set CRUMB_CHROMIUM_PATH / --chrome."
        ),
    }

    let profile_path = config.profile_path();
    if profile_path.is_dir() {
        println!("[OK] Browser profile: {}", profile_path.display());
    } else if is_writable_location(&config.profile_dir) {
        println!(
            "[..] Browser profile will be created on first run: {}",
            profile_path.display()
        );
    } else {
        println!(
            "[!!] Browser data directory is not writable: {}",
            config.profile_dir.display()
        );
    }

    let mut state_ok = is_writable_location(&config.state_dir);
    if state_ok {
        println!("[OK] State directory: {}", config.state_dir.display());
    } else {
        println!(
            "[!!] State directory is not writable: {}",
            config.state_dir.display()
        );
    }
    for cadence in [Cadence::Upgrades, Cadence::Products] {
        let path = config.state_dir.join(cadence.file_name());
        if !path.exists() {
            continue;
        }
        match timing::load_or_initialize(&path, DEFAULT_CADENCE) {
            Ok(value) => println!("[OK] {} cadence: {value:.2}s", cadence.as_str()),
            Err(e) => {
                state_ok = false;
                println!("[!!] {e}. Run `crumb timings reset`.");
            }
        }
    }

    println!();
    if chromium_path.is_some() && state_ok {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
