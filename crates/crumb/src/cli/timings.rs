//! `crumb timings`: inspect or reset the persisted purchase cadences.

use std::path::Path;

use anyhow::{Context, Result};

use crumb_engine::timing::{self, Cadence, DEFAULT_CADENCE};
use crumb_engine::TimingStore;

const CADENCES: [Cadence; 2] = [Cadence::Upgrades, Cadence::Products];

pub fn show(state_dir: &Path) -> Result<()> {
    println!("State directory: {}", state_dir.display());
    for cadence in CADENCES {
        let path = state_dir.join(cadence.file_name());
        if !path.exists() {
            println!("  {:<9} {DEFAULT_CADENCE:>8.2}s  (not created yet)", cadence.as_str());
            continue;
        }
        match timing::load_or_initialize(&path, DEFAULT_CADENCE) {
            Ok(value) => println!("  {:<9} {value:>8.2}s  {}", cadence.as_str(), path.display()),
            Err(e) => println!("  {:<9} [!!] {e}", cadence.as_str()),
        }
    }
    Ok(())
}

pub fn reset(state_dir: &Path) -> Result<()> {
    match TimingStore::open(state_dir) {
        Ok(store) => store.reset()?,
        // Unreadable files cannot be opened, so overwrite them directly.
        Err(e) => {
            tracing::debug!(error = %e, "overwriting unreadable cadence files");
            for cadence in CADENCES {
                let path = state_dir.join(cadence.file_name());
                timing::persist(&path, DEFAULT_CADENCE)
                    .with_context(|| format!("failed to reset {}", path.display()))?;
            }
        }
    }
    println!("Cadences reset to {DEFAULT_CADENCE:.1}s in {}", state_dir.display());
    Ok(())
}
