//! Persistent Chromium profile bootstrap.

use std::path::Path;

use anyhow::{Context, Result};

/// What `ensure_profile` found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    /// The profile did not exist; the user still has to log in once.
    Created,
    Existing,
}

/// Make sure `user_data_dir` exists and report whether `profile` was already in it.
///
/// Chromium fills the profile directory itself on first launch, so only the
/// parent is created here.
pub fn ensure_profile(user_data_dir: &Path, profile: &str) -> Result<ProfileStatus> {
    let profile_path = user_data_dir.join(profile);
    if profile_path.is_dir() {
        tracing::debug!(path = %profile_path.display(), "reusing browser profile");
        return Ok(ProfileStatus::Existing);
    }

    std::fs::create_dir_all(user_data_dir).with_context(|| {
        format!(
            "failed to create browser data directory {}",
            user_data_dir.display()
        )
    })?;
    tracing::info!(path = %profile_path.display(), "creating browser profile");
    Ok(ProfileStatus::Created)
}

/// One-time setup hint printed for a fresh profile.
pub fn first_run_notice(profile: &str) -> String {
    format!(
        "Creating browser profile '{profile}'.\n\
         Log in and accept the Cookie Clicker cookie banner in the opened window.\n\
         This only has to be done once; later runs reuse the profile."
    )
}
