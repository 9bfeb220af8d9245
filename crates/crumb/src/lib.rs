//! crumb: plays Cookie Clicker in a real Chromium window.
//!
//! The binary resolves an [`config::AppConfig`], bootstraps the persistent
//! browser profile, launches a [`surface::ChromiumSurface`] and hands it to the
//! `crumb-engine` supervisor.

pub mod cli;
pub mod config;
pub mod profile;
pub mod surface;
