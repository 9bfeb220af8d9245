//! CLI subcommand implementations for the crumb binary.

pub mod doctor;
pub mod run;
pub mod timings;
