//! `crumb run`: launch the browser and play until Ctrl-C.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast::error::RecvError;

use crumb_engine::{EngineEvent, EventBus, Supervisor, TimingStore};

use crate::config::AppConfig;
use crate::profile::{ensure_profile, first_run_notice, ProfileStatus};
use crate::surface::{ChromiumSurface, LaunchOptions};

pub async fn run(config: &AppConfig) -> Result<()> {
    println!("Don't forget to save your progress in Cookie Clicker (Ctrl+S) before closing the browser!");

    let timings = TimingStore::open(&config.state_dir).with_context(|| {
        format!(
            "failed to load cadences from {} (try `crumb timings reset`)",
            config.state_dir.display()
        )
    })?;
    tracing::info!(
        upgrades = timings.upgrades().current(),
        products = timings.products().current(),
        "cadences loaded"
    );

    if ensure_profile(&config.profile_dir, &config.profile)? == ProfileStatus::Created {
        println!("{}", first_run_notice(&config.profile));
    }

    let surface = ChromiumSurface::launch(&LaunchOptions::from(config)).await?;
    let events = Arc::new(EventBus::default());
    let supervisor = Supervisor::new(Arc::new(surface), Arc::new(timings), config.engine.clone())?
        .with_events(Arc::clone(&events));

    let reporter = tokio::spawn(report_events(Arc::clone(&events)));
    let reason = supervisor.run(interrupt()).await;
    reporter.abort();

    let reason = reason.context("engine failed to start")?;
    if !reason.is_interrupt() {
        bail!("engine stopped: {reason}");
    }
    println!("Stopped. Cadences saved in {}", config.state_dir.display());
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Print the user-facing subset of engine events.
async fn report_events(events: Arc<EventBus>) {
    let mut rx = events.subscribe();
    loop {
        match rx.recv().await {
            Ok(EngineEvent::GoldenCookieClicked { .. }) => println!("Golden cookie clicked!"),
            Ok(EngineEvent::CadenceRaised { parameter, value }) => {
                tracing::info!(%parameter, value, "purchase cadence raised");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "event reporter lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
