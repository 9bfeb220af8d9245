//! Task supervisor: runs the four loops until interrupted.
//!
//! The supervisor acquires the cookie, spawns every loop as its own tokio task
//! and then only probes the session every few seconds. It stops on the
//! interrupt future, on a failed probe, or when a loop ends because the
//! session died. Shutdown signals cancellation, gives loops a short grace
//! period, aborts whatever is still running and closes the session once.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, SurfaceError};
use crate::events::{EngineEvent, EventBus};
use crate::loops::{
    drive, CookieClicker, EngineLoop, GoldenCookieWatcher, LoopSummary, PurchaseLoop,
};
use crate::surface::TargetSurface;
use crate::timing::TimingStore;

/// Why the supervisor stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The interrupt future resolved.
    Interrupted,
    /// A loop ended on its own, which only happens when the session is gone.
    LoopFailed { loop_name: String, error: String },
    /// The liveness probe found the session disconnected.
    ProbeFailed(String),
}

impl ShutdownReason {
    pub fn is_interrupt(&self) -> bool {
        matches!(self, ShutdownReason::Interrupted)
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupted => write!(f, "interrupted"),
            ShutdownReason::LoopFailed { loop_name, error } => {
                write!(f, "{loop_name} loop failed: {error}")
            }
            ShutdownReason::ProbeFailed(error) => write!(f, "liveness probe failed: {error}"),
        }
    }
}

type LoopExit = (&'static str, EngineResult<LoopSummary>);

pub struct Supervisor<S: TargetSurface> {
    surface: Arc<S>,
    timings: Arc<TimingStore>,
    events: Arc<EventBus>,
    config: EngineConfig,
}

impl<S: TargetSurface> Supervisor<S> {
    pub fn new(
        surface: Arc<S>,
        timings: Arc<TimingStore>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            surface,
            timings,
            events: Arc::new(EventBus::default()),
            config,
        })
    }

    /// Use an existing event bus instead of a private one.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// Run every loop until `interrupt` resolves or the session dies.
    ///
    /// The session is closed exactly once before returning, including when
    /// the cookie never showed up.
    pub async fn run<F>(self, interrupt: F) -> EngineResult<ShutdownReason>
    where
        F: Future<Output = ()>,
    {
        let cookie = match self
            .surface
            .wait_until_present(&self.config.cookie, self.config.reacquire_timeout)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(
                    selector = %self.config.cookie,
                    error = %e,
                    "cookie never appeared"
                );
                self.teardown().await;
                return Err(EngineError::Surface(e));
            }
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let mut tasks: JoinSet<LoopExit> = JoinSet::new();
        self.spawn_loop(
            &mut tasks,
            CookieClicker::new(
                Arc::clone(&self.surface),
                cookie,
                Arc::clone(&self.timings),
                self.events(),
                &self.config,
            ),
            &cancel_rx,
        );
        self.spawn_loop(
            &mut tasks,
            PurchaseLoop::upgrades(
                Arc::clone(&self.surface),
                Arc::clone(&self.timings),
                self.events(),
                &self.config,
            ),
            &cancel_rx,
        );
        self.spawn_loop(
            &mut tasks,
            PurchaseLoop::products(
                Arc::clone(&self.surface),
                Arc::clone(&self.timings),
                self.events(),
                &self.config,
            ),
            &cancel_rx,
        );
        self.spawn_loop(
            &mut tasks,
            GoldenCookieWatcher::new(Arc::clone(&self.surface), self.events(), &self.config),
            &cancel_rx,
        );
        tracing::info!(loops = tasks.len(), "engine running");

        let reason = self.watch(&mut tasks, interrupt).await;
        tracing::info!(%reason, "shutting down");
        self.events.emit(EngineEvent::ShutdownStarted {
            reason: reason.to_string(),
        });

        let _ = cancel_tx.send(true);
        let drained = tokio::time::timeout(self.config.shutdown_grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::debug!(remaining = tasks.len(), "aborting loops still in flight");
        }
        tasks.shutdown().await;

        self.teardown().await;
        Ok(reason)
    }

    fn spawn_loop<L: EngineLoop>(
        &self,
        tasks: &mut JoinSet<LoopExit>,
        engine_loop: L,
        cancel: &watch::Receiver<bool>,
    ) {
        let name = engine_loop.name();
        let cancel = cancel.clone();
        let events = self.events();
        tasks.spawn(async move { (name, drive(engine_loop, cancel, events).await) });
    }

    async fn watch<F>(&self, tasks: &mut JoinSet<LoopExit>, interrupt: F) -> ShutdownReason
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        let mut probe = tokio::time::interval(self.config.probe_interval);
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut interrupt => return ShutdownReason::Interrupted,
                _ = probe.tick() => match self.surface.probe().await {
                    Ok(title) => tracing::trace!(%title, "session alive"),
                    Err(SurfaceError::Disconnected(error)) => {
                        return ShutdownReason::ProbeFailed(error);
                    }
                    Err(e) => tracing::debug!(error = %e, "liveness probe failed"),
                },
                Some(joined) = tasks.join_next() => match joined {
                    Ok((loop_name, Err(e))) => {
                        return ShutdownReason::LoopFailed {
                            loop_name: loop_name.to_string(),
                            error: e.to_string(),
                        };
                    }
                    Ok((loop_name, Ok(summary))) => {
                        tracing::warn!(
                            loop_name,
                            steps = summary.steps,
                            "loop exited without cancellation"
                        );
                    }
                    Err(e) => {
                        return ShutdownReason::LoopFailed {
                            loop_name: "unknown".to_string(),
                            error: e.to_string(),
                        };
                    }
                },
            }
        }
    }

    async fn teardown(&self) {
        match self.surface.close().await {
            Ok(()) => tracing::info!("session closed"),
            Err(e) => tracing::warn!(error = %e, "session teardown failed"),
        }
    }
}
