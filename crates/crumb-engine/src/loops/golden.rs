//! Rare-event detector: clicks golden cookies the moment they show up.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{EngineLoop, StepReport};
use crate::config::EngineConfig;
use crate::error::{settle, EngineResult};
use crate::events::{now_timestamp, EngineEvent, EventBus};
use crate::surface::{Selector, TargetSurface};

/// Lets a notification through only if `min_gap` passed since the last one.
#[derive(Debug, Clone)]
pub struct NoticeGate {
    min_gap: Duration,
    last: Option<Instant>,
}

impl NoticeGate {
    pub fn new(min_gap: Duration) -> Self {
        Self { min_gap, last: None }
    }

    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.min_gap => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

pub struct GoldenCookieWatcher<S: TargetSurface> {
    surface: Arc<S>,
    selector: Selector,
    wait: Duration,
    interval: Duration,
    gate: NoticeGate,
    events: Arc<EventBus>,
    clicks: u64,
}

impl<S: TargetSurface> GoldenCookieWatcher<S> {
    pub fn new(surface: Arc<S>, events: Arc<EventBus>, config: &EngineConfig) -> Self {
        Self {
            surface,
            selector: config.golden.clone(),
            wait: config.golden_wait,
            interval: config.golden_interval,
            gate: NoticeGate::new(config.notice_gap),
            events,
            clicks: 0,
        }
    }

    /// Golden cookies clicked so far.
    pub fn clicks(&self) -> u64 {
        self.clicks
    }
}

#[async_trait]
impl<S: TargetSurface> EngineLoop for GoldenCookieWatcher<S> {
    fn name(&self) -> &'static str {
        "golden"
    }

    async fn step(&mut self) -> EngineResult<StepReport> {
        let mut report = StepReport {
            pause: Some(self.interval),
            ..StepReport::default()
        };

        let found = self
            .surface
            .wait_until_present(&self.selector, self.wait)
            .await;
        let golden = match found {
            Ok(handle) => handle,
            Err(e) => {
                let outcome = settle::<()>(Err(e))?;
                tracing::trace!(outcome = outcome.as_str(), "no golden cookie");
                report.outcomes.push(outcome);
                return Ok(report);
            }
        };

        let outcome = settle(self.surface.activate(&golden).await)?;
        report.outcomes.push(outcome);
        if outcome.is_success() {
            self.clicks += 1;
            // Every golden cookie is clicked; only the log line is rate limited.
            if self.gate.admit(Instant::now()) {
                tracing::info!(total = self.clicks, "golden cookie clicked");
                self.events.emit(EngineEvent::GoldenCookieClicked {
                    timestamp: now_timestamp(),
                });
            }
        } else {
            tracing::trace!(outcome = outcome.as_str(), "golden cookie slipped away");
        }
        Ok(report)
    }
}
