//! Batch purchase loop, shared by the upgrade and product stores.
//!
//! Each cycle enumerates every affordable item, buys them newest first, then
//! sleeps for the owned cadence. The cadence is read after the sweep, so a
//! drift written by the clicker mid-cycle applies to the very next sleep.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{EngineLoop, StepReport};
use crate::config::EngineConfig;
use crate::error::{settle, EngineError, EngineResult, SurfaceError};
use crate::events::{EngineEvent, EventBus};
use crate::surface::{ActionOutcome, Selector, TargetSurface};
use crate::timing::{Cadence, TimingStore};

pub struct PurchaseLoop<S: TargetSurface> {
    name: &'static str,
    surface: Arc<S>,
    selector: Selector,
    cadence: Cadence,
    timings: Arc<TimingStore>,
    click_wait: Duration,
    events: Arc<EventBus>,
}

impl<S: TargetSurface> PurchaseLoop<S> {
    pub fn new(
        name: &'static str,
        surface: Arc<S>,
        selector: Selector,
        cadence: Cadence,
        timings: Arc<TimingStore>,
        click_wait: Duration,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            name,
            surface,
            selector,
            cadence,
            timings,
            click_wait,
            events,
        }
    }

    /// The loop buying upgrades, paced by the upgrade cadence.
    pub fn upgrades(
        surface: Arc<S>,
        timings: Arc<TimingStore>,
        events: Arc<EventBus>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(
            "upgrades",
            surface,
            config.upgrades.clone(),
            Cadence::Upgrades,
            timings,
            config.click_wait,
            events,
        )
    }

    /// The loop buying buildings, paced by the product cadence.
    pub fn products(
        surface: Arc<S>,
        timings: Arc<TimingStore>,
        events: Arc<EventBus>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(
            "products",
            surface,
            config.products.clone(),
            Cadence::Products,
            timings,
            config.click_wait,
            events,
        )
    }

    async fn buy(&self, item: S::Handle) -> EngineResult<ActionOutcome> {
        self.surface.scroll_into_view(&item).await;
        let ready = match self
            .surface
            .wait_until_clickable(item, self.click_wait)
            .await
        {
            Ok(ready) => ready,
            Err(e) => return settle::<()>(Err(e)),
        };
        settle(self.surface.activate(&ready).await)
    }

    fn report_enumeration_failure(&self, error: &SurfaceError) {
        tracing::warn!(
            loop_name = self.name,
            selector = %self.selector,
            error = %error,
            "failed to enumerate purchasable items"
        );
        self.events.emit(EngineEvent::EnumerationFailed {
            loop_name: self.name.to_string(),
            selector: self.selector.to_string(),
            error: error.to_string(),
        });
    }
}

#[async_trait]
impl<S: TargetSurface> EngineLoop for PurchaseLoop<S> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn step(&mut self) -> EngineResult<StepReport> {
        let mut report = StepReport::default();

        match self.surface.locate_all(&self.selector).await {
            Ok(items) => {
                for item in items.into_iter().rev() {
                    let outcome = self.buy(item).await?;
                    if !outcome.is_success() {
                        tracing::trace!(
                            loop_name = self.name,
                            outcome = outcome.as_str(),
                            "skipped item"
                        );
                    }
                    report.outcomes.push(outcome);
                }
            }
            Err(SurfaceError::Disconnected(message)) => {
                return Err(EngineError::SessionLost(message));
            }
            Err(e) => {
                self.report_enumeration_failure(&e);
                report.enumeration_failure = Some(e);
            }
        }

        // Read after the sweep so a drift that happened meanwhile applies now.
        report.pause = Some(self.timings.get(self.cadence).current_delay());
        Ok(report)
    }
}
