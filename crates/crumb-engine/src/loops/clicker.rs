//! Primary action loop: clicks the big cookie as fast as the surface allows.
//!
//! The loop keeps a single long-lived handle to the cookie and only goes back
//! to the surface for a new one after a click reported `Stale`. Every
//! iteration also rolls two independent dice that may nudge the purchase
//! cadences upward, so purchase sweeps slow down over time while the click
//! rate stays flat.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{EngineLoop, StepReport};
use crate::config::EngineConfig;
use crate::error::{settle, EngineResult};
use crate::events::{EngineEvent, EventBus};
use crate::surface::{ActionOutcome, Selector, TargetSurface};
use crate::timing::{Cadence, TimingStore};

/// Probability and size of the upward cadence drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftPolicy {
    pub step: f64,
    pub upgrade_probability: f64,
    pub product_probability: f64,
}

impl DriftPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            step: config.drift_step,
            upgrade_probability: config.upgrade_drift_probability,
            product_probability: config.product_drift_probability,
        }
    }

    /// Force both probabilities into `[0, 1]`; NaN counts as never.
    pub fn clamped(self) -> Self {
        Self {
            upgrade_probability: clamp_probability(self.upgrade_probability),
            product_probability: clamp_probability(self.product_probability),
            ..self
        }
    }

    /// A policy that never drifts.
    pub fn frozen() -> Self {
        Self {
            step: 0.0,
            upgrade_probability: 0.0,
            product_probability: 0.0,
        }
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

pub struct CookieClicker<S: TargetSurface> {
    surface: Arc<S>,
    selector: Selector,
    target: S::Handle,
    reacquire_timeout: Duration,
    timings: Arc<TimingStore>,
    drift: DriftPolicy,
    rng: StdRng,
    events: Arc<EventBus>,
}

impl<S: TargetSurface> CookieClicker<S> {
    /// Build a clicker around an already acquired cookie handle.
    pub fn new(
        surface: Arc<S>,
        target: S::Handle,
        timings: Arc<TimingStore>,
        events: Arc<EventBus>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            surface,
            selector: config.cookie.clone(),
            target,
            reacquire_timeout: config.reacquire_timeout,
            timings,
            drift: DriftPolicy::from_config(config).clamped(),
            rng: StdRng::from_entropy(),
            events,
        }
    }

    pub fn with_drift(mut self, drift: DriftPolicy) -> Self {
        self.drift = drift.clamped();
        self
    }

    /// Replace the random source, for reproducible drift.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    async fn reacquire(&mut self) -> EngineResult<Option<ActionOutcome>> {
        match self
            .surface
            .wait_until_present(&self.selector, self.reacquire_timeout)
            .await
        {
            Ok(handle) => {
                self.target = handle;
                tracing::debug!(selector = %self.selector, "click target reacquired");
                self.events.emit(EngineEvent::TargetReacquired {
                    selector: self.selector.to_string(),
                });
                Ok(None)
            }
            Err(e) => {
                tracing::debug!(selector = %self.selector, error = %e, "click target still missing");
                settle::<()>(Err(e)).map(Some)
            }
        }
    }

    fn maybe_drift(&mut self, cadence: Cadence, probability: f64) {
        if !self.rng.gen_bool(probability) {
            return;
        }
        let parameter = self.timings.get(cadence);
        match parameter.increment(self.drift.step) {
            Ok(value) => {
                tracing::debug!(parameter = parameter.name(), value, "cadence raised");
                self.events.emit(EngineEvent::CadenceRaised {
                    parameter: parameter.name().to_string(),
                    value,
                });
            }
            Err(e) => {
                tracing::warn!(parameter = parameter.name(), error = %e, "failed to persist cadence");
            }
        }
    }
}

#[async_trait]
impl<S: TargetSurface> EngineLoop for CookieClicker<S> {
    fn name(&self) -> &'static str {
        "clicker"
    }

    async fn step(&mut self) -> EngineResult<StepReport> {
        let outcome = settle(self.surface.activate(&self.target).await)?;
        let mut outcomes = vec![outcome];
        if outcome == ActionOutcome::Stale {
            if let Some(failed) = self.reacquire().await? {
                outcomes.push(failed);
            }
        }

        // Two independent draws, one per cadence.
        self.maybe_drift(Cadence::Upgrades, self.drift.upgrade_probability);
        self.maybe_drift(Cadence::Products, self.drift.product_probability);

        Ok(StepReport {
            outcomes,
            enumeration_failure: None,
            pause: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_keeps_valid_probabilities() {
        let policy = DriftPolicy {
            step: 2.0,
            upgrade_probability: 0.25,
            product_probability: 1.0,
        };
        assert_eq!(policy.clamped(), policy);
    }

    #[test]
    fn test_clamped_bounds_out_of_range_probabilities() {
        let policy = DriftPolicy {
            step: 1.0,
            upgrade_probability: 1.5,
            product_probability: -0.2,
        }
        .clamped();
        assert_eq!(policy.upgrade_probability, 1.0);
        assert_eq!(policy.product_probability, 0.0);
        assert_eq!(policy.step, 1.0);

        let nan = DriftPolicy {
            step: 1.0,
            upgrade_probability: f64::NAN,
            product_probability: f64::NAN,
        }
        .clamped();
        assert_eq!(nan.upgrade_probability, 0.0);
        assert_eq!(nan.product_probability, 0.0);

        // gen_bool panics outside [0, 1].
        let mut rng = StdRng::seed_from_u64(1);
        assert!(rng.gen_bool(policy.upgrade_probability));
        assert!(!rng.gen_bool(policy.product_probability));
    }
}
