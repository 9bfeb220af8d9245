//! Engine tuning: selectors, intervals and drift probabilities.

use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::surface::Selector;

/// The big cookie clicked by the primary loop.
pub const COOKIE_SELECTOR: &str = "#bigCookie";
/// Golden cookies and other shimmers.
pub const GOLDEN_SELECTOR: &str = ".shimmer";
/// Affordable upgrades in the top store row.
pub const UPGRADES_SELECTOR: &str = ".crate.upgrade.enabled";
/// Affordable, unlocked buildings in the store list.
pub const PRODUCTS_SELECTOR: &str = ".product.unlocked.enabled";

const DEFAULT_GOLDEN_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_NOTICE_GAP: Duration = Duration::from_secs(1);
const DEFAULT_REACQUIRE_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(250);
const DEFAULT_DRIFT_STEP_SECS: f64 = 1.0;
const DEFAULT_DRIFT_PROBABILITY: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cookie: Selector,
    pub golden: Selector,
    pub upgrades: Selector,
    pub products: Selector,
    /// Pause between golden cookie scans.
    pub golden_interval: Duration,
    /// How long one golden cookie scan waits for the element.
    pub golden_wait: Duration,
    /// Minimum gap between two golden cookie notifications.
    pub notice_gap: Duration,
    /// How long a purchase waits for an item to become clickable.
    pub click_wait: Duration,
    /// Bound on re-finding the big cookie after it went stale.
    pub reacquire_timeout: Duration,
    /// Seconds added to a cadence on each drift.
    pub drift_step: f64,
    pub upgrade_drift_probability: f64,
    pub product_drift_probability: f64,
    /// Interval of the supervisor's liveness probe.
    pub probe_interval: Duration,
    /// How long loops get to wind down before they are aborted.
    pub shutdown_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cookie: Selector::css(COOKIE_SELECTOR),
            golden: Selector::css(GOLDEN_SELECTOR),
            upgrades: Selector::css(UPGRADES_SELECTOR),
            products: Selector::css(PRODUCTS_SELECTOR),
            golden_interval: DEFAULT_GOLDEN_INTERVAL,
            golden_wait: DEFAULT_GOLDEN_INTERVAL,
            notice_gap: DEFAULT_NOTICE_GAP,
            click_wait: DEFAULT_GOLDEN_INTERVAL * 10,
            reacquire_timeout: DEFAULT_REACQUIRE_TIMEOUT,
            drift_step: DEFAULT_DRIFT_STEP_SECS,
            upgrade_drift_probability: DEFAULT_DRIFT_PROBABILITY,
            product_drift_probability: DEFAULT_DRIFT_PROBABILITY,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl EngineConfig {
    /// Change the golden cookie interval and the click wait derived from it.
    pub fn with_golden_interval(mut self, interval: Duration) -> Self {
        self.golden_interval = interval;
        self.golden_wait = interval;
        self.click_wait = interval * 10;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        for (name, p) in [
            ("upgrade_drift_probability", self.upgrade_drift_probability),
            ("product_drift_probability", self.product_drift_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(EngineError::Config(format!(
                    "{name} must be within [0, 1], got {p}"
                )));
            }
        }
        if !self.drift_step.is_finite() || self.drift_step < 0.0 {
            return Err(EngineError::Config(format!(
                "drift_step must be a non-negative number of seconds, got {}",
                self.drift_step
            )));
        }
        if self.probe_interval.is_zero() {
            return Err(EngineError::Config("probe_interval must be non-zero".into()));
        }
        Ok(())
    }
}
