//! The four engine loops and the driver that runs them.
//!
//! A loop only knows how to do one step. The driver calls `step` repeatedly,
//! sleeps for whatever pause the step asked for, and stops when cancelled or
//! when a step reports that the session is gone.

pub mod clicker;
pub mod driver;
pub mod golden;
pub mod purchase;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{EngineResult, SurfaceError};
use crate::surface::ActionOutcome;

pub use clicker::CookieClicker;
pub use driver::{drive, LoopSummary};
pub use golden::{GoldenCookieWatcher, NoticeGate};
pub use purchase::PurchaseLoop;

/// What one step did and how long to wait before the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// One outcome per attempted interaction, in attempt order.
    pub outcomes: Vec<ActionOutcome>,
    /// Set when a purchase loop could not enumerate its collection.
    pub enumeration_failure: Option<SurfaceError>,
    /// Pause requested before the next step. `None` means go again at once.
    pub pause: Option<Duration>,
}

impl StepReport {
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}

/// One concurrently running engine loop.
#[async_trait]
pub trait EngineLoop: Send + 'static {
    fn name(&self) -> &'static str;

    /// Run one iteration. Only a lost session is returned as an error.
    async fn step(&mut self) -> EngineResult<StepReport>;
}
