//! crumb-engine: concurrent polling and action engine for a live Cookie Clicker page.
//!
//! Four loops share one [`TargetSurface`]: a clicker hammering the big cookie,
//! two purchase loops sweeping the stores, and a detector for golden cookies.
//! The [`Supervisor`] runs them as independent tokio tasks.

pub mod config;
pub mod error;
pub mod events;
pub mod loops;
pub mod supervisor;
pub mod surface;
pub mod timing;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, SurfaceError, TimingError};
pub use events::{EngineEvent, EventBus};
pub use loops::{CookieClicker, EngineLoop, GoldenCookieWatcher, PurchaseLoop, StepReport};
pub use supervisor::{ShutdownReason, Supervisor};
pub use surface::{ActionOutcome, Selector, TargetSurface};
pub use timing::{Cadence, TimingParameter, TimingStore};
