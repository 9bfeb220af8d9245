//! Error types for the surface adapter, the timing store and the engine.

use std::path::PathBuf;
use std::time::Duration;

use crate::surface::ActionOutcome;

/// Failures reported by a [`TargetSurface`](crate::surface::TargetSurface).
///
/// Everything except [`SurfaceError::Disconnected`] is recoverable and is
/// absorbed by the loop that issued the call.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("element is no longer attached to the page")]
    Stale,

    #[error("no element matches {0}")]
    NotFound(String),

    #[error("element is not interactable: {0}")]
    NotInteractable(String),

    #[error("timed out after {after:?} waiting for {what}")]
    TimedOut { what: String, after: Duration },

    #[error("browser session disconnected: {0}")]
    Disconnected(String),
}

impl SurfaceError {
    /// The action outcome this failure maps to, or `None` when the session
    /// itself is gone.
    pub fn outcome(&self) -> Option<ActionOutcome> {
        match self {
            SurfaceError::Stale => Some(ActionOutcome::Stale),
            SurfaceError::NotFound(_) => Some(ActionOutcome::NotFound),
            SurfaceError::NotInteractable(_) => Some(ActionOutcome::NotInteractable),
            SurfaceError::TimedOut { .. } => Some(ActionOutcome::TimedOut),
            SurfaceError::Disconnected(_) => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, SurfaceError::Disconnected(_))
    }
}

/// Failures reading or writing a persisted cadence value.
#[derive(thiserror::Error, Debug)]
pub enum TimingError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} does not hold a decimal value: {raw:?}", path.display())]
    Parse { path: PathBuf, raw: String },

    #[error("{} holds an invalid cadence {value}", path.display())]
    Invalid { path: PathBuf, value: f64 },
}

/// Errors that stop a loop or the supervisor.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("session lost: {0}")]
    SessionLost(String),

    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Timing(#[from] TimingError),

    #[error("invalid engine configuration: {0}")]
    Config(String),
}

/// Convenience result type.
pub type EngineResult<T> = Result<T, EngineError>;

/// Fold a surface call into an [`ActionOutcome`], letting only a lost
/// session escape.
pub(crate) fn settle<T>(result: Result<T, SurfaceError>) -> EngineResult<ActionOutcome> {
    match result {
        Ok(_) => Ok(ActionOutcome::Success),
        Err(SurfaceError::Disconnected(message)) => Err(EngineError::SessionLost(message)),
        Err(e) => Ok(e.outcome().unwrap_or(ActionOutcome::NotInteractable)),
    }
}
