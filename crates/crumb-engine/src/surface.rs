//! Target surface abstraction.
//!
//! Defines the [`TargetSurface`] trait the loops consume. A surface wraps a
//! live element tree that mutates without notice: every handle it returns may
//! go stale before it is used, and every call reports failure explicitly
//! instead of retrying.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::SurfaceError;

/// How often the default presence wait re-queries the surface.
pub const PRESENCE_POLL: Duration = Duration::from_millis(25);

/// How often the default clickability wait re-checks a handle.
pub const CLICKABLE_POLL: Duration = Duration::from_millis(20);

/// A CSS selector addressing elements on the surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector(String);

impl Selector {
    pub fn css(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one attempted interaction with an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Success,
    Stale,
    NotFound,
    NotInteractable,
    TimedOut,
}

impl ActionOutcome {
    pub fn is_success(self) -> bool {
        self == ActionOutcome::Success
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionOutcome::Success => "success",
            ActionOutcome::Stale => "stale",
            ActionOutcome::NotFound => "not_found",
            ActionOutcome::NotInteractable => "not_interactable",
            ActionOutcome::TimedOut => "timed_out",
        }
    }
}

/// A live element tree that can be queried and acted on.
#[async_trait]
pub trait TargetSurface: Send + Sync + 'static {
    /// Opaque reference to one element. Valid until the element detaches.
    type Handle: Send + Sync + 'static;

    /// Find the first element matching `selector`.
    async fn locate_one(&self, selector: &Selector) -> Result<Self::Handle, SurfaceError>;

    /// Find every element matching `selector`, in document order.
    async fn locate_all(&self, selector: &Selector) -> Result<Vec<Self::Handle>, SurfaceError>;

    /// Whether the element is visible and enabled right now.
    async fn is_clickable(&self, handle: &Self::Handle) -> Result<bool, SurfaceError>;

    /// Click the element.
    async fn activate(&self, handle: &Self::Handle) -> Result<(), SurfaceError>;

    /// Bring the element into the viewport. Best effort.
    async fn scroll_into_view(&self, handle: &Self::Handle);

    /// Read a trivial property of the session to prove it is still usable.
    async fn probe(&self) -> Result<String, SurfaceError>;

    /// Tear the session down.
    async fn close(&self) -> Result<(), SurfaceError>;

    /// Poll [`locate_one`](Self::locate_one) until an element appears or
    /// `timeout` elapses.
    async fn wait_until_present(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Self::Handle, SurfaceError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.locate_one(selector).await {
                Ok(handle) => return Ok(handle),
                Err(SurfaceError::NotFound(_)) | Err(SurfaceError::Stale) => {}
                Err(e) => return Err(e),
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(SurfaceError::TimedOut {
                    what: format!("presence of {selector}"),
                    after: timeout,
                });
            }
            tokio::time::sleep(PRESENCE_POLL.min(deadline - now)).await;
        }
    }

    /// Poll [`is_clickable`](Self::is_clickable) until the element can be
    /// clicked or `timeout` elapses. Fails with `Stale` if it detaches.
    async fn wait_until_clickable(
        &self,
        handle: Self::Handle,
        timeout: Duration,
    ) -> Result<Self::Handle, SurfaceError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_clickable(&handle).await? {
                return Ok(handle);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(SurfaceError::TimedOut {
                    what: "element to become clickable".to_string(),
                    after: timeout,
                });
            }
            tokio::time::sleep(CLICKABLE_POLL.min(deadline - now)).await;
        }
    }
}
