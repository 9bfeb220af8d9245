//! Scripted in-memory surface shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crumb_engine::{EngineConfig, Selector, SurfaceError, TargetSurface, TimingStore};

/// Every call the engine makes, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    LocateOne(String),
    LocateAll(String),
    WaitPresent(String),
    WaitClickable(String),
    Activate(String),
    Scroll(String),
    Probe,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeHandle(pub String);

#[derive(Default)]
struct Script {
    /// Selector → element that is always there.
    fixed: HashMap<String, String>,
    /// Selector → elements handed out once each, before falling back to `fixed`.
    appearances: HashMap<String, VecDeque<String>>,
    /// Selector → collection returned by `locate_all`.
    collections: HashMap<String, Result<Vec<String>, SurfaceError>>,
    /// Elements whose activation always reports `Stale`.
    stale: HashSet<String>,
    /// Elements whose next activation reports `Stale`, once.
    stale_once: HashSet<String>,
    /// Elements that never become clickable.
    never_clickable: HashSet<String>,
    disconnected: bool,
    /// Only the liveness check sees the session as gone.
    liveness_lost: bool,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeSurface {
    script: Mutex<Script>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        f(&mut self.script.lock().unwrap())
    }

    pub fn fixed(self, selector: &str, id: &str) -> Self {
        self.with(|s| s.fixed.insert(selector.into(), id.into()));
        self
    }

    pub fn appears(self, selector: &str, ids: &[&str]) -> Self {
        self.with(|s| {
            s.appearances
                .entry(selector.into())
                .or_default()
                .extend(ids.iter().map(|id| id.to_string()))
        });
        self
    }

    pub fn collection(self, selector: &str, ids: &[&str]) -> Self {
        let ids = ids.iter().map(|id| id.to_string()).collect();
        self.with(|s| s.collections.insert(selector.into(), Ok(ids)));
        self
    }

    pub fn failing_collection(self, selector: &str, error: SurfaceError) -> Self {
        self.with(|s| s.collections.insert(selector.into(), Err(error)));
        self
    }

    pub fn stale(self, id: &str) -> Self {
        self.with(|s| s.stale.insert(id.into()));
        self
    }

    pub fn stale_once(self, id: &str) -> Self {
        self.with(|s| s.stale_once.insert(id.into()));
        self
    }

    pub fn never_clickable(self, id: &str) -> Self {
        self.with(|s| s.never_clickable.insert(id.into()));
        self
    }

    pub fn disconnect(&self) {
        self.with(|s| s.disconnected = true);
    }

    pub fn lose_liveness(&self) {
        self.with(|s| s.liveness_lost = true);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    /// Ids passed to `activate`, in order.
    pub fn activations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Activate(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|c| *c == wanted).count()
    }

    pub fn close_count(&self) -> usize {
        self.count(&Call::Close)
    }

    fn record(&self, call: Call) -> Result<(), SurfaceError> {
        self.with(|s| {
            s.calls.push(call);
            if s.disconnected {
                Err(SurfaceError::Disconnected("fake session closed".into()))
            } else {
                Ok(())
            }
        })
    }

    fn find(&self, selector: &Selector) -> Result<FakeHandle, SurfaceError> {
        self.with(|s| {
            let key = selector.as_str();
            if let Some(id) = s.appearances.get_mut(key).and_then(|q| q.pop_front()) {
                return Ok(FakeHandle(id));
            }
            s.fixed
                .get(key)
                .cloned()
                .map(FakeHandle)
                .ok_or_else(|| SurfaceError::NotFound(key.to_string()))
        })
    }
}

#[async_trait]
impl TargetSurface for FakeSurface {
    type Handle = FakeHandle;

    async fn locate_one(&self, selector: &Selector) -> Result<FakeHandle, SurfaceError> {
        self.record(Call::LocateOne(selector.to_string()))?;
        self.find(selector)
    }

    async fn locate_all(&self, selector: &Selector) -> Result<Vec<FakeHandle>, SurfaceError> {
        self.record(Call::LocateAll(selector.to_string()))?;
        self.with(|s| match s.collections.get(selector.as_str()) {
            Some(Ok(ids)) => Ok(ids.iter().cloned().map(FakeHandle).collect()),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(Vec::new()),
        })
    }

    async fn is_clickable(&self, handle: &FakeHandle) -> Result<bool, SurfaceError> {
        Ok(!self.with(|s| s.never_clickable.contains(&handle.0)))
    }

    async fn activate(&self, handle: &FakeHandle) -> Result<(), SurfaceError> {
        self.record(Call::Activate(handle.0.clone()))?;
        self.with(|s| {
            if s.stale.contains(&handle.0) || s.stale_once.remove(&handle.0) {
                Err(SurfaceError::Stale)
            } else {
                Ok(())
            }
        })
    }

    async fn scroll_into_view(&self, handle: &FakeHandle) {
        let _ = self.record(Call::Scroll(handle.0.clone()));
    }

    async fn probe(&self) -> Result<String, SurfaceError> {
        self.record(Call::Probe)?;
        if self.with(|s| s.liveness_lost) {
            return Err(SurfaceError::Disconnected("renderer crashed".into()));
        }
        Ok("Cookie Clicker".to_string())
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        self.with(|s| s.calls.push(Call::Close));
        Ok(())
    }

    async fn wait_until_present(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<FakeHandle, SurfaceError> {
        self.record(Call::WaitPresent(selector.to_string()))?;
        self.find(selector).map_err(|_| SurfaceError::TimedOut {
            what: selector.to_string(),
            after: timeout,
        })
    }

    async fn wait_until_clickable(
        &self,
        handle: FakeHandle,
        timeout: Duration,
    ) -> Result<FakeHandle, SurfaceError> {
        self.record(Call::WaitClickable(handle.0.clone()))?;
        if self.is_clickable(&handle).await? {
            Ok(handle)
        } else {
            Err(SurfaceError::TimedOut {
                what: handle.0,
                after: timeout,
            })
        }
    }
}

/// A timing store in a fresh temp directory.
pub fn temp_timings() -> (tempfile::TempDir, Arc<TimingStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(TimingStore::open(dir.path()).unwrap());
    (dir, store)
}

/// Engine config with fast golden scans and no random drift.
pub fn quiet_config() -> EngineConfig {
    EngineConfig {
        upgrade_drift_probability: 0.0,
        product_drift_probability: 0.0,
        probe_interval: Duration::from_millis(20),
        ..EngineConfig::default()
    }
    .with_golden_interval(Duration::from_millis(1))
}
