//! Chromium-backed target surface using chromiumoxide.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use chromiumoxide::Handler;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crumb_engine::{Selector, SurfaceError, TargetSurface};

use super::find_chromium;
use crate::config::AppConfig;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reports why an element cannot take a click right now.
const CLICKABILITY_PROBE: &str = r#"function() {
    if (!this.isConnected) { return "detached"; }
    const rect = this.getBoundingClientRect();
    if (rect.width === 0 || rect.height === 0) { return "hidden"; }
    if (this.disabled || this.getAttribute("aria-disabled") === "true") { return "disabled"; }
    return "ready";
}"#;

/// How to start the browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub chrome: Option<PathBuf>,
    pub user_data_dir: PathBuf,
    pub profile: String,
    pub url: String,
    pub headless: bool,
}

impl From<&AppConfig> for LaunchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            chrome: config.chrome.clone(),
            user_data_dir: config.profile_dir.clone(),
            profile: config.profile.clone(),
            url: config.url.clone(),
            headless: config.headless,
        }
    }
}

/// One browser window showing the game.
pub struct ChromiumSurface {
    browser: Mutex<Browser>,
    page: Page,
    handler: std::sync::Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ChromiumSurface {
    /// Launch Chromium on the persistent profile and open the game page.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let chrome_path = find_chromium(options.chrome.as_deref()).context(
            "Chromium not found. Install Chrome or pass --chrome / set CRUMB_CHROMIUM_PATH.",
        )?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(&options.user_data_dir)
            .arg(format!("--profile-directory={}", options.profile))
            .arg("--disable-background-timer-throttling")
            .arg("--disable-renderer-backgrounding")
            .arg("--disable-backgrounding-occluded-windows");
        builder = if options.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;
        let handler = spawn_handler_task(handler);

        let page = match open_game(&browser, &options.url).await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(e);
            }
        };
        tracing::info!(url = %options.url, "game page opened");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler: std::sync::Mutex::new(Some(handler)),
            closed: AtomicBool::new(false),
        })
    }
}

async fn open_game(browser: &Browser, url: &str) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("failed to create new page")?;

    match tokio::time::timeout(NAVIGATION_TIMEOUT, page.goto(url)).await {
        Ok(Ok(_)) => {
            let _ = page.wait_for_navigation().await;
            Ok(page)
        }
        Ok(Err(e)) => Err(anyhow::anyhow!("navigation to {url} failed: {e}")),
        Err(_) => Err(anyhow::anyhow!(
            "navigation to {url} timed out after {}s",
            NAVIGATION_TIMEOUT.as_secs()
        )),
    }
}

fn spawn_handler_task(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::debug!(error = %e, "chromiumoxide handler event error");
            }
        }
        tracing::debug!("chromiumoxide handler finished");
    })
}

/// Map a CDP failure onto the engine's failure classes.
pub fn classify(error: CdpError, what: &str) -> SurfaceError {
    match error {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            SurfaceError::Disconnected(error.to_string())
        }
        CdpError::NotFound => SurfaceError::NotFound(what.to_string()),
        CdpError::Timeout => SurfaceError::TimedOut {
            what: what.to_string(),
            after: Duration::ZERO,
        },
        CdpError::ScrollingFailed(message) => SurfaceError::NotInteractable(message),
        other => classify_message(&other.to_string(), what),
    }
}

/// Classify by the protocol's error text when the variant says nothing useful.
pub fn classify_message(message: &str, what: &str) -> SurfaceError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("no node")
        || lower.contains("could not find node")
        || lower.contains("detached")
        || lower.contains("not attached")
        || lower.contains("cannot find context")
        || lower.contains("object reference")
    {
        SurfaceError::Stale
    } else if lower.contains("target closed")
        || lower.contains("session closed")
        || lower.contains("connection closed")
        || lower.contains("no target with given id")
    {
        SurfaceError::Disconnected(message.to_string())
    } else if lower.contains("no matching") {
        SurfaceError::NotFound(what.to_string())
    } else {
        SurfaceError::NotInteractable(message.to_string())
    }
}

#[async_trait]
impl TargetSurface for ChromiumSurface {
    type Handle = Element;

    async fn locate_one(&self, selector: &Selector) -> Result<Element, SurfaceError> {
        self.locate_all(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SurfaceError::NotFound(selector.to_string()))
    }

    async fn locate_all(&self, selector: &Selector) -> Result<Vec<Element>, SurfaceError> {
        match self.page.find_elements(selector.as_str()).await {
            Ok(items) => Ok(items),
            Err(e) => match classify(e, selector.as_str()) {
                // A query that matched nothing is an empty collection.
                SurfaceError::NotFound(_) => Ok(Vec::new()),
                other => Err(other),
            },
        }
    }

    async fn is_clickable(&self, handle: &Element) -> Result<bool, SurfaceError> {
        let returns = handle
            .call_js_fn(CLICKABILITY_PROBE, false)
            .await
            .map_err(|e| classify(e, "element"))?;
        let state = returns
            .result
            .value
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .unwrap_or("detached");
        match state {
            "ready" => Ok(true),
            "detached" => Err(SurfaceError::Stale),
            _ => Ok(false),
        }
    }

    async fn activate(&self, handle: &Element) -> Result<(), SurfaceError> {
        handle
            .click()
            .await
            .map(|_| ())
            .map_err(|e| classify(e, "element"))
    }

    async fn scroll_into_view(&self, handle: &Element) {
        if let Err(e) = handle.scroll_into_view().await {
            tracing::trace!(error = %e, "scroll into view failed");
        }
    }

    async fn probe(&self) -> Result<String, SurfaceError> {
        self.page
            .get_title()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| classify(e, "page title"))
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut browser = self.browser.lock().await;
        let result = match tokio::time::timeout(CLOSE_TIMEOUT, browser.close()).await {
            Ok(Ok(_)) => {
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, browser.wait()).await;
                Ok(())
            }
            Ok(Err(e)) => Err(classify(e, "browser")),
            Err(_) => Err(SurfaceError::TimedOut {
                what: "browser close".to_string(),
                after: CLOSE_TIMEOUT,
            }),
        };
        if result.is_err() {
            if let Err(e) = browser.kill().await.transpose() {
                tracing::warn!(error = %e, "failed to kill browser process");
            }
        }

        let handler = self
            .handler
            .lock()
            .map(|mut slot| slot.take())
            .unwrap_or_default();
        if let Some(handler) = handler {
            handler.abort();
        }
        result
    }
}
