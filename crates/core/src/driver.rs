//! Browser session lifecycle and the page-driver seam.
//!
//! One headless browser process and one page per server process. The
//! [`PageDriver`] trait is the boundary the authenticator and orchestrator
//! talk through, so both can be exercised against a scripted driver without a
//! real browser.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::network::{SetCookiesParams, SetUserAgentOverrideParams};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::page::ScreenshotParams;
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::cookies::{self, CookieRecord};
use crate::error::{Error, Result};
use crate::js;
use crate::retry::{RetryPolicy, retry};

/// Authentication state machine for the shared session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    Ready,
    Failed,
}

/// Operations the automation layers need from a live page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for DOM-content readiness, bounded by the configured
    /// navigation timeout.
    async fn goto(&self, url: &str) -> Result<()>;
    async fn current_url(&self) -> Result<String>;
    /// Evaluate a script and return its JSON-serialized result.
    async fn evaluate(&self, script: &str) -> Result<Value>;
    async fn set_cookies(&self, records: &[CookieRecord]) -> Result<()>;
    async fn press_key(&self, key: &str) -> Result<()>;
    async fn screenshot(&self, path: &Path) -> Result<()>;
}

/// The single browser process plus its one active page.
pub struct Session {
    backend: Mutex<Option<Backend>>,
    driver: Arc<dyn PageDriver>,
    state: RwLock<SessionState>,
}

struct Backend {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl Backend {
    async fn teardown(mut self) {
        if let Err(err) = self.browser.close().await {
            debug!(target = "dreambridge", error = %err, "browser close failed");
        }
        let _ = self.browser.kill().await;
        self.handler_task.abort();
    }
}

impl Session {
    /// Session over an arbitrary driver with no browser process behind it.
    /// Used for tests against a scripted [`PageDriver`].
    pub fn from_driver(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            backend: Mutex::new(None),
            driver,
            state: RwLock::new(SessionState::Unauthenticated),
        }
    }

    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn set_state(&self, state: SessionState) {
        *self.state.write() = state;
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Best-effort teardown; tolerates an already-dead browser. Idempotent,
    /// so shutdown paths can race without double-closing.
    pub async fn close(&self) {
        let backend = self.backend.lock().take();
        if let Some(backend) = backend {
            backend.teardown().await;
            info!(target = "dreambridge", "browser session closed");
        }
    }
}

/// Launches the headless browser with retry and produces the shared session.
pub struct SessionManager {
    config: Arc<BridgeConfig>,
}

impl SessionManager {
    pub fn new(config: Arc<BridgeConfig>) -> Self {
        Self { config }
    }

    pub async fn launch(&self) -> Result<Session> {
        let policy = RetryPolicy::new(self.config.launch_attempts, self.config.launch_backoff());
        retry(policy, "browser launch", || self.launch_once()).await
    }

    async fn launch_once(&self) -> Result<Session> {
        let browser_config = build_browser_config(&self.config)?;

        let (browser, mut handler) = tokio::time::timeout(
            self.config.launch_timeout(),
            Browser::launch(browser_config),
        )
        .await
        .map_err(|_| {
            Error::BrowserLaunch(format!(
                "timed out after {}ms",
                self.config.launch_timeout_ms
            ))
        })?
        .map_err(|e| Error::BrowserLaunch(e.to_string()))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });
        let backend = Backend {
            browser,
            handler_task,
        };

        let page = match backend.browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                backend.teardown().await;
                return Err(Error::BrowserLaunch(format!("page creation failed: {err}")));
            }
        };

        if let Err(err) = configure_page(&page, &self.config).await {
            backend.teardown().await;
            return Err(err);
        }

        info!(
            target = "dreambridge",
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            "browser session launched"
        );

        Ok(Session {
            backend: Mutex::new(Some(backend)),
            driver: Arc::new(CdpDriver {
                page,
                nav_timeout: self.config.nav_timeout(),
            }),
            state: RwLock::new(SessionState::Unauthenticated),
        })
    }
}

async fn configure_page(page: &Page, config: &BridgeConfig) -> Result<()> {
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
        js::STEALTH_INIT,
    ))
    .await
    .map_err(|e| Error::BrowserLaunch(format!("stealth injection failed: {e}")))?;

    let override_params = SetUserAgentOverrideParams::builder()
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| Error::BrowserLaunch(format!("user agent override build error: {e}")))?;
    page.execute(override_params)
        .await
        .map_err(|e| Error::BrowserLaunch(format!("user agent override failed: {e}")))?;

    Ok(())
}

fn build_browser_config(config: &BridgeConfig) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .headless_mode(HeadlessMode::New)
        .window_size(config.viewport_width, config.viewport_height)
        .request_timeout(config.request_timeout())
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-gpu")
        .arg("--disable-software-rasterizer")
        .arg("--disable-extensions")
        .arg("--disable-background-timer-throttling")
        .arg("--disable-backgrounding-occluded-windows")
        .arg("--disable-renderer-backgrounding")
        .arg("--disable-blink-features=AutomationControlled");

    if let Some(executable) = resolve_executable(config.chrome_path.as_deref()) {
        builder = builder.chrome_executable(executable);
    }

    builder.build().map_err(Error::BrowserLaunch)
}

const EXECUTABLE_PROBES: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
];

fn resolve_executable(configured: Option<&Path>) -> Option<PathBuf> {
    let probes: Vec<PathBuf> = EXECUTABLE_PROBES.iter().map(PathBuf::from).collect();
    probe_executable(&probes, configured)
}

/// Probe well-known install locations, then the configured/env-supplied path.
/// `None` leaves executable discovery to the CDP library's own detection.
fn probe_executable(probes: &[PathBuf], configured: Option<&Path>) -> Option<PathBuf> {
    for candidate in probes {
        if candidate.exists() {
            debug!(target = "dreambridge", path = %candidate.display(), "found browser executable");
            return Some(candidate.clone());
        }
    }
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!(
            target = "dreambridge",
            path = %path.display(),
            "configured browser executable missing, falling back to auto-detection"
        );
    }
    None
}

/// [`PageDriver`] backed by a live CDP page.
struct CdpDriver {
    page: Page,
    nav_timeout: std::time::Duration,
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        // goto resolves on the navigation response, not network idle; the
        // target site long-polls assets and would never go idle.
        tokio::time::timeout(self.nav_timeout, self.page.goto(url))
            .await
            .map_err(|_| Error::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {}ms", self.nav_timeout.as_millis()),
            })?
            .map_err(|e| Error::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let result = self.page.evaluate(script).await?;
        Ok(result.into_value()?)
    }

    async fn set_cookies(&self, records: &[CookieRecord]) -> Result<()> {
        let params = cookies::to_cdp_params(records)?;
        self.page.execute(SetCookiesParams::new(params)).await?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(key)
            .build()
            .map_err(Error::Protocol)?;
        self.page.execute(down).await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key)
            .build()
            .map_err(Error::Protocol)?;
        self.page.execute(up).await?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let bytes = self.page.screenshot(params).await?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}
