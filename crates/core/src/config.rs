//! Runtime configuration for the automation core.
//!
//! Every timing bound and layout threshold the heuristics depend on lives here
//! rather than as a hard-coded constant, since the target site's layout can
//! change without notice. Defaults match the behavior observed against the
//! current UI snapshot.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Desktop user agent presented to the target site.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Layout thresholds for result-image qualification and batch recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Heuristics {
    /// Minimum rendered width and height for an image to count as content
    /// rather than a thumbnail or chrome.
    pub min_image_px: f64,
    /// Vertical proximity threshold for grouping images into one row.
    pub row_tolerance_px: f64,
    /// Upper-page cutoff; when enough candidates sit above it, images below
    /// are treated as unrelated gallery content.
    pub top_region_px: f64,
    /// Number of images the target UI renders per generation.
    pub batch_size: usize,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            min_image_px: 180.0,
            row_tolerance_px: 50.0,
            top_region_px: 600.0,
            batch_size: 4,
        }
    }
}

/// Configuration for the browser session, authenticator, and orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    /// Origin of the target application.
    pub base_url: String,
    /// Route of the home/tool surface used for authentication checks.
    pub home_route: String,
    /// Route of the generation surface.
    pub generate_route: String,
    /// Netscape-format cookie export, relative to the working directory.
    pub cookie_file: PathBuf,
    /// Explicit browser executable; probed install locations win over this.
    pub chrome_path: Option<PathBuf>,
    /// Where the first-verification-attempt diagnostic screenshot lands.
    pub screenshot_path: PathBuf,
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,

    pub launch_attempts: usize,
    pub launch_backoff_ms: u64,
    pub launch_timeout_ms: u64,
    /// CDP command timeout; pages on this site can be very slow.
    pub request_timeout_ms: u64,

    pub nav_attempts: usize,
    pub nav_backoff_ms: u64,
    pub nav_timeout_ms: u64,

    pub verify_attempts: usize,
    pub verify_pause_ms: u64,

    pub input_attempts: usize,
    pub input_pause_ms: u64,
    pub submit_attempts: usize,
    pub settle_pause_ms: u64,

    pub poll_interval_ms: u64,
    pub poll_budget_ms: u64,

    pub heuristics: Heuristics,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dreamina.capcut.com".to_string(),
            home_route: "/ai-tool/home/".to_string(),
            generate_route: "/ai-tool/home/".to_string(),
            cookie_file: PathBuf::from("cookies.txt"),
            chrome_path: None,
            screenshot_path: PathBuf::from("auth-verify.png"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            launch_attempts: 3,
            launch_backoff_ms: 5_000,
            launch_timeout_ms: 120_000,
            request_timeout_ms: 180_000,
            nav_attempts: 3,
            nav_backoff_ms: 5_000,
            nav_timeout_ms: 45_000,
            verify_attempts: 5,
            verify_pause_ms: 5_000,
            input_attempts: 8,
            input_pause_ms: 2_500,
            submit_attempts: 3,
            settle_pause_ms: 1_000,
            poll_interval_ms: 2_500,
            poll_budget_ms: 60_000,
            heuristics: Heuristics::default(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overlaid with environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("DREAMBRIDGE_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Ok(path) = std::env::var("COOKIE_FILE") {
            if !path.trim().is_empty() {
                config.cookie_file = PathBuf::from(path);
            }
        }
        // PUPPETEER_EXECUTABLE_PATH kept for drop-in compatibility with
        // deployments of the predecessor service.
        for var in ["CHROME_PATH", "PUPPETEER_EXECUTABLE_PATH"] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    config.chrome_path = Some(PathBuf::from(path));
                    break;
                }
            }
        }
        config
    }

    pub fn home_url(&self) -> String {
        join_url(&self.base_url, &self.home_route)
    }

    pub fn generate_url(&self) -> String {
        join_url(&self.base_url, &self.generate_route)
    }

    pub fn launch_backoff(&self) -> Duration {
        Duration::from_millis(self.launch_backoff_ms)
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn nav_backoff(&self) -> Duration {
        Duration::from_millis(self.nav_backoff_ms)
    }

    pub fn nav_timeout(&self) -> Duration {
        Duration::from_millis(self.nav_timeout_ms)
    }

    pub fn verify_pause(&self) -> Duration {
        Duration::from_millis(self.verify_pause_ms)
    }

    pub fn input_pause(&self) -> Duration {
        Duration::from_millis(self.input_pause_ms)
    }

    pub fn settle_pause(&self) -> Duration {
        Duration::from_millis(self.settle_pause_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_budget(&self) -> Duration {
        Duration::from_millis(self.poll_budget_ms)
    }
}

fn join_url(base: &str, route: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        route.trim_start_matches('/')
    )
}
