//! Cookie-injection authentication with heuristic verification.
//!
//! There is no login API to call: credentials arrive as a cookie export,
//! get injected wholesale, and the logged-in state is inferred from what the
//! home page renders. A visible login control means the cookies are stale,
//! which no amount of retrying fixes.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::cookies::CookieRecord;
use crate::driver::{PageDriver, Session, SessionState};
use crate::error::{Error, Result};
use crate::js;
use crate::retry::{RetryPolicy, retry};

/// Body text below this length is treated as a placeholder/skeleton page,
/// not a rendered application.
const MIN_BODY_TEXT: u64 = 500;

const LOGIN_PATH_SEGMENTS: &[&str] = &["/login", "/signin", "/sign-in", "/passport"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VerifyProbe {
    has_login_control: bool,
    has_generate_control: bool,
    has_prompt_input: bool,
    body_text_len: u64,
    has_nav_text: bool,
}

pub struct Authenticator {
    config: Arc<BridgeConfig>,
}

impl Authenticator {
    pub fn new(config: Arc<BridgeConfig>) -> Self {
        Self { config }
    }

    /// Inject cookies, navigate to the tool surface, and verify logged-in
    /// state. Moves the session to `Ready` on success and `Failed` on any
    /// error; the flag is never cleared automatically afterwards.
    pub async fn authenticate(&self, session: &Session, cookies: &[CookieRecord]) -> Result<()> {
        session.set_state(SessionState::Authenticating);
        match self.run(session, cookies).await {
            Ok(()) => {
                session.set_state(SessionState::Ready);
                info!(target = "dreambridge", "session authenticated");
                Ok(())
            }
            Err(err) => {
                session.set_state(SessionState::Failed);
                Err(err)
            }
        }
    }

    async fn run(&self, session: &Session, cookies: &[CookieRecord]) -> Result<()> {
        let driver = session.driver();

        // Unauthenticated reachability probe against the bare origin.
        // Diagnostic only: DNS or TLS trouble shows up here with a clearer
        // signature than it would mid-authentication.
        if let Err(err) = driver.goto(&self.config.base_url).await {
            warn!(
                target = "dreambridge",
                error = %err,
                "connectivity pre-check failed, continuing anyway"
            );
        }

        driver.set_cookies(cookies).await?;
        info!(
            target = "dreambridge",
            count = cookies.len(),
            "injected authentication cookies"
        );

        let home = self.config.home_url();
        let policy = RetryPolicy::new(self.config.nav_attempts, self.config.nav_backoff());
        retry(policy, "home navigation", || driver.goto(&home)).await?;

        self.verify(driver).await
    }

    async fn verify(&self, driver: &dyn PageDriver) -> Result<()> {
        for attempt in 1..=self.config.verify_attempts {
            tokio::time::sleep(self.config.verify_pause()).await;

            if attempt == 1 {
                if let Err(err) = driver.screenshot(&self.config.screenshot_path).await {
                    debug!(
                        target = "dreambridge",
                        error = %err,
                        "diagnostic screenshot failed"
                    );
                }
            }

            let url = driver.current_url().await.unwrap_or_default();
            if LOGIN_PATH_SEGMENTS.iter().any(|seg| url.contains(seg)) {
                return Err(Error::SessionExpired);
            }

            let probe = match driver.evaluate(js::verification_probe_js()).await {
                Ok(value) => match serde_json::from_value::<VerifyProbe>(value) {
                    Ok(probe) => probe,
                    Err(err) => {
                        warn!(target = "dreambridge", attempt, error = %err, "verification probe unreadable");
                        continue;
                    }
                },
                Err(err) => {
                    warn!(target = "dreambridge", attempt, error = %err, "verification probe failed");
                    continue;
                }
            };

            if probe.has_login_control {
                return Err(Error::SessionExpired);
            }
            if probe.has_generate_control
                || probe.has_prompt_input
                || (probe.body_text_len >= MIN_BODY_TEXT && probe.has_nav_text)
            {
                info!(target = "dreambridge", attempt, "logged-in state verified");
                return Ok(());
            }
            debug!(target = "dreambridge", attempt, "no authentication signal yet");
        }

        Err(Error::VerificationTimeout {
            attempts: self.config.verify_attempts,
        })
    }
}
