//! The prompt-submission and result-extraction protocol.
//!
//! One generation call walks the shared page through: navigate, baseline
//! snapshot, fill prompt, optional model selection, submit, poll, extract.
//! The protocol assumes exclusive ownership of the page for its whole
//! duration; callers must serialize concurrent generations (the server wraps
//! calls in one mutex).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::driver::{PageDriver, Session};
use crate::error::{Error, Result};
use crate::extract::{self, ImageRect};
use crate::js;
use crate::model::{GeneratedImage, GenerationRequest, Model};

pub struct Orchestrator {
    config: Arc<BridgeConfig>,
}

impl Orchestrator {
    pub fn new(config: Arc<BridgeConfig>) -> Self {
        Self { config }
    }

    /// Run one full generation against the shared page.
    ///
    /// Preconditions: the session is `Ready` and the prompt is non-empty;
    /// both are checked before any page interaction happens.
    pub async fn generate(
        &self,
        session: &Session,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedImage>> {
        if !session.is_ready() {
            return Err(Error::NotAuthenticated);
        }
        if request.prompt.trim().is_empty() {
            return Err(Error::EmptyPrompt);
        }

        let driver = session.driver();
        info!(
            target = "dreambridge",
            model = %request.model,
            prompt_len = request.prompt.len(),
            "starting generation"
        );

        // Single-attempt navigation; a failure fails this call only.
        driver.goto(&self.config.generate_url()).await?;

        let baseline = self.baseline(driver).await;
        debug!(
            target = "dreambridge",
            count = baseline.len(),
            "baseline image snapshot taken"
        );

        self.fill_prompt(driver, &request.prompt).await?;

        if request.model != Model::Default {
            self.select_model(driver, request.model).await;
        }

        self.submit(driver).await?;
        let candidates = self.poll_for_results(driver, &baseline).await;

        let batch = extract::extract_batch(candidates, &self.config.heuristics);
        if batch.is_empty() {
            return Err(Error::NoResults);
        }
        info!(
            target = "dreambridge",
            count = batch.len(),
            "generation complete"
        );
        Ok(batch)
    }

    /// A failed snapshot degrades to an empty baseline rather than failing
    /// the call: the only cost is weaker filtering of pre-existing images.
    async fn baseline(&self, driver: &dyn PageDriver) -> HashSet<String> {
        match driver.evaluate(js::image_urls_js()).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_default(),
            Err(err) => {
                warn!(target = "dreambridge", error = %err, "baseline snapshot failed");
                HashSet::new()
            }
        }
    }

    /// Locate the prompt field and write the value, retrying while the page
    /// hydrates. The fill snippet dispatches input/change events so the
    /// page's framework observes the edit.
    async fn fill_prompt(&self, driver: &dyn PageDriver, prompt: &str) -> Result<()> {
        let script = js::fill_prompt_js(prompt);
        for attempt in 1..=self.config.input_attempts {
            match driver.evaluate(&script).await {
                Ok(Value::Bool(true)) => {
                    debug!(target = "dreambridge", attempt, "prompt filled");
                    return Ok(());
                }
                Ok(_) => {
                    debug!(target = "dreambridge", attempt, "prompt input not present yet");
                }
                Err(err) => {
                    warn!(target = "dreambridge", attempt, error = %err, "prompt fill evaluation failed");
                }
            }
            if attempt < self.config.input_attempts {
                tokio::time::sleep(self.config.input_pause()).await;
            }
        }
        Err(Error::InputNotFound {
            attempts: self.config.input_attempts,
        })
    }

    /// Best-effort model selection: open the selector, then click the option.
    /// Failure leaves whichever model the UI already has active.
    async fn select_model(&self, driver: &dyn PageDriver, model: Model) {
        let labels = [
            Model::ImageFour.display_name(),
            Model::NanoBanana.display_name(),
        ];
        let opened = matches!(
            driver.evaluate(&js::open_model_selector_js(&labels)).await,
            Ok(Value::Bool(true))
        );
        if !opened {
            warn!(
                target = "dreambridge",
                model = %model,
                "model selector not found, continuing with active model"
            );
            return;
        }
        tokio::time::sleep(self.config.settle_pause()).await;

        let selected = matches!(
            driver
                .evaluate(&js::click_model_option_js(model.display_name()))
                .await,
            Ok(Value::Bool(true))
        );
        if selected {
            debug!(target = "dreambridge", model = %model, "model selected");
            tokio::time::sleep(self.config.settle_pause()).await;
        } else {
            warn!(
                target = "dreambridge",
                model = %model,
                "model option not found, continuing with active model"
            );
        }
    }

    /// Try each submit strategy in priority order; when every click heuristic
    /// misses, fall back to the Enter key, which the focused prompt field
    /// handles on the current UI.
    async fn submit(&self, driver: &dyn PageDriver) -> Result<()> {
        for attempt in 1..=self.config.submit_attempts {
            for (strategy, script) in js::submit_strategies() {
                match driver.evaluate(script).await {
                    Ok(Value::Bool(true)) => {
                        debug!(target = "dreambridge", attempt, strategy, "submit clicked");
                        return Ok(());
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(target = "dreambridge", attempt, strategy, error = %err, "submit evaluation failed");
                    }
                }
            }
            debug!(target = "dreambridge", attempt, "no submit strategy matched");
            if attempt < self.config.submit_attempts {
                tokio::time::sleep(self.config.input_pause()).await;
            }
        }

        debug!(target = "dreambridge", "falling back to Enter key submission");
        driver.press_key("Enter").await.map_err(|err| {
            warn!(target = "dreambridge", error = %err, "Enter fallback failed");
            Error::SubmitNotFound {
                attempts: self.config.submit_attempts,
            }
        })
    }

    /// Re-scan the page until a full batch of qualifying new images is
    /// present with no generating indicator, or the budget runs out. A
    /// timeout is non-fatal: extraction proceeds with whatever appeared.
    async fn poll_for_results(
        &self,
        driver: &dyn PageDriver,
        baseline: &HashSet<String>,
    ) -> Vec<ImageRect> {
        let deadline = Instant::now() + self.config.poll_budget();
        let mut candidates = Vec::new();

        loop {
            tokio::time::sleep(self.config.poll_interval()).await;

            candidates = match self.scan(driver, baseline).await {
                Ok(found) => found,
                Err(err) => {
                    warn!(target = "dreambridge", error = %err, "result scan failed");
                    candidates
                }
            };

            let generating = matches!(
                driver.evaluate(js::generating_indicator_js()).await,
                Ok(Value::Bool(true))
            );

            if candidates.len() >= self.config.heuristics.batch_size && !generating {
                debug!(
                    target = "dreambridge",
                    count = candidates.len(),
                    "batch complete"
                );
                return candidates;
            }
            if Instant::now() >= deadline {
                warn!(
                    target = "dreambridge",
                    count = candidates.len(),
                    generating,
                    "polling budget exhausted, extracting best effort"
                );
                return candidates;
            }
        }
    }

    async fn scan(
        &self,
        driver: &dyn PageDriver,
        baseline: &HashSet<String>,
    ) -> Result<Vec<ImageRect>> {
        let value = driver.evaluate(js::scan_images_js()).await?;
        let snapshot: Vec<ImageRect> = serde_json::from_value(value)?;
        Ok(extract::qualify(
            &snapshot,
            baseline,
            &self.config.heuristics,
        ))
    }
}
