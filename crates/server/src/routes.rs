//! HTTP boundary: three GET endpoints over the shared browser session.
//!
//! `/health` never blocks on an in-flight generation; `/generate/{model}`
//! requests queue on one mutex because the page can only run one generation
//! at a time.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use dreambridge::{
    BridgeConfig, Error, GeneratedImage, GenerationRequest, Model, Orchestrator, Session,
};

const PROMPT_REQUIRED: &str = "Please provide a prompt query parameter";
const NOT_READY: &str = "Server not ready. Dreamina login in progress or failed.";

pub struct ServiceState {
    /// Absent when the browser failed to launch at startup; the service then
    /// runs degraded and reports `loggedIn: false`.
    session: Option<Arc<Session>>,
    orchestrator: Orchestrator,
    generation_gate: Mutex<()>,
}

impl ServiceState {
    pub fn new(config: Arc<BridgeConfig>, session: Option<Arc<Session>>) -> Self {
        Self {
            session,
            orchestrator: Orchestrator::new(config),
            generation_gate: Mutex::new(()),
        }
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    fn logged_in(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_ready())
    }
}

pub fn router(state: Arc<ServiceState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate/{model}", get(generate))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuery {
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub model: String,
    pub prompt: String,
    pub count: usize,
    pub images: Vec<GeneratedImage>,
}

async fn health(State(state): State<Arc<ServiceState>>) -> Response {
    let logged_in = state.logged_in();
    let message = if logged_in {
        "Ready to generate images"
    } else {
        "Login in progress or failed"
    };
    Json(json!({
        "status": "running",
        "loggedIn": logged_in,
        "message": message,
    }))
    .into_response()
}

async fn generate(
    State(state): State<Arc<ServiceState>>,
    Path(variant): Path<String>,
    Query(query): Query<GenerateQuery>,
) -> Response {
    let Some(model) = Model::from_variant(&variant) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("Unknown model '{variant}'"),
        );
    };
    let prompt = match query.prompt {
        Some(prompt) if !prompt.trim().is_empty() => prompt,
        _ => return error_response(StatusCode::BAD_REQUEST, PROMPT_REQUIRED),
    };
    let Some(session) = state.session.clone() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, NOT_READY);
    };
    if !session.is_ready() {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, NOT_READY);
    }

    // Exclusive page ownership for the duration of the call.
    let _page = state.generation_gate.lock().await;
    info!(target = "dreambridge_server", model = %model, "generation request accepted");

    let request = GenerationRequest::new(prompt.as_str(), model);
    match state.orchestrator.generate(&session, &request).await {
        Ok(images) => {
            let body = GenerateResponse {
                success: true,
                model: model.display_name().to_string(),
                prompt,
                count: images.len(),
                images,
            };
            Json(body).into_response()
        }
        Err(Error::NotAuthenticated) => error_response(StatusCode::SERVICE_UNAVAILABLE, NOT_READY),
        Err(Error::EmptyPrompt) => error_response(StatusCode::BAD_REQUEST, PROMPT_REQUIRED),
        Err(err) => {
            // Failures never clear the authenticated flag; an expired session
            // keeps surfacing as errors until the operator restarts with
            // fresh cookies.
            if !err.is_call_scoped() {
                warn!(
                    target = "dreambridge_server",
                    error = %err,
                    "page-level failure during generation"
                );
            }
            error!(target = "dreambridge_server", error = %err, "generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Image generation failed",
                    "details": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    use dreambridge::{PageDriver, Result, SessionState};
    use serde_json::Value;

    struct InertDriver;

    /// Every page evaluation fails, as when the renderer drops mid-call.
    struct BrokenPageDriver;

    #[async_trait::async_trait]
    impl PageDriver for BrokenPageDriver {
        async fn goto(&self, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn current_url(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn evaluate(&self, _script: &str) -> Result<Value> {
            Err(dreambridge::Error::Io(std::io::Error::other(
                "connection reset",
            )))
        }
        async fn set_cookies(&self, _records: &[dreambridge::CookieRecord]) -> Result<()> {
            Ok(())
        }
        async fn press_key(&self, _key: &str) -> Result<()> {
            Ok(())
        }
        async fn screenshot(&self, _path: &std::path::Path) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl PageDriver for InertDriver {
        async fn goto(&self, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn current_url(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn evaluate(&self, _script: &str) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn set_cookies(&self, _records: &[dreambridge::CookieRecord]) -> Result<()> {
            Ok(())
        }
        async fn press_key(&self, _key: &str) -> Result<()> {
            Ok(())
        }
        async fn screenshot(&self, _path: &std::path::Path) -> Result<()> {
            Ok(())
        }
    }

    fn state_with_session(ready: bool) -> Arc<ServiceState> {
        let session = Arc::new(Session::from_driver(Arc::new(InertDriver)));
        if ready {
            session.set_state(SessionState::Ready);
        }
        Arc::new(ServiceState::new(
            Arc::new(BridgeConfig::default()),
            Some(session),
        ))
    }

    fn degraded_state() -> Arc<ServiceState> {
        Arc::new(ServiceState::new(Arc::new(BridgeConfig::default()), None))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_logged_in_when_ready() {
        let response = health(State(state_with_session(true))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["loggedIn"], true);
        assert_eq!(body["message"], "Ready to generate images");
    }

    #[tokio::test]
    async fn health_stays_200_while_degraded() {
        let response = health(State(degraded_state())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["loggedIn"], false);
        assert_eq!(body["message"], "Login in progress or failed");
    }

    #[tokio::test]
    async fn unknown_model_is_a_bad_request() {
        let response = generate(
            State(state_with_session(true)),
            Path("image-5".to_string()),
            Query(GenerateQuery::default()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Unknown model 'image-5'");
    }

    #[tokio::test]
    async fn missing_prompt_is_a_bad_request() {
        let response = generate(
            State(state_with_session(true)),
            Path("nano-banana".to_string()),
            Query(GenerateQuery::default()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], PROMPT_REQUIRED);
    }

    #[tokio::test]
    async fn blank_prompt_is_a_bad_request() {
        let response = generate(
            State(state_with_session(true)),
            Path("image-4".to_string()),
            Query(GenerateQuery {
                prompt: Some("   ".to_string()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unauthenticated_session_is_service_unavailable() {
        let response = generate(
            State(state_with_session(false)),
            Path("image-4".to_string()),
            Query(GenerateQuery {
                prompt: Some("a red fox in snow".to_string()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"], NOT_READY);
    }

    #[tokio::test]
    async fn page_errors_fail_the_call_but_never_clear_the_authenticated_flag() {
        let mut config = BridgeConfig::default();
        config.input_attempts = 2;
        config.input_pause_ms = 1;
        config.submit_attempts = 1;
        config.settle_pause_ms = 1;
        config.poll_interval_ms = 1;
        config.poll_budget_ms = 10;

        let session = Arc::new(Session::from_driver(Arc::new(BrokenPageDriver)));
        session.set_state(SessionState::Ready);
        let state = Arc::new(ServiceState::new(Arc::new(config), Some(session.clone())));

        let response = generate(
            State(state.clone()),
            Path("default".to_string()),
            Query(GenerateQuery {
                prompt: Some("a red fox in snow".to_string()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Image generation failed");

        // The session stays authenticated; the next call is attempted, not
        // rejected with 503.
        assert!(session.is_ready());
        let retry = generate(
            State(state),
            Path("default".to_string()),
            Query(GenerateQuery {
                prompt: Some("a red fox in snow".to_string()),
            }),
        )
        .await;
        assert_eq!(retry.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn degraded_service_refuses_generation() {
        let response = generate(
            State(degraded_state()),
            Path("nano-banana".to_string()),
            Query(GenerateQuery {
                prompt: Some("a red fox in snow".to_string()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
