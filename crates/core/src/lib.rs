//! dreambridge: browser-automation core for relaying image-generation
//! prompts to a third-party web UI.
//!
//! The target site offers no API, so the "protocol" is a headless browser:
//! authenticate once by injecting an exported cookie jar and verifying the
//! rendered page, then per request fill the prompt field, submit, and scrape
//! the freshly generated images out of the DOM.
//!
//! ```ignore
//! use std::sync::Arc;
//! use dreambridge::{
//!     Authenticator, BridgeConfig, GenerationRequest, Model, Orchestrator, SessionManager,
//!     cookies,
//! };
//!
//! # async fn run() -> dreambridge::Result<()> {
//! let config = Arc::new(BridgeConfig::from_env());
//! let jar = cookies::parse_cookie_file(&config.cookie_file)?;
//!
//! let session = SessionManager::new(config.clone()).launch().await?;
//! Authenticator::new(config.clone())
//!     .authenticate(&session, &jar)
//!     .await?;
//!
//! let images = Orchestrator::new(config)
//!     .generate(&session, &GenerationRequest::new("a red fox in snow", Model::ImageFour))
//!     .await?;
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod cookies;
pub mod driver;
pub mod error;
pub mod extract;
pub mod js;
pub mod model;
pub mod orchestrator;
pub mod retry;

pub use auth::Authenticator;
pub use config::{BridgeConfig, Heuristics};
pub use cookies::{CookieRecord, SameSite};
pub use driver::{PageDriver, Session, SessionManager, SessionState};
pub use error::{Error, Result};
pub use model::{GeneratedImage, GenerationRequest, Model};
pub use orchestrator::Orchestrator;
pub use retry::{RetryPolicy, retry};
