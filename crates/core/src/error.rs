use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the session/automation core.
///
/// Variants follow the failure taxonomy the HTTP boundary needs: fatal-to-startup
/// (`CookieFile`), fatal-to-authentication (`SessionExpired`, `VerificationTimeout`),
/// retryable-then-fatal (`BrowserLaunch`, `Navigation`), and per-call failures
/// (`NotAuthenticated`, `InputNotFound`, `SubmitNotFound`, `NoResults`,
/// `Protocol`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("cookie file unreadable: {}", path.display())]
    CookieFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("navigation failed: {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("session expired: login screen detected, refresh the cookie file and restart")]
    SessionExpired,

    #[error("could not verify authentication state within {attempts} attempts")]
    VerificationTimeout { attempts: usize },

    #[error("not authenticated: session is not ready for generation")]
    NotAuthenticated,

    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("prompt input not found after {attempts} attempts")]
    InputNotFound { attempts: usize },

    #[error("submit control not found after {attempts} attempts")]
    SubmitNotFound { attempts: usize },

    #[error("no generated images could be extracted")]
    NoResults,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for failures that only invalidate the current generation call,
    /// leaving the authenticated session usable for subsequent requests.
    pub fn is_call_scoped(&self) -> bool {
        matches!(
            self,
            Error::EmptyPrompt
                | Error::InputNotFound { .. }
                | Error::SubmitNotFound { .. }
                | Error::NoResults
                | Error::Navigation { .. }
                | Error::Protocol(_)
        )
    }
}
