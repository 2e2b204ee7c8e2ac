mod cli;
mod logging;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use dreambridge::{Authenticator, BridgeConfig, Session, SessionManager, cookies};

use crate::cli::Cli;
use crate::routes::ServiceState;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        error!(target = "dreambridge_server", error = %err, "fatal");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = BridgeConfig::from_env();
    if let Some(path) = cli.cookies.clone() {
        config.cookie_file = path;
    }
    let config = Arc::new(config);

    let session = bootstrap(&config).await;
    let state = Arc::new(ServiceState::new(config.clone(), session));

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.resolved_port())
        .parse()
        .with_context(|| format!("Invalid host/port combination: {}:{}", cli.host, cli.resolved_port()))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(
        target = "dreambridge_server",
        %addr,
        "listening; endpoints: GET /generate/{{model}}?prompt=..., GET /health"
    );

    axum::serve(listener, routes::router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(session) = state.session() {
        session.close().await;
    }
    Ok(())
}

/// Launch the browser and authenticate. Every failure here degrades the
/// service instead of aborting it: the process still serves `/health` so
/// operators can see what state it is in.
async fn bootstrap(config: &Arc<BridgeConfig>) -> Option<Arc<Session>> {
    let session = match SessionManager::new(config.clone()).launch().await {
        Ok(session) => Arc::new(session),
        Err(err) => {
            warn!(
                target = "dreambridge_server",
                error = %err,
                "browser launch failed, serving degraded"
            );
            return None;
        }
    };

    let jar = match cookies::parse_cookie_file(&config.cookie_file) {
        Ok(jar) if !jar.is_empty() => {
            info!(
                target = "dreambridge_server",
                count = jar.len(),
                domains = ?cookies::domains(&jar),
                "cookie jar loaded"
            );
            jar
        }
        Ok(_) => {
            warn!(
                target = "dreambridge_server",
                path = %config.cookie_file.display(),
                "cookie file contains no cookies, skipping authentication"
            );
            return Some(session);
        }
        Err(err) => {
            warn!(
                target = "dreambridge_server",
                error = %err,
                "cookie file unreadable, skipping authentication"
            );
            return Some(session);
        }
    };

    if let Err(err) = Authenticator::new(config.clone())
        .authenticate(&session, &jar)
        .await
    {
        warn!(
            target = "dreambridge_server",
            error = %err,
            "authentication failed, serving degraded"
        );
    }
    Some(session)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target = "dreambridge_server", error = %err, "shutdown signal listener failed");
    }
    info!(target = "dreambridge_server", "shutdown signal received");
}
