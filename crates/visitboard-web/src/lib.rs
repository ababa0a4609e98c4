//! visitboard-web - HTTP API for the visitor dashboard using Axum

pub mod cron;
pub mod error;
pub mod router;

pub use error::ApiError;
pub use router::create_router;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use visitboard_core::{AnalyticsService, DashboardConfig};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalyticsService>,
    /// Bearer token for the collection endpoint, open when `None`
    pub cron_secret: Option<String>,
    /// Days re-fetched per collection
    pub collect_days: u32,
}

impl AppState {
    pub fn new(service: Arc<AnalyticsService>) -> Self {
        Self {
            service,
            cron_secret: None,
            collect_days: 7,
        }
    }

    pub fn from_config(service: Arc<AnalyticsService>, config: &DashboardConfig) -> Self {
        Self {
            service,
            cron_secret: config.cron.secret.clone().filter(|s| !s.is_empty()),
            collect_days: config.cron.collect_days,
        }
    }

    pub fn with_cron_secret(mut self, secret: impl Into<String>) -> Self {
        self.cron_secret = Some(secret.into());
        self
    }
}

/// Run the web server until Ctrl-C
pub async fn run(state: AppState, addr: SocketAddr) -> Result<()> {
    let router = create_router(state);

    let listener = TcpListener::bind(addr).await?;

    info!("Web server listening on http://{}", addr);
    println!("Web server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
