//! HTTP API for PV forecasts.
//!
//! Provides two GET endpoints:
//! - `/predict` — fetch, reshape, and return the provider forecast
//! - `/health` — liveness probe, independent of the provider

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::config::ServiceConfig;
use crate::forecast::{ForecastRequest, ForecastTransformer};
use crate::provider::ProviderClient;

pub use types::{ErrorResponse, HealthResponse, PredictQuery};

/// Immutable application state shared across all request handlers.
///
/// Constructed once at startup and wrapped in `Arc`; nothing in it
/// changes afterwards, so handlers need no locks.
#[derive(Debug)]
pub struct AppState {
    /// Request used for any parameter the caller omits.
    pub defaults: ForecastRequest,
    /// Forecast pipeline bound to the configured provider.
    pub transformer: ForecastTransformer,
}

impl AppState {
    /// Builds state from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the HTTP client cannot be built.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        let provider = ProviderClient::new(&config.provider)?;
        Ok(Self {
            defaults: ForecastRequest::from_config(config),
            transformer: ForecastTransformer::new(provider),
        })
    }
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", get(handlers::predict))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process exits.
///
/// # Errors
///
/// Returns the I/O error if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on http://{addr}");
    axum::serve(listener, app).await
}
