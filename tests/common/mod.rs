//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use pv_forecast::api::AppState;
use pv_forecast::config::ServiceConfig;

/// Provider site id used by every fixture.
pub const SITE_ID: &str = "d0d0-6c65-3dea-b637";
/// Provider credential used by every fixture.
pub const API_KEY: &str = "test-key";

/// Path of the provider forecasts resource for [`SITE_ID`].
pub fn forecasts_path() -> String {
    format!("/rooftop_sites/{SITE_ID}/forecasts")
}

/// Valid configuration pointing at `base_url` with a short timeout.
pub fn config_for(base_url: &str) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.provider.base_url = base_url.to_string();
    config.provider.api_key = API_KEY.to_string();
    config.provider.site_id = SITE_ID.to_string();
    config.provider.timeout_secs = 1;
    config
}

/// API state talking to the provider at `base_url`.
pub fn state_for(base_url: &str) -> Arc<AppState> {
    Arc::new(AppState::from_config(&config_for(base_url)).expect("client should build"))
}

/// Address nothing listens on, so connections are refused.
pub fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral port bind should succeed");
    let addr = listener.local_addr().expect("local_addr should be available");
    drop(listener);
    addr
}

/// Starts a listener that accepts connections and never answers.
///
/// Must be called from within a tokio runtime.
pub async fn silent_upstream() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral port bind should succeed");
    let addr = listener.local_addr().expect("local_addr should be available");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}

/// One provider record as JSON.
pub fn record_json(pv: f64, period_end: &str, ghi: f64, dni: f64, dhi: f64) -> serde_json::Value {
    serde_json::json!({
        "pv_estimate": pv,
        "period_end": period_end,
        "ghi": ghi,
        "dni": dni,
        "dhi": dhi,
        "period": "PT30M",
    })
}

/// Provider success body wrapping `records`.
pub fn forecasts_body(records: Vec<serde_json::Value>) -> String {
    serde_json::json!({ "forecasts": records }).to_string()
}

/// A day-like series of `n` half-hour records starting at midnight UTC.
pub fn half_hour_series(n: usize) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| {
            let minutes = (i + 1) * 30;
            let period_end = format!(
                "2024-06-01T{:02}:{:02}:00.0000000Z",
                (minutes / 60) % 24,
                minutes % 60
            );
            let pv = (i % 7) as f64 * 0.35;
            record_json(pv, &period_end, pv * 250.0, pv * 200.0, pv * 50.0)
        })
        .collect()
}
