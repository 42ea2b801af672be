//! Outbound client for the rooftop-site forecast provider.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{ForecastError, Result};

/// Upstream error bodies are cut to this many characters.
const MAX_ERROR_BODY: usize = 200;

/// One upstream time step, as sent by the provider.
///
/// Numeric fields default to `None` when absent or `null`; the
/// transformation substitutes 0.0.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawForecastRecord {
    /// Estimated PV output (kW).
    #[serde(default)]
    pub pv_estimate: Option<f64>,
    /// End of the forecast period, ISO-8601.
    #[serde(default)]
    pub period_end: Option<String>,
    /// Global horizontal irradiance (W/m²).
    #[serde(default)]
    pub ghi: Option<f64>,
    /// Direct normal irradiance (W/m²).
    #[serde(default)]
    pub dni: Option<f64>,
    /// Diffuse horizontal irradiance (W/m²).
    #[serde(default)]
    pub dhi: Option<f64>,
}

/// Success body of the forecasts endpoint.
#[derive(Debug, Deserialize)]
struct ForecastEnvelope {
    #[serde(default)]
    forecasts: Option<Vec<RawForecastRecord>>,
}

/// HTTP client bound to one provider account and site.
///
/// Cheap to share; the underlying `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    api_key: String,
    site_id: String,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("base_url", &self.base_url)
            .field("site_id", &self.site_id)
            .finish_non_exhaustive()
    }
}

impl ProviderClient {
    /// Builds a client from the provider section of the service config.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the TLS backend cannot be initialised.
    pub fn new(config: &ProviderConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            site_id: config.site_id.clone(),
        })
    }

    /// URL of the site's forecasts resource.
    pub fn forecasts_url(&self) -> String {
        format!("{}/rooftop_sites/{}/forecasts", self.base_url, self.site_id)
    }

    /// Fetches `hours` of forecast records in provider order.
    ///
    /// # Errors
    ///
    /// - `UpstreamError` for a non-success status.
    /// - `UpstreamUnavailable` for transport failures or a non-JSON body.
    /// - `MalformedUpstreamRecord` if the JSON does not match the record schema.
    /// - `NoForecastData` if the `forecasts` list is absent or empty.
    pub async fn fetch_forecasts(&self, hours: u32) -> Result<Vec<RawForecastRecord>> {
        let url = self.forecasts_url();
        debug!(%url, hours, "requesting provider forecasts");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("format", "json".to_string()), ("hours", hours.to_string())])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, timeout = e.is_timeout(), "provider request failed");
                ForecastError::UpstreamUnavailable
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "provider returned an error status");
            return Err(ForecastError::UpstreamError {
                status: status.as_u16(),
                message: error_message(status.as_str(), &body),
            });
        }

        let body = response.text().await.map_err(|e| {
            warn!(error = %e, "failed to read provider response body");
            ForecastError::UpstreamUnavailable
        })?;

        parse_forecasts(&body)
    }
}

/// Decodes a success body into records.
///
/// A body that is not JSON at all is a transport problem; JSON with the
/// wrong shape is a contract violation.
pub fn parse_forecasts(body: &str) -> Result<Vec<RawForecastRecord>> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "provider response is not JSON");
        ForecastError::UpstreamUnavailable
    })?;

    check_shape(&value)?;

    let envelope: ForecastEnvelope = serde_json::from_value(value)
        .map_err(|e| ForecastError::MalformedUpstreamRecord(e.to_string()))?;

    match envelope.forecasts {
        Some(records) if !records.is_empty() => Ok(records),
        _ => Err(ForecastError::NoForecastData),
    }
}

/// Serde maps JSON arrays onto structs by position, so the envelope and
/// every record must be checked to be objects first.
fn check_shape(value: &serde_json::Value) -> Result<()> {
    let envelope = value.as_object().ok_or_else(|| {
        ForecastError::MalformedUpstreamRecord("response is not a JSON object".to_string())
    })?;

    if let Some(serde_json::Value::Array(records)) = envelope.get("forecasts")
        && let Some(idx) = records.iter().position(|r| !r.is_object())
    {
        return Err(ForecastError::MalformedUpstreamRecord(format!(
            "forecasts[{idx}] is not a JSON object"
        )));
    }
    Ok(())
}

fn error_message(status: &str, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("provider responded with status {status}");
    }
    let truncated: String = body.chars().take(MAX_ERROR_BODY).collect();
    format!("provider responded with status {status}: {truncated}")
}
