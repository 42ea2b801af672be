//! API query, response, and error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ForecastError;
use crate::forecast::ForecastRequest;

/// Query parameters of `GET /predict`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    pub hours: Option<u32>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub tz: Option<String>,
    pub capacity_kw: Option<f64>,
    pub tilt: Option<f64>,
    pub azimuth: Option<f64>,
    pub gamma_pdc: Option<f64>,
    pub albedo: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub debug: Option<bool>,
}

/// Accepts the usual query-string spellings of a boolean, any case:
/// `true/false`, `1/0`, `yes/no`, `on/off`, `t/f`, `y/n`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Ok(Some(true)),
        "false" | "0" | "no" | "off" | "f" | "n" => Ok(Some(false)),
        _ => Err(D::Error::custom(format!(
            "\"{raw}\" is not a recognised boolean"
        ))),
    }
}

impl PredictQuery {
    /// Fills omitted parameters from `defaults`. Does not validate.
    pub fn into_request(self, defaults: &ForecastRequest) -> ForecastRequest {
        ForecastRequest {
            hours: self.hours.unwrap_or(defaults.hours),
            lat: self.lat.unwrap_or(defaults.lat),
            lon: self.lon.unwrap_or(defaults.lon),
            tz: self.tz.unwrap_or_else(|| defaults.tz.clone()),
            capacity_kw: self.capacity_kw.unwrap_or(defaults.capacity_kw),
            tilt: self.tilt.unwrap_or(defaults.tilt),
            azimuth: self.azimuth.unwrap_or(defaults.azimuth),
            gamma_pdc: self.gamma_pdc.unwrap_or(defaults.gamma_pdc),
            albedo: self.albedo.unwrap_or(defaults.albedo),
            debug: self.debug.unwrap_or(defaults.debug),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Error response body for 4xx/5xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

impl ForecastError {
    /// HTTP status this error is surfaced with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            // Only error statuses are passed through; a redirect or an
            // out-of-range code from the provider is not the caller's answer.
            Self::UpstreamError { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            Self::NoForecastData => StatusCode::NOT_FOUND,
            Self::MalformedUpstreamRecord(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ForecastError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
