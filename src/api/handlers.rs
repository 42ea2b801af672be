//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};

use super::AppState;
use super::types::{HealthResponse, PredictQuery};
use crate::error::ForecastError;
use crate::forecast::ForecastResponse;

/// Returns the reshaped provider forecast.
///
/// `GET /predict` → 200 + `ForecastResponse` JSON
/// `GET /predict?hours=0` → 422 + `ErrorResponse`, no upstream call
pub async fn predict(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PredictQuery>, QueryRejection>,
) -> Result<Json<ForecastResponse>, ForecastError> {
    let Query(query) = query.map_err(|e| ForecastError::InvalidRequest(e.body_text()))?;
    let request = query.into_request(&state.defaults);

    state.transformer.predict(&request).await.map(Json)
}

/// Liveness probe.
///
/// `GET /health` → 200 + `{"status": "ok"}`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
