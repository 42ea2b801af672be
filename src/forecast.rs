//! Forecast request/response model and the provider-record transformation.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, error};

use crate::config::{MAX_HOURS, MIN_HOURS, ServiceConfig};
use crate::error::{ForecastError, Result};
use crate::provider::{ProviderClient, RawForecastRecord};

/// Duration of one forecast step (hours). Fixed, never inferred from
/// timestamp deltas.
pub const STEP_HOURS: f64 = 0.5;

/// Parameters of one `/predict` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    /// Horizon in hours, `1..=240`.
    pub hours: u32,
    /// Site latitude (degrees).
    pub lat: f64,
    /// Site longitude (degrees).
    pub lon: f64,
    /// Timezone label, echoed only.
    pub tz: String,
    /// DC capacity (kW, > 0).
    pub capacity_kw: f64,
    /// Panel tilt (degrees).
    pub tilt: f64,
    /// Panel azimuth (degrees).
    pub azimuth: f64,
    /// Power temperature coefficient (1/°C).
    pub gamma_pdc: f64,
    /// Ground albedo.
    pub albedo: f64,
    /// Attach a debug block to the response.
    pub debug: bool,
}

impl ForecastRequest {
    /// Request populated entirely from configured defaults.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            hours: config.provider.default_hours,
            lat: config.site.lat,
            lon: config.site.lon,
            tz: config.site.tz.clone(),
            capacity_kw: config.system.capacity_kw,
            tilt: config.system.tilt,
            azimuth: config.system.azimuth,
            gamma_pdc: config.system.gamma_pdc,
            albedo: config.system.albedo,
            debug: false,
        }
    }

    /// Checks the parameter constraints.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for a horizon outside `1..=240` or a
    /// non-positive capacity.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_HOURS..=MAX_HOURS).contains(&self.hours) {
            return Err(ForecastError::InvalidRequest(format!(
                "hours must be in [{MIN_HOURS}, {MAX_HOURS}], got {}",
                self.hours
            )));
        }
        if self.capacity_kw.is_nan() || self.capacity_kw <= 0.0 {
            return Err(ForecastError::InvalidRequest(format!(
                "capacity_kw must be > 0, got {}",
                self.capacity_kw
            )));
        }
        Ok(())
    }
}

/// One forecast step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    /// End of the period, with the provider's offset.
    pub timestamp: DateTime<FixedOffset>,
    /// AC power (W).
    pub pac_w: f64,
    /// Energy over the step (Wh).
    pub e_wh: f64,
    /// Global horizontal irradiance (W/m²).
    pub ghi: f64,
    /// Direct normal irradiance (W/m²).
    pub dni: f64,
    /// Diffuse horizontal irradiance (W/m²).
    pub dhi: f64,
}

impl ForecastPoint {
    /// Converts one provider record.
    ///
    /// Missing numeric fields count as 0.0. DNI is read from the provider's
    /// own `dni` field.
    ///
    /// # Errors
    ///
    /// Returns `MalformedUpstreamRecord` if `period_end` is missing or
    /// cannot be parsed.
    pub fn from_record(record: &RawForecastRecord) -> Result<Self> {
        let period_end = record.period_end.as_deref().ok_or_else(|| {
            ForecastError::MalformedUpstreamRecord("missing period_end".to_string())
        })?;
        let timestamp = parse_period_end(period_end)?;

        let pac_w = record.pv_estimate.unwrap_or(0.0) * 1000.0;

        Ok(Self {
            timestamp,
            pac_w,
            e_wh: pac_w * STEP_HOURS,
            ghi: record.ghi.unwrap_or(0.0),
            dni: record.dni.unwrap_or(0.0),
            dhi: record.dhi.unwrap_or(0.0),
        })
    }
}

/// Parses a provider timestamp.
///
/// RFC 3339 keeps its offset; a bare ISO-8601 date-time is taken as UTC.
///
/// # Errors
///
/// Returns `MalformedUpstreamRecord` if neither form matches.
pub fn parse_period_end(s: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|e| ForecastError::MalformedUpstreamRecord(format!("period_end \"{s}\": {e}")))
}

/// Echoed site location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub tz: String,
}

/// Echoed PV system parameters. Not used in any calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
    pub capacity_kw: f64,
    pub tilt_deg: f64,
    pub azimuth_deg: f64,
    pub gamma_pdc_per_c: f64,
    pub albedo: f64,
}

/// Present only when the request asked for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugInfo {
    pub total_points: usize,
}

/// Body of a successful `/predict` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResponse {
    pub location: Location,
    pub system: SystemInfo,
    pub step_hours: f64,
    /// Provider order, chronological. Never empty.
    pub points: Vec<ForecastPoint>,
    /// Sum of `points[].e_wh` in kWh.
    pub total_energy_kwh: f64,
    /// Serialized as `null` when absent.
    pub debug: Option<DebugInfo>,
}

/// Assembles a response from provider records.
///
/// # Errors
///
/// - `NoForecastData` if `records` is empty.
/// - `MalformedUpstreamRecord` if any record is unusable; no partial
///   response is produced.
pub fn build_response(
    request: &ForecastRequest,
    records: &[RawForecastRecord],
) -> Result<ForecastResponse> {
    if records.is_empty() {
        return Err(ForecastError::NoForecastData);
    }

    let points = records
        .iter()
        .map(ForecastPoint::from_record)
        .collect::<Result<Vec<_>>>()?;

    let total_energy_kwh = points.iter().map(|p| p.e_wh).sum::<f64>() / 1000.0;

    let debug = request.debug.then(|| DebugInfo {
        total_points: points.len(),
    });

    Ok(ForecastResponse {
        location: Location {
            lat: request.lat,
            lon: request.lon,
            tz: request.tz.clone(),
        },
        system: SystemInfo {
            capacity_kw: request.capacity_kw,
            tilt_deg: request.tilt,
            azimuth_deg: request.azimuth,
            gamma_pdc_per_c: request.gamma_pdc,
            albedo: request.albedo,
        },
        step_hours: STEP_HOURS,
        points,
        total_energy_kwh,
        debug,
    })
}

/// Fetches provider forecasts and reshapes them into a [`ForecastResponse`].
///
/// Stateless between calls; safe to share across concurrent requests.
#[derive(Debug, Clone)]
pub struct ForecastTransformer {
    provider: ProviderClient,
}

impl ForecastTransformer {
    pub fn new(provider: ProviderClient) -> Self {
        Self { provider }
    }

    /// Runs one forecast request end to end.
    ///
    /// Validation happens before the upstream call.
    ///
    /// # Errors
    ///
    /// Any [`ForecastError`] variant; see the variant docs.
    pub async fn predict(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        request.validate()?;

        let records = self.provider.fetch_forecasts(request.hours).await?;

        let response = build_response(request, &records).inspect_err(|e| {
            if let ForecastError::MalformedUpstreamRecord(detail) = e {
                error!(%detail, "provider returned a malformed record");
            }
        })?;

        debug!(
            points = response.points.len(),
            total_energy_kwh = response.total_energy_kwh,
            "forecast assembled"
        );
        Ok(response)
    }
}
