//! Error taxonomy for a single forecast request.

use thiserror::Error;

/// Fixed message returned to callers when the provider cannot be reached.
pub const UNAVAILABLE_MESSAGE: &str = "forecast provider request failed";

/// Every way a `/predict` call can fail.
///
/// A call either yields a complete `ForecastResponse` or exactly one of
/// these; partial results are never returned.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A request parameter violates its constraint. Raised before any
    /// upstream call is made.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The provider answered with a non-success HTTP status.
    #[error("provider API error {status}: {message}")]
    UpstreamError { status: u16, message: String },

    /// Transport-level failure reaching the provider (timeout, refused
    /// connection, DNS, undecodable body). The cause is logged, not exposed.
    #[error("{}", UNAVAILABLE_MESSAGE)]
    UpstreamUnavailable,

    /// The provider succeeded but returned no forecast entries.
    #[error("no forecast data from provider")]
    NoForecastData,

    /// A forecast entry violates the provider contract.
    #[error("malformed provider record: {0}")]
    MalformedUpstreamRecord(String),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
