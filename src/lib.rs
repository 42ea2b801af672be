//! PV generation forecast service backed by a rooftop-site forecast provider.

/// HTTP router, handlers, and server bootstrap.
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod forecast;
pub mod provider;

pub use error::ForecastError;
