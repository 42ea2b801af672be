//! TOML-based service configuration.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Environment variable overriding `provider.api_key`.
pub const ENV_API_KEY: &str = "PV_FORECAST_API_KEY";
/// Environment variable overriding `provider.site_id`.
pub const ENV_SITE_ID: &str = "PV_FORECAST_SITE_ID";
/// Environment variable overriding `provider.base_url`.
pub const ENV_BASE_URL: &str = "PV_FORECAST_BASE_URL";

/// Smallest accepted forecast horizon (hours).
pub const MIN_HOURS: u32 = 1;
/// Largest accepted forecast horizon (hours).
pub const MAX_HOURS: u32 = 240;

/// Top-level service configuration parsed from TOML.
///
/// All fields have defaults. Load from TOML with
/// [`ServiceConfig::from_toml_file`] or start from
/// [`ServiceConfig::default`]. Built once at startup and never mutated
/// afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Default site location.
    #[serde(default)]
    pub site: SiteConfig,
    /// Default PV system parameters.
    #[serde(default)]
    pub system: SystemConfig,
    /// Forecast provider connection.
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    pub bind: String,
    /// Listen port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Default site location, echoed in responses unless overridden per request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Latitude (degrees).
    pub lat: f64,
    /// Longitude (degrees).
    pub lon: f64,
    /// IANA timezone label.
    pub tz: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            lat: 47.0626,
            lon: 28.8679,
            tz: "Europe/Chisinau".to_string(),
        }
    }
}

/// Default PV system parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
    /// DC capacity (kW, must be > 0).
    pub capacity_kw: f64,
    /// Panel tilt (degrees).
    pub tilt: f64,
    /// Panel azimuth (degrees).
    pub azimuth: f64,
    /// Power temperature coefficient (1/°C).
    pub gamma_pdc: f64,
    /// Ground albedo.
    pub albedo: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            capacity_kw: 3.9,
            tilt: 30.0,
            azimuth: 180.0,
            gamma_pdc: -0.004,
            albedo: 0.2,
        }
    }
}

/// Forecast provider connection. Not overridable per request.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider API root, without trailing slash.
    pub base_url: String,
    /// Bearer credential.
    pub api_key: String,
    /// Rooftop site identifier registered with the provider.
    pub site_id: String,
    /// Upstream request timeout (seconds).
    pub timeout_secs: u64,
    /// Horizon used when a request omits `hours`.
    pub default_hours: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.solcast.com.au".to_string(),
            api_key: String::new(),
            site_id: String::new(),
            timeout_secs: 20,
            default_hours: 24,
        }
    }
}

// Hand-written so the credential never ends up in logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("site_id", &self.site_id)
            .field("timeout_secs", &self.timeout_secs)
            .field("default_hours", &self.default_hours)
            .finish()
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"provider.api_key"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl ServiceConfig {
    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Applies provider overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies provider overrides from an arbitrary key lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY) {
            self.provider.api_key = key;
        }
        if let Some(id) = non_empty(ENV_SITE_ID) {
            self.provider.site_id = id;
        }
        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.provider.base_url = url.trim_end_matches('/').to_string();
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let p = &self.provider;
        if p.base_url.trim().is_empty() {
            errors.push(ConfigError {
                field: "provider.base_url".into(),
                message: "must not be empty".into(),
            });
        }
        if p.api_key.trim().is_empty() {
            errors.push(ConfigError {
                field: "provider.api_key".into(),
                message: format!("must not be empty (set it in the file or via {ENV_API_KEY})"),
            });
        }
        if p.site_id.trim().is_empty() {
            errors.push(ConfigError {
                field: "provider.site_id".into(),
                message: format!("must not be empty (set it in the file or via {ENV_SITE_ID})"),
            });
        }
        if p.timeout_secs == 0 {
            errors.push(ConfigError {
                field: "provider.timeout_secs".into(),
                message: "must be > 0".into(),
            });
        }
        if !(MIN_HOURS..=MAX_HOURS).contains(&p.default_hours) {
            errors.push(ConfigError {
                field: "provider.default_hours".into(),
                message: format!("must be in [{MIN_HOURS}, {MAX_HOURS}]"),
            });
        }

        let capacity = self.system.capacity_kw;
        if capacity.is_nan() || capacity <= 0.0 {
            errors.push(ConfigError {
                field: "system.capacity_kw".into(),
                message: "must be > 0".into(),
            });
        }

        if self.site.tz.trim().is_empty() {
            errors.push(ConfigError {
                field: "site.tz".into(),
                message: "must not be empty".into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_credentials() -> ServiceConfig {
        let mut cfg = ServiceConfig::default();
        cfg.provider.api_key = "key".to_string();
        cfg.provider.site_id = "abcd-1234".to_string();
        cfg
    }

    #[test]
    fn defaults_need_credentials() {
        let errors = ServiceConfig::default().validate();
        assert!(errors.iter().any(|e| e.field == "provider.api_key"));
        assert!(errors.iter().any(|e| e.field == "provider.site_id"));
    }

    #[test]
    fn defaults_with_credentials_are_valid() {
        let errors = with_credentials().validate();
        assert!(errors.is_empty(), "should be valid: {errors:?}");
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[server]
bind = "127.0.0.1"
port = 9000

[site]
lat = 50.1
lon = 14.4
tz = "Europe/Prague"

[system]
capacity_kw = 8.5
tilt = 35.0
azimuth = 170.0
gamma_pdc = -0.0035
albedo = 0.25

[provider]
base_url = "http://localhost:1234"
api_key = "secret"
site_id = "site-1"
timeout_secs = 5
default_hours = 48
"#;
        let cfg = ServiceConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.server.port), Some(9000));
        assert_eq!(cfg.as_ref().map(|c| &*c.site.tz), Some("Europe/Prague"));
        assert_eq!(cfg.as_ref().map(|c| c.system.capacity_kw), Some(8.5));
        assert_eq!(cfg.as_ref().map(|c| c.provider.default_hours), Some(48));
        assert!(cfg.map(|c| c.validate().is_empty()).unwrap_or(false));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[provider]
api_key = "secret"
bogus_field = true
"#;
        let result = ServiceConfig::from_toml_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[system]
capacity_kw = 10.0
"#;
        let cfg = ServiceConfig::from_toml_str(toml).ok();
        assert_eq!(cfg.as_ref().map(|c| c.system.capacity_kw), Some(10.0));
        assert_eq!(cfg.as_ref().map(|c| c.system.tilt), Some(30.0));
        assert_eq!(cfg.as_ref().map(|c| c.provider.timeout_secs), Some(20));
        assert_eq!(cfg.as_ref().map(|c| c.site.lat), Some(47.0626));
    }

    #[test]
    fn overrides_replace_provider_fields() {
        let mut cfg = ServiceConfig::default();
        cfg.apply_overrides(|key| match key {
            ENV_API_KEY => Some("from-env".to_string()),
            ENV_SITE_ID => Some("site-env".to_string()),
            ENV_BASE_URL => Some("http://127.0.0.1:9/".to_string()),
            _ => None,
        });
        assert_eq!(cfg.provider.api_key, "from-env");
        assert_eq!(cfg.provider.site_id, "site-env");
        assert_eq!(cfg.provider.base_url, "http://127.0.0.1:9");
    }

    #[test]
    fn empty_override_is_ignored() {
        let mut cfg = with_credentials();
        cfg.apply_overrides(|_| Some("  ".to_string()));
        assert_eq!(cfg.provider.api_key, "key");
    }

    #[test]
    fn validation_catches_bad_horizon_default() {
        let mut cfg = with_credentials();
        cfg.provider.default_hours = 241;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "provider.default_hours"));
    }

    #[test]
    fn validation_catches_zero_capacity() {
        let mut cfg = with_credentials();
        cfg.system.capacity_kw = 0.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "system.capacity_kw"));
    }

    #[test]
    fn validation_catches_nan_capacity() {
        let mut cfg = with_credentials();
        cfg.system.capacity_kw = f64::NAN;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "system.capacity_kw"));
    }

    #[test]
    fn validation_catches_zero_timeout() {
        let mut cfg = with_credentials();
        cfg.provider.timeout_secs = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "provider.timeout_secs"));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let cfg = with_credentials();
        let dbg = format!("{:?}", cfg.provider);
        assert!(!dbg.contains("\"key\""));
        assert!(dbg.contains("<redacted>"));
    }
}
