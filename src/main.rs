//! PV forecast service entry point: CLI, config, logging, and server wiring.

use std::net::{IpAddr, SocketAddr};
use std::process;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pv_forecast::api::{self, AppState};
use pv_forecast::cli;
use pv_forecast::config::ServiceConfig;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pv_forecast=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Loads config: file if given, else built-in defaults; then env overrides
/// and CLI overrides.
fn load_config(opts: &cli::CliOptions) -> Result<ServiceConfig, String> {
    let mut config = match opts.config {
        Some(ref path) => ServiceConfig::from_toml_file(path).map_err(|e| e.to_string())?,
        None => ServiceConfig::default(),
    };
    config.apply_env();

    if let Some(ref bind) = opts.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = opts.port {
        config.server.port = port;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        return Err(joined);
    }
    Ok(config)
}

fn main() {
    init_tracing();

    let opts = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(1);
        }
    };

    let config = match load_config(&opts) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let ip: IpAddr = match config.server.bind.parse() {
        Ok(ip) => ip,
        Err(e) => {
            eprintln!("error: invalid bind address \"{}\": {e}", config.server.bind);
            process::exit(1);
        }
    };
    let addr = SocketAddr::new(ip, config.server.port);

    let state = match AppState::from_config(&config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            eprintln!("error: failed to build HTTP client: {e}");
            process::exit(1);
        }
    };

    info!(
        site_id = %config.provider.site_id,
        base_url = %config.provider.base_url,
        default_hours = config.provider.default_hours,
        "starting pv-forecast"
    );

    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("error: failed to create tokio runtime: {e}");
        process::exit(1);
    });
    if let Err(e) = rt.block_on(api::serve(state, addr)) {
        error!("server error: {e}");
        process::exit(1);
    }
}
