use std::env;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter directives, e.g. `loadstone=debug`.
pub const LOG_ENV: &str = "LOADSTONE_LOG";
/// `compact` (default) or `json`.
pub const LOG_FORMAT_ENV: &str = "LOADSTONE_LOG_FORMAT";

/// Install the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "loadstone=debug,info"
        } else {
            "loadstone=info,warn"
        })
    });

    let format = env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_ansi(false))
            .try_init(),
        _ => registry.with(fmt::layer().compact()).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
