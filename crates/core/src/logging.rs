//! Tracing initialisation for native hosts
//!
//! Browser builds initialise logging through `kolabo-frontend-common`.

use crate::config::ClientConfig;
use crate::error::{CoreError, CoreResult};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise a global fmt subscriber
///
/// `RUST_LOG` takes precedence; otherwise the configured level is used,
/// falling back to `info` when it does not parse.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init_tracing(config: &ClientConfig) -> CoreResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| CoreError::invalid_config(format!("tracing already initialised: {e}")))
}
