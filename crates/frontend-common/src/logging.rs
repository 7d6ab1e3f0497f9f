//! Browser console logging

use kolabo_core::{ClientConfig, CoreError, CoreResult};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_web::MakeWebConsoleWriter;

/// Route `tracing` events to the browser console at the configured level
///
/// # Errors
///
/// Returns an error if the level is unknown or a subscriber is already set
pub fn init_logging(config: &ClientConfig) -> CoreResult<()> {
    let level = Level::from_str(&config.log_level).map_err(|_| {
        CoreError::invalid_config(format!("unknown log level: {}", config.log_level))
    })?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new());

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(fmt_layer)
        .try_init()
        .map_err(|e| CoreError::invalid_config(format!("tracing already initialised: {e}")))
}
