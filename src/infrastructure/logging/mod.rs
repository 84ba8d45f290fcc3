// Logging module - Logging infrastructure
use crate::domain::error::{FilterCtlError, FilterCtlResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging system.
///
/// `RUST_LOG` wins over `level`; `verbose` forces debug output for this
/// crate. Everything goes to stderr so command output stays parseable.
pub fn init_logging(level: &str, verbose: bool) -> FilterCtlResult<()> {
    let default_directive = if verbose {
        "filterctl=debug,warn".to_string()
    } else {
        format!("filterctl={},warn", level)
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default_directive))
        .map_err(|e| FilterCtlError::Config {
            message: format!("Invalid log level '{}': {}", level, e),
        })?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbose)
                .with_level(true)
                .with_thread_names(verbose)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .map_err(|e| FilterCtlError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("FilterCtl logging system initialized");
    Ok(())
}
