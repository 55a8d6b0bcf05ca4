use tracing_subscriber::{EnvFilter, fmt};

use crate::app::AppError;

const DEFAULT_DIRECTIVES: &str = "info";

/// Logs go to stderr; `RUST_LOG` overrides the default level
/// (`RUST_LOG=report_archiver=debug` shows per-file progress).
pub fn init() -> Result<(), AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(AppError::logging_init)
}
