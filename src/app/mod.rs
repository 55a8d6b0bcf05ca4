pub mod config;
mod error;
mod logging;
pub mod runtime;

pub use error::AppError;

pub fn run() -> Result<(), AppError> {
    logging::init()?;

    let config = config::AppConfig::from_env_args()?;

    tracing::info!(
        source = %config.source_root.display(),
        target = %config.target_root.display(),
        days = %config.offset_text,
        "report archiver initialized"
    );

    runtime::run(config)
}
