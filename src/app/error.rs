use thiserror::Error;

/// Failures that end the whole run. Per-file problems never surface here.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to discover source databases: {0}")]
    Discovery(String),
}

impl AppError {
    pub fn logging_init<E: std::fmt::Display>(error: E) -> Self {
        Self::LoggingInit(error.to_string())
    }

    pub fn config<E: std::fmt::Display>(error: E) -> Self {
        Self::Config(error.to_string())
    }

    pub fn discovery<E: std::fmt::Display>(error: E) -> Self {
        Self::Discovery(error.to_string())
    }
}
