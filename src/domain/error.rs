use thiserror::Error;

/// Top-level error type for the logger.
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Global logger already initialized")]
    AlreadyInitialized,
}
