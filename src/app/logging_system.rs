//! Diagnostics for the logger itself, routed through `tracing` to stderr so
//! stdout stays reserved for the console transport.

use crate::config::DiagnosticLevel;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Logging initialization failed: {details}")]
    LoggingInitFailed { details: String },
}

/// One `target=level` filter directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: DiagnosticLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: DiagnosticLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

pub struct LoggingSystem {
    directives: Arc<RwLock<Vec<LogDirective>>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// HTTP client internals stay quiet unless asked for explicitly.
    pub fn add_default_directives(&self) {
        let mut directives = self.directives.write();
        for target in ["hyper", "hyper_util", "reqwest", "h2", "rustls"] {
            directives.push(LogDirective::new(target, DiagnosticLevel::Warn));
        }
    }

    pub fn build_filter_string(&self, default_level: DiagnosticLevel) -> String {
        let directives = self.directives.read();
        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));
        filter_parts.join(",")
    }

    /// Installs the global subscriber. `RUST_LOG`, when set, wins over the
    /// configured level.
    pub fn initialize_tracing(
        &self,
        default_level: DiagnosticLevel,
    ) -> Result<(), InitializationError> {
        let env_filter = match std::env::var("RUST_LOG") {
            Ok(filter) if !filter.trim().is_empty() => EnvFilter::try_new(&filter),
            _ => EnvFilter::try_new(self.build_filter_string(default_level)),
        }
        .map_err(|e| InitializationError::LoggingInitFailed {
            details: format!("Failed to create EnvFilter: {e}"),
        })?;

        let subscriber = tracing_subscriber::registry().with(env_filter).with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .compact(),
        );

        tracing::subscriber::set_global_default(subscriber).map_err(|e| {
            InitializationError::LoggingInitFailed {
                details: format!("Failed to set global tracing subscriber: {e}"),
            }
        })
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets up diagnostics once per process. Later calls report the outcome of
/// the first one.
pub fn setup_logging_safe(level: DiagnosticLevel) -> Result<(), InitializationError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let outcome = INIT.get_or_init(|| {
        let logging_system = LoggingSystem::new();
        logging_system.add_default_directives();
        logging_system
            .initialize_tracing(level)
            .map_err(|e| e.to_string())
    });

    outcome
        .clone()
        .map_err(|details| InitializationError::LoggingInitFailed { details })
}
