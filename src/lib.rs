#![warn(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Millisecond durations fit in u64
    clippy::cast_precision_loss,      // Jitter math on millisecond values
    clippy::cast_sign_loss,           // Jittered delays are non-negative
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. TransportError in transport module
    clippy::must_use_candidate        // Annotated selectively on critical APIs
)]

//! Structured severity logger for long-running bots.
//!
//! Entries are submitted at one of four levels, enriched with the bot
//! identifier and a flattened error summary, serialized once, and fanned out
//! to the configured transports (console, Slack, PagerDuty). Call
//! [`Logger::drain`] before the process exits so slow transports can finish.

pub mod app;
pub mod config;
pub mod domain;
pub mod logger;
pub mod pipeline;
pub mod reliability;
pub mod transport;

// Re-export main types for easy access
pub use config::Config;
pub use domain::{ErrorValue, LogEntry, LogLevel, LoggerError};
pub use logger::{DrainReport, Logger, LoggerSettings, drain_global, global, init_global};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
