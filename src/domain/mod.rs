//! Domain layer for bot-logger.
//!
//! Contains the canonical types shared across all modules:
//! - `LogEntry`: what calling code submits
//! - `EnrichedEntry` / `DispatchedEntry`: what transports receive
//! - `ErrorValue` / `ErrorSummary`: nested errors and their flattened form
//! - `LogLevel`: severity (Debug/Info/Warn/Error)
//! - `LoggerError`: top-level error type

pub mod error;
pub mod error_value;
pub mod log_entry;
pub mod log_level;

pub use error::LoggerError;
pub use error_value::{ErrorInfo, ErrorSummary, ErrorValue};
pub use log_entry::{
    BOT_IDENTIFIER_KEY, DispatchedEntry, EnrichedEntry, LogEntry, RESERVED_KEYS, TxInfo,
    is_reserved_key,
};
pub use log_level::LogLevel;
