//! Delivery backends for enriched entries.
//!
//! The logger depends only on the [`Transport`] trait: accept an entry and
//! report completion. Each transport gets its own worker task (see
//! [`worker`]) so a slow or failing backend never holds up the others.

pub mod console;
pub mod memory;
pub mod pagerduty;
pub mod slack;
pub mod worker;

pub use console::{ConsoleFormat, ConsoleTransport};
pub use memory::MemoryTransport;
pub use pagerduty::{PagerDutyConfig, PagerDutyTransport, Urgency};
pub use slack::{SlackConfig, SlackTransport};
pub use worker::{TransportReport, Worker, WorkerOutcome};

use crate::domain::{DispatchedEntry, LogLevel};
use crate::reliability::Retryable;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Delivery timeout")]
    Timeout,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Entry rejected: {0}")]
    Rejected(String),
}

impl Retryable for TransportError {
    fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(e) => !e.is_builder(),
            TransportError::Timeout => true,
            TransportError::Http { status, .. } => *status == 429 || *status >= 500,
            TransportError::Io(_) | TransportError::InvalidConfig(_) | TransportError::Rejected(_) => {
                false
            }
        }
    }
}

/// A pluggable delivery backend.
///
/// This trait is dyn-compatible by using boxed futures instead of `impl Future`.
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Entries below this level are never handed to the transport.
    fn min_level(&self) -> LogLevel;

    fn deliver(&self, entry: Arc<DispatchedEntry>) -> TransportFuture<'_>;

    /// Called once after the last entry, before the worker exits.
    fn flush(&self) -> TransportFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let server_error = TransportError::Http {
            status: 503,
            body: String::new(),
        };
        let rate_limited = TransportError::Http {
            status: 429,
            body: String::new(),
        };
        let bad_request = TransportError::Http {
            status: 400,
            body: "invalid_payload".to_string(),
        };

        assert!(server_error.is_retryable());
        assert!(rate_limited.is_retryable());
        assert!(TransportError::Timeout.is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(!TransportError::Rejected("closed".to_string()).is_retryable());
    }
}
