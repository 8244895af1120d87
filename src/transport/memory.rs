use super::{Transport, TransportError, TransportFuture};
use crate::domain::{DispatchedEntry, LogLevel};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Transport that keeps every delivered entry in memory.
///
/// Useful for tests and for callers that want to inspect what was logged.
/// Delivery can be slowed down or made to fail.
pub struct MemoryTransport {
    name: String,
    min_level: LogLevel,
    delay: Option<Duration>,
    entries: Mutex<Vec<Arc<DispatchedEntry>>>,
    should_fail: AtomicBool,
    flushed: AtomicBool,
}

impl MemoryTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_level: LogLevel::Debug,
            delay: None,
            entries: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
            flushed: AtomicBool::new(false),
        }
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<Arc<DispatchedEntry>> {
        self.entries.lock().clone()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.payload.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn was_flushed(&self) -> bool {
        self.flushed.load(Ordering::SeqCst)
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }

    fn deliver(&self, entry: Arc<DispatchedEntry>) -> TransportFuture<'_> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.should_fail.load(Ordering::SeqCst) {
                return Err(TransportError::Rejected(format!(
                    "{} configured to fail",
                    self.name
                )));
            }
            self.entries.lock().push(entry);
            Ok(())
        })
    }

    fn flush(&self) -> TransportFuture<'_> {
        Box::pin(async move {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}
