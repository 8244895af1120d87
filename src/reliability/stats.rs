use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Per-transport delivery counters, updated by the transport's worker.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    filtered: AtomicU64,
    total_latency_ms: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliverySnapshot {
    pub delivered: u64,
    pub failed: u64,
    pub filtered: u64,
    pub average_latency: Duration,
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_delivery(&self, success: bool, latency: Duration) {
        self.total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
        if success {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliverySnapshot {
        let delivered = self.delivered.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let attempts = delivered + failed;
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);

        let average_latency = if attempts > 0 {
            Duration::from_millis(total_latency_ms / attempts)
        } else {
            Duration::ZERO
        };

        DeliverySnapshot {
            delivered,
            failed,
            filtered: self.filtered.load(Ordering::Relaxed),
            average_latency,
        }
    }
}
