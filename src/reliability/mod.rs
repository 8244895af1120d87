pub mod retry;
pub mod stats;

pub use retry::{RetryConfig, RetryError, RetryPolicy, RetryStrategy, Retryable};
pub use stats::{DeliveryStats, DeliverySnapshot};
