use super::slack::truncate;
use super::{Transport, TransportError, TransportFuture};
use crate::domain::{DispatchedEntry, EnrichedEntry, LogLevel};
use crate::pipeline::NO_BOT_ID;
use crate::reliability::{RetryConfig, RetryPolicy};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_EVENTS_ENDPOINT: &str = "https://events.pagerduty.com/v2/enqueue";

/// Events API v2 caps the summary at 1024 characters.
const MAX_SUMMARY_CHARS: usize = 1024;

/// How urgently a human must respond to an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    High,
}

impl Urgency {
    pub fn for_level(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Urgency::High,
            LogLevel::Debug | LogLevel::Info | LogLevel::Warn => Urgency::Low,
        }
    }
}

/// Events API severity for a log level.
pub fn severity_for_level(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug | LogLevel::Info => "info",
        LogLevel::Warn => "warning",
        LogLevel::Error => "error",
    }
}

#[derive(Debug, Clone)]
pub struct PagerDutyConfig {
    pub routing_key: String,
    pub endpoint: String,
    pub min_level: LogLevel,
    /// Incident source when the entry carries no bot identifier.
    pub source: Option<String>,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for PagerDutyConfig {
    fn default() -> Self {
        Self {
            routing_key: String::new(),
            endpoint: DEFAULT_EVENTS_ENDPOINT.to_string(),
            min_level: LogLevel::Warn,
            source: None,
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

/// Opens PagerDuty incidents through the Events API v2.
///
/// Escalation when nobody acknowledges is left to the PagerDuty service.
pub struct PagerDutyTransport {
    client: Client,
    endpoint: Url,
    routing_key: String,
    min_level: LogLevel,
    source: String,
    policy: RetryPolicy,
}

impl PagerDutyTransport {
    pub fn new(config: PagerDutyConfig) -> Result<Self, TransportError> {
        if config.routing_key.trim().is_empty() {
            return Err(TransportError::InvalidConfig(
                "PagerDuty routing key must not be empty".to_string(),
            ));
        }
        let endpoint: Url = config.endpoint.parse().map_err(|e| {
            TransportError::InvalidConfig(format!("Invalid PagerDuty endpoint: {e}"))
        })?;

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(concat!("bot-logger/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        let source = config.source.unwrap_or_else(|| {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "bot-logger".to_string())
        });

        Ok(Self {
            client,
            endpoint,
            routing_key: config.routing_key,
            min_level: config.min_level,
            source,
            policy: RetryPolicy::new(config.retry),
        })
    }

    /// Builds the `trigger` event for an entry.
    pub fn build_event(&self, entry: &EnrichedEntry) -> Value {
        let source = entry
            .bot_identifier
            .as_deref()
            .filter(|id| *id != NO_BOT_ID)
            .unwrap_or(self.source.as_str());

        let mut details = match serde_json::to_value(entry) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        details.insert(
            "urgency".to_string(),
            json!(Urgency::for_level(entry.level)),
        );

        json!({
            "routing_key": self.routing_key,
            "event_action": "trigger",
            "payload": {
                "summary": truncate(&format!("[{}] {}", entry.at, entry.message), MAX_SUMMARY_CHARS),
                "source": source,
                "severity": severity_for_level(entry.level),
                "component": entry.at,
                "custom_details": details,
            }
        })
    }

    async fn post(&self, event: &Value) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(event)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Network(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

impl Transport for PagerDutyTransport {
    fn name(&self) -> &str {
        "pagerduty"
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }

    fn deliver(&self, entry: Arc<DispatchedEntry>) -> TransportFuture<'_> {
        Box::pin(async move {
            let event = self.build_event(&entry.entry);
            self.policy
                .run("pagerduty delivery", || self.post(&event))
                .await
        })
    }
}
