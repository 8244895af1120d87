use super::{Transport, TransportError, TransportFuture};
use crate::domain::{DispatchedEntry, EnrichedEntry, ErrorSummary, LogLevel};
use crate::reliability::{RetryConfig, RetryPolicy};
use reqwest::{Client, ClientBuilder};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Slack rejects section text longer than 3000 characters.
const MAX_SECTION_CHARS: usize = 2900;

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub webhook_url: String,
    pub min_level: LogLevel,
    /// Block explorer base URL used to link transaction hashes.
    pub explorer_url: Option<String>,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            min_level: LogLevel::Info,
            explorer_url: None,
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

/// Posts entries to a Slack incoming webhook.
pub struct SlackTransport {
    client: Client,
    webhook: Url,
    config: SlackConfig,
    policy: RetryPolicy,
}

impl SlackTransport {
    pub fn new(config: SlackConfig) -> Result<Self, TransportError> {
        let webhook: Url = config.webhook_url.parse().map_err(|e| {
            TransportError::InvalidConfig(format!("Invalid Slack webhook URL: {e}"))
        })?;

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(concat!("bot-logger/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        let policy = RetryPolicy::new(config.retry.clone());
        Ok(Self {
            client,
            webhook,
            config,
            policy,
        })
    }

    /// Renders an entry as a Slack message with mrkdwn blocks.
    pub fn build_payload(&self, entry: &EnrichedEntry) -> Value {
        let at = escape_mrkdwn(&entry.at);
        let message = escape_mrkdwn(&entry.message);
        let header = format!(
            "*[{}] {at}*\n{message}",
            entry.level.as_str().to_uppercase()
        );

        let mut details = Vec::new();
        for (key, value) in &entry.fields {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            details.push(format!(
                "• *{}*: {}",
                escape_mrkdwn(key),
                escape_mrkdwn(&rendered)
            ));
        }
        if let Some(tx) = &entry.tx {
            details.push(format!("• *tx*: {}", self.tx_link(&tx.hash)));
        }

        let mut blocks = vec![section(&header)];
        if !details.is_empty() {
            blocks.push(section(&details.join("\n")));
        }
        if let Some(error) = &entry.error {
            let text = match error {
                ErrorSummary::Single(s) => s.clone(),
                ErrorSummary::List(items) => items.join("\n"),
            };
            blocks.push(section(&format!("```{}```", escape_mrkdwn(&text))));
        }
        if let Some(bot) = &entry.bot_identifier {
            blocks.push(json!({
                "type": "context",
                "elements": [{"type": "mrkdwn", "text": format!("bot: {}", escape_mrkdwn(bot))}]
            }));
        }

        json!({
            "text": format!("[{}] {at}: {message}", entry.level.as_str().to_uppercase()),
            "blocks": blocks,
        })
    }

    fn tx_link(&self, hash: &str) -> String {
        let hash = escape_mrkdwn(hash);
        match &self.config.explorer_url {
            Some(base) => format!("<{}/tx/{hash}|{hash}>", base.trim_end_matches('/')),
            None => hash.to_string(),
        }
    }

    async fn post(&self, payload: &Value) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.webhook.clone())
            .json(payload)
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

fn section(text: &str) -> Value {
    json!({
        "type": "section",
        "text": {"type": "mrkdwn", "text": truncate(text, MAX_SECTION_CHARS)}
    })
}

/// Slack treats `<...>` as links and mentions; `&` starts an entity.
fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

impl Transport for SlackTransport {
    fn name(&self) -> &str {
        "slack"
    }

    fn min_level(&self) -> LogLevel {
        self.config.min_level
    }

    fn deliver(&self, entry: Arc<DispatchedEntry>) -> TransportFuture<'_> {
        Box::pin(async move {
            let payload = self.build_payload(&entry.entry);
            self.policy
                .run("slack delivery", || self.post(&payload))
                .await
        })
    }
}
