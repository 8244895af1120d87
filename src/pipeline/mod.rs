//! Enrichment pipeline applied to every entry before dispatch.
//!
//! Stages run in a fixed order: identifier tagging, error extraction,
//! serialization. The first two touch disjoint fields.

use crate::domain::{
    DispatchedEntry, EnrichedEntry, ErrorInfo, ErrorSummary, ErrorValue, LogEntry, LogLevel,
    is_reserved_key,
};
use serde_json::json;
use tracing::{error, warn};

/// Identifier used when no bot identifier is configured.
pub const NO_BOT_ID: &str = "NO_BOT_ID";

/// Replacement text for errors with nothing inspectable.
pub const UNEXTRACTABLE_ERROR: &str = "could not extract error info";

#[derive(Debug, Clone)]
pub struct Enricher {
    bot_identifier: String,
}

impl Enricher {
    pub fn new(bot_identifier: Option<String>) -> Self {
        let bot_identifier = bot_identifier
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| NO_BOT_ID.to_string());
        Self { bot_identifier }
    }

    pub fn bot_identifier(&self) -> &str {
        &self.bot_identifier
    }

    /// Runs all stages and produces the shared, wire-ready entry.
    pub fn enrich(&self, level: LogLevel, entry: LogEntry) -> DispatchedEntry {
        let LogEntry {
            at,
            message,
            error,
            tx,
            mut fields,
        } = entry;

        // `fields` is public, so reserved keys can bypass `insert_field`.
        fields.retain(|key, _| {
            let reserved = is_reserved_key(key);
            if reserved {
                warn!(at = %at, key = %key, "Discarding extra field that uses a reserved key");
            }
            !reserved
        });

        let mut enriched = EnrichedEntry {
            level,
            at,
            message,
            bot_identifier: None,
            error: None,
            tx,
            fields,
        };

        self.tag_identifier(&mut enriched);
        enriched.error = error.as_ref().map(extract_error);
        serialize(enriched)
    }

    /// Sets the identifier field, overwriting any previous value.
    pub fn tag_identifier(&self, entry: &mut EnrichedEntry) {
        entry.bot_identifier = Some(self.bot_identifier.clone());
    }
}

/// Flattens an error value into its human-readable summary.
pub fn extract_error(error: &ErrorValue) -> ErrorSummary {
    match error {
        ErrorValue::Single(info) => ErrorSummary::Single(extract_single(info)),
        ErrorValue::List(items) => {
            let mut flat = Vec::new();
            flatten_into(items, &mut flat);
            ErrorSummary::List(flat)
        }
    }
}

fn flatten_into(items: &[ErrorValue], out: &mut Vec<String>) {
    for item in items {
        match item {
            ErrorValue::Single(info) => out.push(extract_single(info)),
            ErrorValue::List(nested) => flatten_into(nested, out),
        }
    }
}

fn extract_single(info: &ErrorInfo) -> String {
    [&info.stack, &info.message, &info.display]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| UNEXTRACTABLE_ERROR.to_string())
}

/// Produces the canonical payload. Falls back to the fixed schema alone if
/// the extra fields cannot be encoded.
pub fn serialize(entry: EnrichedEntry) -> DispatchedEntry {
    match serde_json::to_string(&entry) {
        Ok(payload) => DispatchedEntry { entry, payload },
        Err(e) => {
            error!(at = %entry.at, "Failed to serialize log entry, sending minimal payload: {e}");
            let payload = json!({
                "level": entry.level,
                "at": entry.at,
                "message": entry.message,
                "bot-identifier": entry.bot_identifier,
            })
            .to_string();
            DispatchedEntry { entry, payload }
        }
    }
}
