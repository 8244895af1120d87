use super::error::LoggerError;
use super::error_value::{ErrorSummary, ErrorValue};
use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Key under which enrichment stores the process identifier.
pub const BOT_IDENTIFIER_KEY: &str = "bot-identifier";

/// Top-level keys owned by the fixed entry schema. Extra fields may not use them.
pub const RESERVED_KEYS: [&str; 6] = ["level", "at", "message", BOT_IDENTIFIER_KEY, "error", "tx"];

/// Placeholder origin for untyped entries that arrive without `at`.
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Placeholder text for untyped entries that arrive without `message`.
pub const MISSING_MESSAGE: &str = "no message provided";

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// A mined transaction referenced by an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInfo {
    pub hash: String,
}

/// A log entry as built by calling code, before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub at: String,
    pub message: String,
    pub error: Option<ErrorValue>,
    pub tx: Option<TxInfo>,
    pub fields: Map<String, Value>,
}

impl LogEntry {
    pub fn new(at: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            at: at.into(),
            message: message.into(),
            error: None,
            tx: None,
            fields: Map::new(),
        }
    }

    /// Adds an extra top-level field. Reserved keys are dropped.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_field(key, value);
        self
    }

    /// Adds every field of `fields`, dropping reserved keys.
    pub fn fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in fields {
            self.insert_field(key, value);
        }
        self
    }

    /// Returns `false` when `key` collides with the entry schema and the
    /// value was discarded.
    pub fn insert_field(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        if is_reserved_key(&key) {
            warn!(at = %self.at, key = %key, "Discarding extra field that uses a reserved key");
            return false;
        }
        self.fields.insert(key, value.into());
        true
    }

    pub fn error(mut self, error: impl Into<ErrorValue>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn tx(mut self, hash: impl Into<String>) -> Self {
        self.tx = Some(TxInfo { hash: hash.into() });
        self
    }

    /// Builds an entry from an untyped JSON object.
    ///
    /// A `level` member is returned separately so line-oriented input can
    /// carry its own severity. Missing `at`/`message` are replaced with
    /// placeholders instead of rejecting the entry.
    pub fn from_json(value: Value) -> Result<(Option<LogLevel>, Self), LoggerError> {
        let Value::Object(mut map) = value else {
            return Err(LoggerError::InvalidEntry(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        };

        let level = match map.remove("level") {
            Some(Value::String(s)) => match s.parse::<LogLevel>() {
                Ok(level) => Some(level),
                Err(e) => {
                    warn!("Ignoring entry level: {e}");
                    None
                }
            },
            Some(other) => {
                warn!("Ignoring non-string entry level: {other}");
                None
            }
            None => None,
        };

        let at = match take_text(&mut map, "at") {
            Some(at) => at,
            None => {
                warn!("Entry is missing `at`, using placeholder");
                UNKNOWN_ORIGIN.to_string()
            }
        };
        let message = match take_text(&mut map, "message") {
            Some(message) => message,
            None => {
                warn!(at = %at, "Entry is missing `message`, using placeholder");
                MISSING_MESSAGE.to_string()
            }
        };

        let error = map.remove("error").map(|e| ErrorValue::from_json(&e));
        let tx = match map.remove("tx") {
            Some(Value::String(hash)) => Some(TxInfo { hash }),
            Some(Value::Object(tx)) => tx
                .get("hash")
                .and_then(Value::as_str)
                .map(|hash| TxInfo { hash: hash.to_string() }),
            _ => None,
        };
        // An identifier from a previous enrichment is re-applied by the pipeline.
        map.remove(BOT_IDENTIFIER_KEY);

        Ok((
            level,
            Self {
                at,
                message,
                error,
                tx,
                fields: map,
            },
        ))
    }
}

/// Removes `key` as text. `null` counts as missing, other scalars and
/// containers keep their JSON rendering.
fn take_text(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// An entry after the enrichment pipeline. This is the shape every
/// transport sees.
///
/// Serializes as one flat JSON object: the fixed schema first, then the
/// caller's extra fields at top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEntry {
    pub level: LogLevel,
    pub at: String,
    pub message: String,
    #[serde(
        rename = "bot-identifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bot_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx: Option<TxInfo>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// An enriched entry plus its canonical JSON payload.
///
/// Built once per submission and shared read-only with every transport.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedEntry {
    pub entry: EnrichedEntry,
    pub payload: String,
}

impl DispatchedEntry {
    pub fn level(&self) -> LogLevel {
        self.entry.level
    }
}
