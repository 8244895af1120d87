use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inspectable parts of a single error value.
///
/// Any combination may be missing. Extraction prefers `stack`, then
/// `message`, then `display`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    pub stack: Option<String>,
    pub message: Option<String>,
    pub display: Option<String>,
}

/// An error attached to a log entry: either one error or an arbitrarily
/// nested list of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorValue {
    Single(ErrorInfo),
    List(Vec<ErrorValue>),
}

/// Flattened, human-readable form of an [`ErrorValue`].
///
/// A single error stays a single string; any list, however deeply nested,
/// becomes one flat list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorSummary {
    Single(String),
    List(Vec<String>),
}

impl ErrorValue {
    /// Error carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        ErrorValue::Single(ErrorInfo {
            message: Some(message.into()),
            ..ErrorInfo::default()
        })
    }

    /// Error carrying a stack trace (and optionally the message it belongs to).
    pub fn with_stack(message: Option<String>, stack: impl Into<String>) -> Self {
        ErrorValue::Single(ErrorInfo {
            stack: Some(stack.into()),
            message,
            display: None,
        })
    }

    /// Captures a Rust error. The source chain stands in for a stack trace
    /// when the error has at least one cause.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let message = err.to_string();
        let mut stack = message.clone();
        let mut has_cause = false;
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            has_cause = true;
            source = cause.source();
        }

        ErrorValue::Single(ErrorInfo {
            stack: has_cause.then_some(stack),
            message: Some(message),
            display: None,
        })
    }

    /// Builds an error value from untyped JSON, as received on the CLI.
    ///
    /// Objects contribute their `stack` and `message` string members, arrays
    /// become lists, scalars keep their string representation. `null` and
    /// objects without either member carry nothing inspectable.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => ErrorValue::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => {
                let member = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_owned);
                ErrorValue::Single(ErrorInfo {
                    stack: member("stack"),
                    message: member("message"),
                    display: None,
                })
            }
            Value::String(s) => ErrorValue::Single(ErrorInfo {
                display: Some(s.clone()),
                ..ErrorInfo::default()
            }),
            Value::Number(_) | Value::Bool(_) => ErrorValue::Single(ErrorInfo {
                display: Some(value.to_string()),
                ..ErrorInfo::default()
            }),
            Value::Null => ErrorValue::Single(ErrorInfo::default()),
        }
    }
}

impl From<anyhow::Error> for ErrorValue {
    fn from(err: anyhow::Error) -> Self {
        ErrorValue::Single(ErrorInfo {
            stack: Some(format!("{err:?}")),
            message: Some(err.to_string()),
            display: None,
        })
    }
}

impl From<&str> for ErrorValue {
    fn from(message: &str) -> Self {
        ErrorValue::message(message)
    }
}

impl From<String> for ErrorValue {
    fn from(message: String) -> Self {
        ErrorValue::message(message)
    }
}

impl From<Vec<ErrorValue>> for ErrorValue {
    fn from(items: Vec<ErrorValue>) -> Self {
        ErrorValue::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fmt;

    #[derive(Debug)]
    struct Leaf;

    impl fmt::Display for Leaf {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection reset")
        }
    }

    impl std::error::Error for Leaf {}

    #[derive(Debug)]
    struct Wrapper(Leaf);

    impl fmt::Display for Wrapper {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("rpc call failed")
        }
    }

    impl std::error::Error for Wrapper {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_from_error_without_cause_has_no_stack() {
        let value = ErrorValue::from_error(&Leaf);
        assert_eq!(value, ErrorValue::message("connection reset"));
    }

    #[test]
    fn test_from_error_renders_cause_chain() {
        let ErrorValue::Single(info) = ErrorValue::from_error(&Wrapper(Leaf)) else {
            panic!("expected a single error");
        };
        assert_eq!(info.message.as_deref(), Some("rpc call failed"));
        assert_eq!(
            info.stack.as_deref(),
            Some("rpc call failed\n    caused by: connection reset")
        );
    }

    #[test]
    fn test_from_json_shapes() {
        let value = ErrorValue::from_json(&json!([
            {"message": "a", "stack": "Error: a\n  at x"},
            ["b", 7],
            null
        ]));

        let ErrorValue::List(items) = value else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(
            items[0],
            ErrorValue::with_stack(Some("a".to_string()), "Error: a\n  at x")
        );
        assert!(matches!(&items[1], ErrorValue::List(inner) if inner.len() == 2));
        assert_eq!(items[2], ErrorValue::Single(ErrorInfo::default()));
    }

    #[test]
    fn test_anyhow_error_keeps_context() {
        let err = anyhow::anyhow!("disk full").context("failed to persist state");
        let ErrorValue::Single(info) = ErrorValue::from(err) else {
            panic!("expected a single error");
        };
        assert_eq!(info.message.as_deref(), Some("failed to persist state"));
        assert!(info.stack.unwrap().contains("disk full"));
    }
}
