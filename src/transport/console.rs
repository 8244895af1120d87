use super::{Transport, TransportFuture};
use crate::domain::{DispatchedEntry, LogLevel};
use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;

/// Line format written by the console transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// Canonical JSON payload, one entry per line (default, log aggregators)
    #[default]
    Json,
    /// Timestamped human-readable line
    Pretty,
}

/// Writes every entry to stdout or another sink.
pub struct ConsoleTransport {
    min_level: LogLevel,
    format: ConsoleFormat,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleTransport {
    pub fn stdout(min_level: LogLevel, format: ConsoleFormat) -> Self {
        Self::with_writer(min_level, format, std::io::stdout())
    }

    pub fn with_writer<W>(min_level: LogLevel, format: ConsoleFormat, writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            min_level,
            format,
            sink: Mutex::new(Box::new(writer)),
        }
    }

    pub fn format_line(&self, entry: &DispatchedEntry) -> String {
        match self.format {
            ConsoleFormat::Json => entry.payload.clone(),
            ConsoleFormat::Pretty => pretty_line(entry),
        }
    }
}

fn pretty_line(dispatched: &DispatchedEntry) -> String {
    let entry = &dispatched.entry;
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut line = format!(
        "{timestamp} [{:<5}] {}: {}",
        entry.level.as_str().to_uppercase(),
        entry.at,
        entry.message
    );

    // Everything except the fixed header goes into a trailing JSON object.
    if let Ok(Value::Object(mut rest)) = serde_json::to_value(entry) {
        for key in ["level", "at", "message"] {
            rest.remove(key);
        }
        if !rest.is_empty() {
            line.push(' ');
            line.push_str(&Value::Object(rest).to_string());
        }
    }
    line
}

impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }

    fn deliver(&self, entry: Arc<DispatchedEntry>) -> TransportFuture<'_> {
        Box::pin(async move {
            let line = self.format_line(&entry);
            let mut sink = self.sink.lock();
            writeln!(sink, "{line}")?;
            Ok(())
        })
    }

    fn flush(&self) -> TransportFuture<'_> {
        Box::pin(async move {
            self.sink.lock().flush()?;
            Ok(())
        })
    }
}
