pub mod logging_system;
pub mod shutdown;

pub use logging_system::{InitializationError, LoggingSystem, setup_logging_safe};

use crate::config::Config;
use crate::domain::{ErrorValue, LogEntry, LogLevel};
use crate::logger::{DrainReport, Logger};
use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Emit structured bot log entries to the console, Slack and PagerDuty.
///
/// Without --at/--message, NDJSON entries are read from stdin until EOF.
#[derive(Parser, Debug, Clone)]
#[command(name = "bot-logger", author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    /// Severity of the entry given with --at/--message
    #[arg(long, default_value = "info")]
    pub level: LogLevel,

    /// Logical origin of the entry (component or bot name)
    #[arg(long, requires = "message")]
    pub at: Option<String>,

    /// Human-readable message
    #[arg(long, requires = "at")]
    pub message: Option<String>,

    /// Extra field; the value is parsed as JSON when possible
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,

    /// Error message to attach
    #[arg(long)]
    pub error: Option<String>,

    /// Mined transaction hash
    #[arg(long)]
    pub tx: Option<String>,
}

impl Cli {
    /// The entry described by flags, if any.
    pub fn entry(&self) -> anyhow::Result<Option<(LogLevel, LogEntry)>> {
        let (Some(at), Some(message)) = (&self.at, &self.message) else {
            return Ok(None);
        };

        let mut entry = LogEntry::new(at.clone(), message.clone());
        for field in &self.fields {
            let (key, value) = parse_field(field)?;
            entry.insert_field(key, value);
        }
        if let Some(error) = &self.error {
            entry = entry.error(ErrorValue::message(error.clone()));
        }
        if let Some(tx) = &self.tx {
            entry = entry.tx(tx.clone());
        }
        Ok(Some((self.level, entry)))
    }
}

/// Splits `key=value`; the value becomes JSON if it parses as JSON.
pub fn parse_field(field: &str) -> anyhow::Result<(String, Value)> {
    let (key, raw) = field
        .split_once('=')
        .with_context(|| format!("field '{field}' is not in KEY=VALUE form"))?;
    let key = key.trim();
    anyhow::ensure!(!key.is_empty(), "field '{field}' has an empty key");

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Submits one NDJSON line. Returns `false` if the line was skipped.
pub fn submit_line(logger: &Logger, line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            warn!("Skipping invalid JSON line: {e}");
            return false;
        }
    };

    match LogEntry::from_json(value) {
        Ok((level, entry)) => {
            logger.log(level.unwrap_or(LogLevel::Info), entry);
            true
        }
        Err(e) => {
            warn!("Skipping line: {e}");
            false
        }
    }
}

async fn forward_stdin(
    logger: &Logger,
    shutdown: &CancellationToken,
    fatal: &CancellationToken,
) -> anyhow::Result<u64> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut forwarded = 0;

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = fatal.cancelled() => {
                warn!("Transport failure with exit_on_error set, stopping intake");
                break;
            }
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    Some(line) => {
                        if submit_line(logger, &line) {
                            forwarded += 1;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    Ok(forwarded)
}

/// Runs the CLI: submit the flag entry or stream stdin, then drain.
pub async fn run(cli: Cli) -> anyhow::Result<DrainReport> {
    let config = cli
        .config
        .clone()
        .finalize()
        .context("invalid configuration")?;

    if let Err(e) = setup_logging_safe(config.log_level) {
        eprintln!("Warning: {e}");
    }

    let logger = Logger::from_config(&config).context("failed to create logger")?;

    match cli.entry()? {
        Some((level, entry)) => logger.log(level, entry),
        None => {
            let shutdown = CancellationToken::new();
            shutdown::spawn_signal_handler(shutdown.clone());
            let forwarded = forward_stdin(&logger, &shutdown, &logger.fatal_signal()).await?;
            info!("Forwarded {forwarded} entries from stdin");
        }
    }

    Ok(logger.drain().await)
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let report = run(cli).await?;
    if report.has_failures() {
        for transport in report.transports.iter().filter(|t| t.has_failures()) {
            warn!(
                "Transport {} finished with {} failed deliveries ({:?})",
                transport.name, transport.failed, transport.outcome
            );
        }
    }
    if report.exit_requested {
        anyhow::bail!("log delivery failed and exit_on_error is set");
    }
    Ok(())
}
