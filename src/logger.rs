//! Logger core: severity entry points, fan-out to transports, drain.

use crate::config::Config;
use crate::domain::{LogEntry, LogLevel, LoggerError};
use crate::pipeline::Enricher;
use crate::transport::{
    ConsoleTransport, PagerDutyTransport, SlackTransport, Transport, TransportReport, Worker,
};
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Construction-time settings of a logger instance.
#[derive(Debug, Clone)]
pub struct LoggerSettings {
    pub bot_identifier: Option<String>,
    pub exit_on_error: bool,
    pub drain_timeout: Duration,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            bot_identifier: None,
            exit_on_error: false,
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of [`Logger::drain`], one report per transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub transports: Vec<TransportReport>,
    /// Set when `exit_on_error` is enabled and a transport failed. The
    /// host is expected to terminate non-zero.
    pub exit_requested: bool,
}

impl DrainReport {
    pub fn has_failures(&self) -> bool {
        self.transports.iter().any(TransportReport::has_failures)
    }

    /// Whether the exit-on-error policy asks the process to stop.
    pub fn requires_exit(&self, exit_on_error: bool) -> bool {
        exit_on_error && self.has_failures()
    }

    pub fn transport(&self, name: &str) -> Option<&TransportReport> {
        self.transports.iter().find(|r| r.name == name)
    }
}

/// Structured severity logger.
///
/// Submissions never block: each entry is enriched on the caller's thread
/// and queued on every transport's worker. The transport set is fixed at
/// construction.
pub struct Logger {
    enricher: Enricher,
    settings: LoggerSettings,
    workers: Mutex<Vec<Worker>>,
    transport_names: Vec<String>,
    fatal: CancellationToken,
    draining: AtomicBool,
}

impl Logger {
    /// Creates a logger over an explicit set of transports.
    ///
    /// Spawns one delivery task per transport, so a tokio runtime must be
    /// running.
    pub fn new(
        settings: LoggerSettings,
        transports: Vec<Arc<dyn Transport>>,
    ) -> Result<Self, LoggerError> {
        tokio::runtime::Handle::try_current()
            .map_err(|e| LoggerError::Runtime(format!("Logger requires a tokio runtime: {e}")))?;

        let fatal = CancellationToken::new();
        let failure_signal = settings.exit_on_error.then(|| fatal.clone());

        let transport_names = transports.iter().map(|t| t.name().to_string()).collect();
        let workers = transports
            .into_iter()
            .map(|transport| Worker::spawn(transport, failure_signal.clone()))
            .collect();

        Ok(Self {
            enricher: Enricher::new(settings.bot_identifier.clone()),
            settings,
            workers: Mutex::new(workers),
            transport_names,
            fatal,
            draining: AtomicBool::new(false),
        })
    }

    /// Creates a logger with the transports enabled in `config`.
    pub fn from_config(config: &Config) -> Result<Self, LoggerError> {
        config.validate()?;

        let mut transports: Vec<Arc<dyn Transport>> = Vec::new();
        if config.console_enabled {
            transports.push(Arc::new(ConsoleTransport::stdout(
                config.console_level,
                config.console_format,
            )));
        }
        if let Some(slack) = config.slack_config() {
            transports.push(Arc::new(SlackTransport::new(slack)?));
        }
        if let Some(pagerduty) = config.pagerduty_config() {
            transports.push(Arc::new(PagerDutyTransport::new(pagerduty)?));
        }

        let logger = Self::new(config.logger_settings(), transports)?;
        info!(
            "Logger created (bot_identifier={}, transports=[{}])",
            logger.bot_identifier(),
            logger.transport_names.join(", ")
        );
        Ok(logger)
    }

    pub fn bot_identifier(&self) -> &str {
        self.enricher.bot_identifier()
    }

    pub fn transport_names(&self) -> &[String] {
        &self.transport_names
    }

    pub fn settings(&self) -> &LoggerSettings {
        &self.settings
    }

    /// Cancelled on the first delivery failure when `exit_on_error` is set.
    /// Hosts can await it to start their own shutdown.
    pub fn fatal_signal(&self) -> CancellationToken {
        self.fatal.clone()
    }

    pub fn debug(&self, entry: LogEntry) {
        self.log(LogLevel::Debug, entry);
    }

    pub fn info(&self, entry: LogEntry) {
        self.log(LogLevel::Info, entry);
    }

    pub fn warn(&self, entry: LogEntry) {
        self.log(LogLevel::Warn, entry);
    }

    pub fn error(&self, entry: LogEntry) {
        self.log(LogLevel::Error, entry);
    }

    /// Enriches `entry` and queues it on every transport.
    pub fn log(&self, level: LogLevel, entry: LogEntry) {
        if self.draining.load(Ordering::Acquire) {
            warn!(at = %entry.at, "Logger is drained, dropping entry: {}", entry.message);
            return;
        }

        let dispatched = Arc::new(self.enricher.enrich(level, entry));
        let workers = self.workers.lock();
        for worker in workers.iter() {
            worker.submit(&dispatched);
        }
    }

    /// Stops intake and waits until every transport has delivered what was
    /// queued, bounded by the configured drain timeout.
    ///
    /// With `exit_on_error` set and a failed transport, the report comes
    /// back with `exit_requested` so the host can terminate after flushing.
    /// Later calls return an empty report.
    pub async fn drain(&self) -> DrainReport {
        self.draining.store(true, Ordering::Release);
        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return DrainReport::default();
        }

        debug!("Draining {} transport(s)", workers.len());
        let deadline = tokio::time::Instant::now() + self.settings.drain_timeout;
        let transports = join_all(workers.into_iter().map(|w| w.finish(deadline))).await;
        let mut report = DrainReport {
            transports,
            exit_requested: false,
        };

        for transport in &report.transports {
            debug!(
                transport = %transport.name,
                "delivered={} failed={} filtered={} avg_latency={:?} outcome={:?}",
                transport.delivered,
                transport.failed,
                transport.filtered,
                transport.average_latency,
                transport.outcome
            );
        }

        if report.requires_exit(self.settings.exit_on_error) {
            error!("Log delivery failed and exit_on_error is set, requesting exit");
            report.exit_requested = true;
        }
        report
    }
}

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Installs the process-wide logger. Fails if one already exists.
pub fn init_global(config: &Config) -> Result<&'static Logger, LoggerError> {
    let logger = Logger::from_config(config)?;
    GLOBAL
        .set(logger)
        .map_err(|_| LoggerError::AlreadyInitialized)?;
    global()
}

/// Returns the process-wide logger, creating it from the environment on
/// first use.
pub fn global() -> Result<&'static Logger, LoggerError> {
    if let Some(logger) = GLOBAL.get() {
        return Ok(logger);
    }

    let config = Config::from_env()?;
    // Losing a creation race drops our instance; its workers exit with it.
    let _ = GLOBAL.set(Logger::from_config(&config)?);
    GLOBAL
        .get()
        .ok_or_else(|| LoggerError::Runtime("global logger unavailable".to_string()))
}

/// Drains the process-wide logger if it was ever created.
pub async fn drain_global() -> DrainReport {
    match GLOBAL.get() {
        Some(logger) => logger.drain().await,
        None => DrainReport::default(),
    }
}
