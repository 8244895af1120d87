use super::serde_helpers::{load_env_path_opt, load_env_string, load_env_string_opt, load_env_var};
use super::{ConfigError, DiagnosticLevel};
use crate::domain::LogLevel;
use crate::logger::LoggerSettings;
use crate::reliability::RetryConfig;
use crate::transport::pagerduty::DEFAULT_EVENTS_ENDPOINT;
use crate::transport::{ConsoleFormat, PagerDutyConfig, SlackConfig};
use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Identifier attached to every entry as `bot-identifier`
    #[arg(long, env = "BOT_IDENTIFIER")]
    pub bot_identifier: Option<String>,

    /// Exit non-zero after draining if any transport failed
    #[arg(long, env = "LOGGER_EXIT_ON_ERROR")]
    pub exit_on_error: bool,

    /// Upper bound for drain() in seconds
    #[arg(long, env = "DRAIN_TIMEOUT_SECS", default_value = "30")]
    pub drain_timeout_secs: u64,

    /// Write entries to stdout
    #[arg(long, env = "CONSOLE_ENABLED", default_value = "true", action = ArgAction::Set)]
    pub console_enabled: bool,

    /// Console line format
    #[arg(long, env = "CONSOLE_FORMAT", default_value = "json")]
    pub console_format: ConsoleFormat,

    /// Lowest level written to the console
    #[arg(long, env = "CONSOLE_LEVEL", default_value = "debug")]
    pub console_level: LogLevel,

    /// Slack incoming webhook URL (Slack transport disabled if unset)
    #[arg(long, env = "SLACK_WEBHOOK")]
    pub slack_webhook: Option<String>,

    /// Lowest level posted to Slack
    #[arg(long, env = "SLACK_LEVEL", default_value = "info")]
    pub slack_level: LogLevel,

    /// PagerDuty Events API v2 routing key (paging disabled if unset)
    #[arg(long, env = "PAGERDUTY_ROUTING_KEY")]
    pub pagerduty_routing_key: Option<String>,

    /// PagerDuty Events API endpoint
    #[arg(long, env = "PAGERDUTY_ENDPOINT", default_value = DEFAULT_EVENTS_ENDPOINT)]
    pub pagerduty_endpoint: String,

    /// Lowest level that opens an incident
    #[arg(long, env = "PAGERDUTY_LEVEL", default_value = "warn")]
    pub pagerduty_level: LogLevel,

    /// Block explorer base URL for transaction links
    #[arg(long, env = "BLOCK_EXPLORER_URL")]
    pub explorer_url: Option<String>,

    /// HTTP request timeout for webhook transports in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "10")]
    pub http_timeout_secs: u64,

    /// Verbosity of the logger's own diagnostics (stderr)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: DiagnosticLevel,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub drain_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub http_timeout: Duration,

    /// Retry configuration for webhook transports (file only)
    #[serde(rename = "retry")]
    #[arg(skip)]
    pub retry_config: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_identifier: None,
            exit_on_error: false,
            drain_timeout_secs: 30,
            console_enabled: true,
            console_format: ConsoleFormat::Json,
            console_level: LogLevel::Debug,
            slack_webhook: None,
            slack_level: LogLevel::Info,
            pagerduty_routing_key: None,
            pagerduty_endpoint: DEFAULT_EVENTS_ENDPOINT.to_string(),
            pagerduty_level: LogLevel::Warn,
            explorer_url: None,
            http_timeout_secs: 10,
            log_level: DiagnosticLevel::Warn,
            config_file: None,
            drain_timeout: Duration::from_secs(30),
            http_timeout: Duration::from_secs(10),
            retry_config: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Parses CLI args (with env fallbacks). A `--config-file` replaces them.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Config::try_parse_from(args)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?
            .finalize()
    }

    /// Completes a parsed configuration: loads `config_file` if given,
    /// derives durations and validates.
    pub fn finalize(mut self) -> Result<Self, ConfigError> {
        if let Some(path) = self.config_file.clone() {
            return Self::from_file(path);
        }
        self.post_process()?;
        self.validate()?;
        Ok(self)
    }

    /// Reads the process environment only. Used for the lazily created
    /// global logger, where process arguments belong to the host.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("CONFIG_FILE")
            && !path.trim().is_empty()
        {
            return Self::from_file(path);
        }

        let mut config = Config::default();

        load_env_string_opt("BOT_IDENTIFIER", &mut config.bot_identifier);
        load_env_var("LOGGER_EXIT_ON_ERROR", &mut config.exit_on_error)?;
        load_env_var("DRAIN_TIMEOUT_SECS", &mut config.drain_timeout_secs)?;
        load_env_var("CONSOLE_ENABLED", &mut config.console_enabled)?;

        if let Ok(format) = std::env::var("CONSOLE_FORMAT") {
            config.console_format = match format.to_lowercase().as_str() {
                "json" => ConsoleFormat::Json,
                "pretty" => ConsoleFormat::Pretty,
                _ => {
                    return Err(ConfigError::EnvError(format!(
                        "Invalid CONSOLE_FORMAT: {format}. Valid values: json, pretty"
                    )));
                }
            };
        }

        load_env_var("CONSOLE_LEVEL", &mut config.console_level)?;
        load_env_string_opt("SLACK_WEBHOOK", &mut config.slack_webhook);
        load_env_var("SLACK_LEVEL", &mut config.slack_level)?;
        load_env_string_opt("PAGERDUTY_ROUTING_KEY", &mut config.pagerduty_routing_key);
        load_env_string("PAGERDUTY_ENDPOINT", &mut config.pagerduty_endpoint);
        load_env_var("PAGERDUTY_LEVEL", &mut config.pagerduty_level)?;
        load_env_string_opt("BLOCK_EXPLORER_URL", &mut config.explorer_url);
        load_env_var("HTTP_TIMEOUT_SECS", &mut config.http_timeout_secs)?;
        load_env_var("LOG_LEVEL", &mut config.log_level)?;
        load_env_path_opt("CONFIG_FILE", &mut config.config_file);

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.config_file = Some(path.to_path_buf());
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.drain_timeout = Duration::from_secs(self.drain_timeout_secs);
        self.http_timeout = Duration::from_secs(self.http_timeout_secs);

        // Blank values from env files mean "not configured".
        for value in [
            &mut self.bot_identifier,
            &mut self.slack_webhook,
            &mut self.pagerduty_routing_key,
            &mut self.explorer_url,
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }

        Ok(())
    }

    pub fn logger_settings(&self) -> LoggerSettings {
        LoggerSettings {
            bot_identifier: self.bot_identifier.clone(),
            exit_on_error: self.exit_on_error,
            drain_timeout: self.drain_timeout,
        }
    }

    pub fn slack_config(&self) -> Option<SlackConfig> {
        self.slack_webhook.as_ref().map(|webhook_url| SlackConfig {
            webhook_url: webhook_url.clone(),
            min_level: self.slack_level,
            explorer_url: self.explorer_url.clone(),
            timeout: self.http_timeout,
            retry: self.retry_config.clone(),
        })
    }

    pub fn pagerduty_config(&self) -> Option<PagerDutyConfig> {
        self.pagerduty_routing_key
            .as_ref()
            .map(|routing_key| PagerDutyConfig {
                routing_key: routing_key.clone(),
                endpoint: self.pagerduty_endpoint.clone(),
                min_level: self.pagerduty_level,
                source: None,
                timeout: self.http_timeout,
                retry: self.retry_config.clone(),
            })
    }
}
