use bot_logger::Config;
use bot_logger::config::{ConfigError, DiagnosticLevel};
use bot_logger::domain::LogLevel;
use bot_logger::reliability::RetryStrategy;
use bot_logger::transport::ConsoleFormat;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const ENV_VARS: [&str; 15] = [
    "BOT_IDENTIFIER",
    "LOGGER_EXIT_ON_ERROR",
    "DRAIN_TIMEOUT_SECS",
    "CONSOLE_ENABLED",
    "CONSOLE_FORMAT",
    "CONSOLE_LEVEL",
    "SLACK_WEBHOOK",
    "SLACK_LEVEL",
    "PAGERDUTY_ROUTING_KEY",
    "PAGERDUTY_ENDPOINT",
    "PAGERDUTY_LEVEL",
    "BLOCK_EXPLORER_URL",
    "HTTP_TIMEOUT_SECS",
    "LOG_LEVEL",
    "CONFIG_FILE",
];

fn clear_env() {
    for name in ENV_VARS {
        unsafe {
            env::remove_var(name);
        }
    }
}

fn set_env(name: &str, value: &str) {
    unsafe {
        env::set_var(name, value);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();

    let config = Config::from_env().unwrap();

    assert_eq!(config.bot_identifier, None);
    assert!(!config.exit_on_error);
    assert!(config.console_enabled);
    assert_eq!(config.console_format, ConsoleFormat::Json);
    assert_eq!(config.console_level, LogLevel::Debug);
    assert_eq!(config.slack_webhook, None);
    assert_eq!(config.pagerduty_routing_key, None);
    assert_eq!(config.drain_timeout, Duration::from_secs(30));
    assert_eq!(config.http_timeout, Duration::from_secs(10));
    assert!(config.slack_config().is_none());
    assert!(config.pagerduty_config().is_none());
}

#[test]
#[serial]
fn test_from_env_reads_transport_settings() {
    clear_env();
    set_env("BOT_IDENTIFIER", "liquidator-bot");
    set_env("LOGGER_EXIT_ON_ERROR", "true");
    set_env("DRAIN_TIMEOUT_SECS", "5");
    set_env("CONSOLE_FORMAT", "pretty");
    set_env("CONSOLE_LEVEL", "INFO");
    set_env("SLACK_WEBHOOK", "https://hooks.slack.com/services/T000/B000/XXXX");
    set_env("SLACK_LEVEL", "warning");
    set_env("PAGERDUTY_ROUTING_KEY", "R0UT1NGKEY");
    set_env("PAGERDUTY_LEVEL", "error");
    set_env("BLOCK_EXPLORER_URL", "https://etherscan.io");
    set_env("LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.bot_identifier.as_deref(), Some("liquidator-bot"));
    assert!(config.exit_on_error);
    assert_eq!(config.console_format, ConsoleFormat::Pretty);
    assert_eq!(config.console_level, LogLevel::Info);
    assert_eq!(config.log_level, DiagnosticLevel::Debug);

    let settings = config.logger_settings();
    assert_eq!(settings.drain_timeout, Duration::from_secs(5));
    assert!(settings.exit_on_error);

    let slack = config.slack_config().unwrap();
    assert_eq!(slack.min_level, LogLevel::Warn);
    assert_eq!(slack.explorer_url.as_deref(), Some("https://etherscan.io"));

    let pagerduty = config.pagerduty_config().unwrap();
    assert_eq!(pagerduty.routing_key, "R0UT1NGKEY");
    assert_eq!(pagerduty.min_level, LogLevel::Error);
    assert_eq!(pagerduty.endpoint, "https://events.pagerduty.com/v2/enqueue");
}

#[test]
#[serial]
fn test_from_env_treats_blank_values_as_unset() {
    clear_env();
    set_env("BOT_IDENTIFIER", "   ");
    set_env("SLACK_WEBHOOK", "");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.bot_identifier, None);
    assert!(config.slack_config().is_none());
}

#[test]
#[serial]
fn test_from_env_rejects_invalid_values() {
    clear_env();
    set_env("CONSOLE_LEVEL", "loud");
    let result = Config::from_env();
    assert!(matches!(result, Err(ConfigError::EnvError(_))));

    clear_env();
    set_env("SLACK_WEBHOOK", "not a url");
    let result = Config::from_env();
    assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));

    clear_env();
    set_env("DRAIN_TIMEOUT_SECS", "0");
    let result = Config::from_env();
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));

    clear_env();
}

#[test]
#[serial]
fn test_from_file_with_retry_table() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
bot_identifier = "disputer-bot"
console_enabled = false
slack_webhook = "https://hooks.slack.com/services/T000/B000/XXXX"
slack_level = "error"
http_timeout_secs = 3

[retry]
max_attempts = 5
base_delay = 250
strategy = "linear_backoff"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.bot_identifier.as_deref(), Some("disputer-bot"));
    assert!(!config.console_enabled);
    assert_eq!(config.config_file.as_deref(), Some(file.path()));
    assert_eq!(config.http_timeout, Duration::from_secs(3));
    assert_eq!(config.retry_config.max_attempts, 5);
    assert_eq!(config.retry_config.base_delay, Duration::from_millis(250));
    assert_eq!(config.retry_config.strategy, RetryStrategy::LinearBackoff);
    assert!(config.retry_config.jitter);

    let slack = config.slack_config().unwrap();
    assert_eq!(slack.min_level, LogLevel::Error);
    assert_eq!(slack.timeout, Duration::from_secs(3));
    assert_eq!(slack.retry.max_attempts, 5);
}

#[test]
#[serial]
fn test_config_file_env_takes_precedence() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "bot_identifier = \"from-file\"").unwrap();
    set_env("CONFIG_FILE", file.path().to_str().unwrap());
    set_env("BOT_IDENTIFIER", "from-env");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.bot_identifier.as_deref(), Some("from-file"));
}

#[test]
#[serial]
fn test_from_file_errors() {
    clear_env();
    let result = Config::from_file("/nonexistent/bot-logger.toml");
    assert!(matches!(result, Err(ConfigError::FileError(_))));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "drain_timeout_secs = \"soon\"").unwrap();
    let result = Config::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::ParseError(_))));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[retry]\nmax_attempts = 0").unwrap();
    let result = Config::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
#[serial]
fn test_from_args_overrides() {
    clear_env();
    let config = Config::from_args([
        "bot-logger",
        "--bot-identifier",
        "proposer-bot",
        "--console-enabled",
        "false",
        "--drain-timeout-secs",
        "2",
        "--pagerduty-routing-key",
        "R0UT1NGKEY",
    ])
    .unwrap();

    assert_eq!(config.bot_identifier.as_deref(), Some("proposer-bot"));
    assert!(!config.console_enabled);
    assert_eq!(config.drain_timeout, Duration::from_secs(2));
    assert!(config.pagerduty_config().is_some());
}
