use bot_logger::{Config, LogEntry, LoggerError, drain_global, global, init_global};

// The global logger lives for the whole process, so everything that touches
// it stays in this one test.
#[tokio::test]
async fn test_global_logger_lifecycle() {
    let empty = drain_global().await;
    assert!(empty.transports.is_empty());

    let config = Config {
        bot_identifier: Some("global-bot".to_string()),
        ..Config::default()
    };

    let logger = init_global(&config).unwrap();
    assert_eq!(logger.bot_identifier(), "global-bot");
    assert_eq!(logger.transport_names(), ["console".to_string()]);

    let again = init_global(&config);
    assert!(matches!(again, Err(LoggerError::AlreadyInitialized)));

    let same = global().unwrap();
    assert!(std::ptr::eq(logger, same));

    same.info(LogEntry::new("global", "first entry"));
    same.warn(LogEntry::new("global", "second entry"));

    let report = drain_global().await;
    let console = report.transport("console").unwrap();
    assert_eq!(console.delivered, 2);
    assert!(!report.has_failures());

    let after = drain_global().await;
    assert!(after.transports.is_empty());
}
