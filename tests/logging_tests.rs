//! Logging configuration tests

use openapi_korea::infrastructure::config::{parse_config, Logging};

#[test]
fn test_log_level_parsing() {
    let cases = [
        ("DEBUG", "debug"),
        ("INFO", "info"),
        ("WARN", "warn"),
        ("ERROR", "error"),
        ("info", "info"),
        ("VERBOSE", "warn"),
    ];

    for (level, expected) in cases {
        let logging = Logging {
            level: level.to_string(),
            ..Logging::default()
        };
        assert_eq!(logging.filter_directive(), expected, "level {}", level);
    }
}

#[test]
fn test_log_level_default() {
    let logging = Logging::default();
    assert!(logging.enable);
    assert!(logging.path.is_none());
    assert_eq!(logging.filter_directive(), "warn");
}

#[test]
fn test_logging_table_from_file() {
    let config = parse_config(
        r#"
[logging]
enable = false
path = "/tmp/openapi-korea.log"
"#,
    )
    .unwrap();

    assert!(!config.logging.enable);
    assert_eq!(config.logging.path.as_deref(), Some("/tmp/openapi-korea.log"));
    assert_eq!(config.logging.level, "WARN");
}
