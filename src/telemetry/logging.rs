//! Logging initialization.
//!
//! Level priority:
//! 1. RUST_LOG environment variable (if set)
//! 2. `[logging]` section of the settings file
//! 3. Default: info
//!
//! Output formats: pretty, compact, json.

use crate::config::{LogFormat, LoggingSettings};
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Later calls are ignored.
///
/// # Examples
///
/// ```ignore
/// // Use environment variable
/// std::env::set_var("RUST_LOG", "protoplane=debug");
/// init_logging(None);
///
/// // Use settings file
/// let settings = LoggingSettings { level: "debug".into(), format: LogFormat::Json };
/// init_logging(Some(&settings));
/// ```
pub fn init_logging(settings: Option<&LoggingSettings>) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if let Some(cfg) = settings {
        EnvFilter::new(parse_level(&cfg.level).as_str())
    } else {
        EnvFilter::new("info")
    };

    let format = settings.map(|s| s.format).unwrap_or_default();

    match format {
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_thread_names(true));
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact().with_thread_names(true));
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_thread_names(true));
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    }
}

/// Parses a log level string; anything unrecognised is info.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("info"), Level::INFO);
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("INFO"), Level::INFO);
        assert_eq!(parse_level("unknown"), Level::INFO);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let settings = LoggingSettings {
            level: "warn".into(),
            format: LogFormat::Json,
        };
        init_logging(Some(&settings));
        init_logging(None);
    }
}
