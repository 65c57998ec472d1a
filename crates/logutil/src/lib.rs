//! Logging setup shared by the binaries.
use std::str::FromStr;

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    HumanReadable,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" | "human" => Ok(LogFormat::HumanReadable),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Build the env filter, defaulting to `default_level` and letting RUST_LOG
/// override.
pub fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// Configure the global logger. Logs go to stderr so stdout stays clean for
/// output.
///
/// Errors if a global logger is already set.
pub fn configure_global_logger(
    default_level: Level,
    format: LogFormat,
) -> Result<(), SetGlobalDefaultError> {
    let filter = env_filter(default_level);

    match format {
        LogFormat::HumanReadable => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    }
}

/// Configure a logger that writes through the test writer so output is
/// captured per test. Every test may call this, so only the first call takes
/// effect.
pub fn configure_test_logger(default_level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_test_writer()
        .with_env_filter(env_filter(default_level))
        .with_file(true)
        .with_line_number(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_format() {
        assert_eq!(LogFormat::Json, "json".parse().unwrap());
        assert_eq!(LogFormat::HumanReadable, "text".parse().unwrap());
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn second_global_logger_errors() {
        configure_global_logger(Level::INFO, LogFormat::HumanReadable).unwrap();
        assert!(configure_global_logger(Level::INFO, LogFormat::Json).is_err());
    }
}
