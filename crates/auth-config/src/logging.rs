//! Logging initialization.
//!
//! Thin wrapper over the observability crate so binaries only need the
//! configured level and, optionally, the JSONL file to write.

use std::path::Path;

use observability::LogConfig;

const SERVICE_NAME: &str = "authctl";

/// Initialize the logging system.
///
/// * `level` - default level when `RUST_LOG` is unset
/// * `log_file` - JSONL output file; `None` logs to stderr only
/// * `also_stderr` - with a log file, also write a compact copy to stderr
///
/// ```ignore
/// init_logging("info", Some(&paths.log_file()), false);
/// tracing::info!("authctl started");
/// ```
pub fn init_logging(level: &str, log_file: Option<&Path>, also_stderr: bool) {
    observability::init_with_config(log_config(level, log_file, also_stderr));
}

fn log_config(level: &str, log_file: Option<&Path>, also_stderr: bool) -> LogConfig {
    LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: level.into(),
        log_path: log_file.map(Path::to_path_buf),
        also_stderr,
    }
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_config_keeps_stderr_quiet_by_default() {
        let config = log_config("info", Some(Path::new("/tmp/authctl.jsonl")), false);
        assert_eq!(config.service_name, "authctl");
        assert_eq!(config.default_level, "info");
        assert_eq!(
            config.log_path.as_deref(),
            Some(Path::new("/tmp/authctl.jsonl"))
        );
        assert!(!config.also_stderr);
    }

    #[test]
    fn log_config_can_echo_to_stderr() {
        let config = log_config("debug", Some(Path::new("/tmp/authctl.jsonl")), true);
        assert!(config.also_stderr);
        assert_eq!(config.default_level, "debug");
    }

    #[test]
    fn parse_level_all_variants() {
        assert_eq!(parse_level("trace"), tracing::Level::TRACE);
        assert_eq!(parse_level("debug"), tracing::Level::DEBUG);
        assert_eq!(parse_level("info"), tracing::Level::INFO);
        assert_eq!(parse_level("warn"), tracing::Level::WARN);
        assert_eq!(parse_level("warning"), tracing::Level::WARN);
        assert_eq!(parse_level("error"), tracing::Level::ERROR);
    }

    #[test]
    fn parse_level_case_insensitive() {
        assert_eq!(parse_level("TRACE"), tracing::Level::TRACE);
        assert_eq!(parse_level("Debug"), tracing::Level::DEBUG);
        assert_eq!(parse_level("WARNING"), tracing::Level::WARN);
    }

    #[test]
    fn parse_level_unknown_defaults_to_info() {
        assert_eq!(parse_level(""), tracing::Level::INFO);
        assert_eq!(parse_level("verbose"), tracing::Level::INFO);
    }
}
