//! # Observability
//!
//! Structured logging for the authctx workspace.
//!
//! Crates are log producers only. They use the standard `tracing` macros and
//! know nothing about where the output goes. A binary calls
//! [`init_with_config`] once at startup to decide that:
//!
//! - with a `log_path`, every event is appended as one JSON line to that file
//!   (sensitive fields such as tokens and passwords are redacted), and a
//!   compact human-readable copy can also go to stderr;
//! - without a `log_path`, only the compact stderr output is installed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "authctl".into(),
//!         default_level: "debug".into(),
//!         log_path: Some("/tmp/authctl.jsonl".into()),
//!         also_stderr: true,
//!     });
//!
//!     tracing::info!("ready");
//! }
//! ```

mod file;
mod json_layer;
mod redact;

use std::path::PathBuf;

pub use json_layer::LogEntry;
pub use redact::{redact_fields, REDACTED};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "authctl").
    /// Included in every JSON line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// JSONL log file. When `None` only stderr output is installed.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr when a log file is configured.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging with default settings (stderr only).
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// Installing a global subscriber twice is not an error here: the second call
/// leaves the first subscriber in place.
pub fn init_with_config(config: LogConfig) {
    match config.log_path.clone() {
        Some(path) => file::init_file_subscriber(&config, path),
        None => {
            use tracing_subscriber::util::SubscriberInitExt;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter(&config.default_level))
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact()
                .finish()
                .try_init();
        }
    }
}

/// `RUST_LOG` if set, otherwise the given default level.
pub(crate) fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
