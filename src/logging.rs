//! Logging and tracing initialization.
//!
//! A bare level such as `debug` applies to StudyGuard's own events only;
//! dependencies stay at `warn`. Full directive strings are used unchanged.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

const CRATE_TARGET: &str = "studyguard";

/// Filter directives for a configured level
pub fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        return format!("warn,{CRATE_TARGET}=info");
    }
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    format!("warn,{CRATE_TARGET}={level}")
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Later calls are
/// ignored.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.level)));

    let installed = if config.json {
        fmt()
            .with_env_filter(env_filter)
            .json()
            .with_current_span(true)
            .try_init()
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init()
    };

    if installed.is_ok() {
        tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    }
}
