//! Logging setup for applications embedding devtree.
//!
//! The library crates only emit `tracing` events; call one of these once at
//! startup to see them.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log level for devtree output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// No logging output
    Silent,
    /// Only errors
    Error,
    /// Errors and warnings
    Warn,
    /// Errors, warnings, and info (default)
    #[default]
    Info,
    /// All logs including debug
    Debug,
}

impl LogLevel {
    /// Convert to tracing filter string
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter())
    }
}

/// Initialize logging with the specified level.
///
/// `RUST_LOG` directives still apply on top of the default level. Only the
/// first call in a process takes effect.
///
/// # Example
///
/// ```rust,no_run
/// use devtree_build::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Info);
/// ```
pub fn init_logging(level: LogLevel) {
    init_logging_with_filter(
        EnvFilter::builder()
            .with_default_directive(level_directive(level))
            .from_env_lossy(),
        false,
    );
}

/// Initialize logging from the `log_level` config field, defaulting to info.
pub fn init_logging_from_config(config: &devtree_config::DevtreeConfig) {
    let parsed = config
        .log_level
        .as_deref()
        .map(str::parse::<LogLevel>)
        .transpose();
    let level = parsed.as_ref().ok().copied().flatten().unwrap_or_default();
    init_logging(level);
    if let Err(err) = parsed {
        tracing::warn!("{err}, using {level}");
    }
}

/// Initialize logging with a custom filter.
///
/// ```rust,no_run
/// use devtree_build::logging::init_logging_with_filter;
/// use tracing_subscriber::EnvFilter;
///
/// init_logging_with_filter(EnvFilter::new("devtree_store=trace,notify=off"), true);
/// ```
pub fn init_logging_with_filter(filter: EnvFilter, no_color: bool) {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_ansi(!no_color),
            )
            .init();
    });
}

fn level_directive(level: LogLevel) -> tracing_subscriber::filter::Directive {
    match level {
        LogLevel::Silent => tracing_subscriber::filter::LevelFilter::OFF.into(),
        LogLevel::Error => tracing::Level::ERROR.into(),
        LogLevel::Warn => tracing::Level::WARN.into(),
        LogLevel::Info => tracing::Level::INFO.into(),
        LogLevel::Debug => tracing::Level::DEBUG.into(),
    }
}
