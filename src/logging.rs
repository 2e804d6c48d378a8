//! Logging setup
//!
//! `LOG_LEVEL` picks the level (default debug), `LOG_JSON=true` switches to
//! JSON lines, `SERVICE_NAME` names the service in the startup line.

use std::env;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "LOG_JSON";
pub const ENV_SERVICE_NAME: &str = "SERVICE_NAME";
pub const DEFAULT_SERVICE_NAME: &str = "wallet-activity-parser";

/// Logger settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    /// Raw `LOG_LEVEL` value that could not be understood, if any
    pub rejected_level: Option<String>,
    pub json: bool,
    pub service_name: String,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_values(
            env::var(ENV_LOG_LEVEL).ok().as_deref(),
            env::var(ENV_LOG_JSON).ok().as_deref(),
            env::var(ENV_SERVICE_NAME).ok().as_deref(),
        )
    }

    fn from_values(level: Option<&str>, json: Option<&str>, service: Option<&str>) -> Self {
        let (level, rejected_level) = match level.map(parse_level) {
            Some(Some(level)) => (level, None),
            Some(None) => (LevelFilter::DEBUG, level.map(str::to_string)),
            None => (LevelFilter::DEBUG, Some(String::new())),
        };
        let json = json.map_or(false, |v| v.trim().eq_ignore_ascii_case("true"));
        let service_name = service
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SERVICE_NAME)
            .to_string();

        Self {
            level,
            rejected_level,
            json,
            service_name,
        }
    }
}

/// Parse a level name. Accepts the usual names plus `warning`, and maps
/// `fatal` and `panic` onto `error`.
pub fn parse_level(raw: &str) -> Option<LevelFilter> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" | "fatal" | "panic" => Some(LevelFilter::ERROR),
        "off" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_tracing(settings: &LogSettings) {
    let filter = EnvFilter::default().add_directive(settings.level.into());

    if settings.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
        warn!("JSON mode enabled!");
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match &settings.rejected_level {
        Some(raw) if raw.is_empty() => warn!("Logger: {} not set, using debug", ENV_LOG_LEVEL),
        Some(raw) => warn!("Logger: unknown level {:?}, using debug", raw),
        None => {}
    }
    warn!(
        service = %settings.service_name,
        "Log level: {}",
        settings.level
    );
}
