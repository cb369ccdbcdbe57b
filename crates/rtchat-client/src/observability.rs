use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

pub const ENV_OBSERVABILITY_ENABLED: &str = "RTCHAT_OBSERVABILITY_ENABLED";
pub const ENV_LOG_LEVEL: &str = "RTCHAT_LOG_LEVEL";
pub const ENV_JSON_LOG_PATH: &str = "RTCHAT_JSON_LOG_PATH";

const DEFAULT_FILTER: &str = "warn";
const DEFAULT_LOG_FILE: &str = "rtchat.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Resolved logging switches.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LogSettings {
    pub disabled: bool,
    /// Filter directive; falls back to `RUST_LOG`, then `warn`.
    pub level: Option<String>,
    /// JSONL output file. Console output on stderr when unset.
    pub json_path: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let disabled = lookup(ENV_OBSERVABILITY_ENABLED)
            .and_then(|v| parse_bool_env(&v))
            .is_some_and(|enabled| !enabled);
        Self {
            disabled,
            level: lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()),
            json_path: lookup(ENV_JSON_LOG_PATH)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        if let Some(level) = &self.level
            && let Ok(filter) = EnvFilter::try_new(level)
        {
            return filter;
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn json_writer(path: &Path) -> RollingFileAppender {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let _ = std::fs::create_dir_all(dir);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    tracing_appender::rolling::never(dir, file_name)
}

/// Initialize logging once per process from `RTCHAT_*` variables.
///
/// - `RTCHAT_OBSERVABILITY_ENABLED`: set to a false value to turn logging off.
/// - `RTCHAT_LOG_LEVEL`: filter directive (`info`, `rtchat_client=debug`, ...).
/// - `RTCHAT_JSON_LOG_PATH`: write JSONL to this file instead of stderr.
///
/// Console output goes to stderr; stdout carries the conversation.
pub fn init_observability() {
    init_with(LogSettings::from_env());
}

/// Like [`init_observability`] with explicit settings. Later calls are no-ops.
pub fn init_with(settings: LogSettings) {
    INIT.get_or_init(|| {
        if settings.disabled {
            return;
        }
        let env_filter = settings.env_filter();
        match &settings.json_path {
            Some(path) => {
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(json_writer(path));
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init();
            }
            None => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_env_values() {
        assert_eq!(parse_bool_env(" Yes "), Some(true));
        assert_eq!(parse_bool_env("off"), Some(false));
        assert_eq!(parse_bool_env("maybe"), None);
    }

    #[test]
    fn settings_from_lookup() {
        let settings = LogSettings::from_lookup(|key| match key {
            ENV_OBSERVABILITY_ENABLED => Some("no".into()),
            ENV_LOG_LEVEL => Some("debug".into()),
            ENV_JSON_LOG_PATH => Some("logs/chat.jsonl".into()),
            _ => None,
        });
        assert!(settings.disabled);
        assert_eq!(settings.level.as_deref(), Some("debug"));
        assert_eq!(settings.json_path, Some(PathBuf::from("logs/chat.jsonl")));
    }

    #[test]
    fn unrecognized_flag_keeps_logging_on() {
        let settings = LogSettings::from_lookup(|key| {
            (key == ENV_OBSERVABILITY_ENABLED).then(|| "sometimes".to_string())
        });
        assert_eq!(settings, LogSettings::default());
    }

    #[test]
    fn init_is_idempotent() {
        init_with(LogSettings {
            disabled: true,
            ..LogSettings::default()
        });
        init_observability();
    }
}
