//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the web front-end.
///
/// Every field has a default so the server starts without any environment
/// variables set. API keys are not part of this struct; they are resolved per
/// session by the core crate.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"127.0.0.1:8501"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,hyper=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Sessions untouched for this long are dropped.
    pub session_ttl: Duration,

    /// Config file to read keys and model settings from instead of the
    /// per-user default.
    pub config_path: Option<PathBuf>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("CEKFAKTA_BIND", "127.0.0.1:8501"),
            log_level: env_or("CEKFAKTA_LOG", "info"),
            log_json: std::env::var("CEKFAKTA_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            session_ttl: Duration::from_secs(parse_env("CEKFAKTA_SESSION_TTL_SECS", 3600)),
            config_path: std::env::var("CEKFAKTA_CONFIG").ok().map(PathBuf::from),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8501".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            session_ttl: Duration::from_secs(3600),
            config_path: None,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_on_garbage() {
        std::env::set_var("CEKFAKTA_TEST_PARSE_ENV", "not-a-number");
        assert_eq!(parse_env("CEKFAKTA_TEST_PARSE_ENV", 42u64), 42);
        std::env::remove_var("CEKFAKTA_TEST_PARSE_ENV");
    }

    #[test]
    fn test_default_binds_locally() {
        let cfg = Config::default();
        assert_eq!(cfg.bind_address, "127.0.0.1:8501");
        assert_eq!(cfg.session_ttl, Duration::from_secs(3600));
    }
}
