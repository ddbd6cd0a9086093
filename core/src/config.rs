//! Deployment-time configuration, loaded from environment variables.
//! Every knob has a documented default, using the
//! `env::var(...).unwrap_or(...)` style rather than a config-file-only
//! approach.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    /// Forced to 0 regardless of what's configured.
    pub llm_temperature: f32,
    pub graph_uri: Option<String>,
    pub graph_credentials: Option<String>,
    pub cache_url: Option<String>,
    pub archive_dsn: Option<String>,
    pub session_ttl: Duration,
    pub minimum_real_components: usize,
    pub turn_deadline: Duration,
    pub llm_deadline: Duration,
    pub graph_deadline: Duration,
    pub auto_commit_confidence: f64,
    pub direct_mention_enrichment: bool,
    pub max_log_entries: usize,
    pub bind_addr: String,
}

impl Config {
    /// The documented defaults, used directly by tests that pin down the
    /// resolved open design questions.
    pub fn defaults() -> Self {
        Self {
            llm_api_key: None,
            llm_model: "stub".to_string(),
            llm_temperature: 0.0,
            graph_uri: None,
            graph_credentials: None,
            cache_url: None,
            archive_dsn: None,
            session_ttl: Duration::from_secs(3600),
            minimum_real_components: 1,
            turn_deadline: Duration::from_millis(30_000),
            llm_deadline: Duration::from_millis(10_000),
            graph_deadline: Duration::from_millis(3_000),
            auto_commit_confidence: 0.85,
            direct_mention_enrichment: true,
            max_log_entries: 200,
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::defaults();
        Self {
            llm_api_key: env::var("LLM_API_KEY").ok(),
            llm_model: env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_temperature: 0.0,
            graph_uri: env::var("GRAPH_URI").ok(),
            graph_credentials: env::var("GRAPH_CREDENTIALS").ok(),
            cache_url: env::var("CACHE_URL").ok(),
            archive_dsn: env::var("ARCHIVE_DSN").ok(),
            session_ttl: env_duration_secs("SESSION_TTL_SECONDS", defaults.session_ttl),
            minimum_real_components: env_usize(
                "MINIMUM_REAL_COMPONENTS",
                defaults.minimum_real_components,
            ),
            turn_deadline: env_duration_ms("TURN_DEADLINE_MS", defaults.turn_deadline),
            llm_deadline: defaults.llm_deadline,
            graph_deadline: defaults.graph_deadline,
            auto_commit_confidence: env_f64(
                "AUTO_COMMIT_CONFIDENCE",
                defaults.auto_commit_confidence,
            ),
            direct_mention_enrichment: env_bool(
                "DIRECT_MENTION_ENRICHMENT",
                defaults.direct_mention_enrichment,
            ),
            max_log_entries: env_usize("MAX_LOG_ENTRIES", defaults.max_log_entries),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_duration_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pin_the_resolved_open_questions() {
        let cfg = Config::defaults();
        assert_eq!(cfg.minimum_real_components, 1);
        assert!((cfg.auto_commit_confidence - 0.85).abs() < f64::EPSILON);
        assert!(cfg.direct_mention_enrichment);
        assert_eq!(cfg.llm_temperature, 0.0);
    }
}
