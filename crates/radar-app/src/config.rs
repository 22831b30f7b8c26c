//! Client configuration, from defaults or environment variables.

use tracing::warn;

/// Runtime settings for the client core.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_base_url: String,
    /// Bearer token to start the session with, if already known.
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
    /// How often the background notification poll runs.
    pub notification_poll_secs: u64,
    /// Freshness window for cached query results.
    pub cache_ttl_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            auth_token: None,
            request_timeout_secs: 30,
            notification_poll_secs: 30,
            cache_ttl_secs: 60,
        }
    }
}

impl ClientConfig {
    /// Build a config from `RADAR_*` environment variables, falling
    /// back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("RADAR_API_BASE_URL") {
            if !url.is_empty() {
                config.api_base_url = url;
            }
        }
        if let Ok(token) = std::env::var("RADAR_AUTH_TOKEN") {
            if !token.is_empty() {
                config.auth_token = Some(token);
            }
        }
        config.request_timeout_secs =
            env_u64("RADAR_REQUEST_TIMEOUT_SECS", config.request_timeout_secs);
        config.notification_poll_secs =
            env_u64("RADAR_NOTIFICATION_POLL_SECS", config.notification_poll_secs);
        config.cache_ttl_secs = env_u64("RADAR_CACHE_TTL_SECS", config.cache_ttl_secs);

        config
    }
}

fn env_u64(var: &str, default: u64) -> u64 {
    match std::env::var(var) {
        Ok(raw) => match raw.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var, value = %raw, "Invalid numeric value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, "http://127.0.0.1:8000");
        assert_eq!(config.auth_token, None);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.notification_poll_secs, 30);
        assert_eq!(config.cache_ttl_secs, 60);
    }

    #[test]
    fn test_env_u64_parses_and_falls_back() {
        assert_eq!(env_u64("RADAR_TEST_UNSET_VAR", 30), 30);

        std::env::set_var("RADAR_TEST_VALID_VAR", "45");
        assert_eq!(env_u64("RADAR_TEST_VALID_VAR", 30), 45);
        std::env::remove_var("RADAR_TEST_VALID_VAR");

        std::env::set_var("RADAR_TEST_BROKEN_VAR", "soon");
        assert_eq!(env_u64("RADAR_TEST_BROKEN_VAR", 30), 30);
        std::env::remove_var("RADAR_TEST_BROKEN_VAR");
    }
}
