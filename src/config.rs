use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Connection and timing settings for one engine instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Server root, without the `/api` suffix
    pub base_url: String,
    /// Fixed period between status polls
    pub poll_interval: Duration,
}

impl EngineConfig {
    pub fn new(base_url: impl Into<String>, poll_interval_ms: u64) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            poll_interval: Duration::from_millis(poll_interval_ms.max(1)),
        }
    }

    pub fn api_url(&self) -> String {
        format!("{}/api", self.base_url)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_POLL_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.api_url(), "http://localhost:5000/api");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = EngineConfig::new("http://nas.local:5000/", 500);
        assert_eq!(config.api_url(), "http://nas.local:5000/api");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = EngineConfig::new(DEFAULT_BASE_URL, 0);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
    }
}
