//! Pipeline configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use command_retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
use element_locator::cache::DEFAULT_CACHE_TTL;
use wait_engine::{DEFAULT_INTERVAL, DEFAULT_TIMEOUT};

/// Tunables for one pipeline instance.
///
/// Everything here has a working default; construct with
/// `PipelineConfig::default()` and override the fields that matter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Lifetime of cached resolution results.
    pub cache_ttl: Duration,

    /// Default timeout for wait operations.
    pub wait_timeout: Duration,

    /// Default polling interval for wait operations.
    pub wait_interval: Duration,

    /// Total attempts a wrapped command gets before recovery.
    pub max_retries: u32,

    /// Base delay for the linear backoff between attempts.
    pub retry_delay: Duration,

    /// Whether wrapped commands consult the recovery engine on exhaustion.
    pub enable_recovery: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            wait_timeout: DEFAULT_TIMEOUT,
            wait_interval: DEFAULT_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            enable_recovery: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.wait_timeout, Duration::from_secs(10));
        assert_eq!(config.wait_interval, Duration::from_millis(100));
        assert_eq!(config.max_retries, 3);
        assert!(config.enable_recovery);
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = PipelineConfig {
            max_retries: 5,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_retries, 5);
        assert_eq!(back.cache_ttl, config.cache_ttl);
    }
}
