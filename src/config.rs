//! Configuration Module
//!
//! Cache construction parameters with defaults, loadable from a JSON document.
//! Nothing here reads the environment; hosts decide where the document comes from.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{ExpiryMode, PolicyKind, PolicyOptions, DEFAULT_TTL};
use crate::error::{CacheError, Result};
use crate::serializer::SerializerConfig;

/// Cache configuration parameters.
///
/// Durations are written as whole seconds in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Eviction strategy
    pub policy: PolicyKind,
    /// TTL used by the TTL policy for entries without explicit TTL
    #[serde(with = "duration_secs")]
    pub default_ttl: Duration,
    /// Whether reads refresh TTL
    pub expiry: ExpiryMode,
    /// Background cleanup task interval
    #[serde(with = "duration_secs")]
    pub cleanup_interval: Duration,
    /// Serializer used when values leave process memory
    pub serializer: SerializerConfig,
}

impl Config {
    /// Parses a JSON document, filling absent fields with defaults.
    ///
    /// # Example
    /// ```
    /// let config = mini_cache::Config::from_json_str(r#"{"max_entries": 50, "policy": "lfu"}"#).unwrap();
    /// assert_eq!(config.max_entries, 50);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| CacheError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no cache could run with.
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl.is_zero() {
            return Err(CacheError::InvalidConfig(
                "default_ttl must be greater than zero".to_string(),
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "cleanup_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Policy options derived from this configuration, using the system clock.
    pub fn policy_options(&self) -> PolicyOptions {
        PolicyOptions::default()
            .with_expiry(self.expiry)
            .with_default_ttl(self.default_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            policy: PolicyKind::Lru,
            default_ttl: DEFAULT_TTL,
            expiry: ExpiryMode::Absolute,
            cleanup_interval: Duration::from_secs(1),
            serializer: SerializerConfig::default(),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.policy, PolicyKind::Lru);
        assert_eq!(config.default_ttl, Duration::from_secs(3600));
        assert_eq!(config.expiry, ExpiryMode::Absolute);
        assert_eq!(config.cleanup_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_from_json_partial() {
        let config = Config::from_json_str(
            r#"{"max_entries": 10, "policy": "ttl", "default_ttl": 30, "expiry": "sliding"}"#,
        )
        .unwrap();

        assert_eq!(config.max_entries, 10);
        assert_eq!(config.policy, PolicyKind::Ttl);
        assert_eq!(config.default_ttl, Duration::from_secs(30));
        assert_eq!(config.expiry, ExpiryMode::Sliding);
        assert_eq!(config.cleanup_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_empty_document_is_default() {
        assert_eq!(Config::from_json_str("{}").unwrap(), Config::default());
    }

    #[test]
    fn test_config_unknown_policy_rejected() {
        let result = Config::from_json_str(r#"{"policy": "random"}"#);
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_zero_ttl_rejected() {
        let result = Config::from_json_str(r#"{"default_ttl": 0}"#);
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = Config {
            max_entries: 7,
            policy: PolicyKind::Fifo,
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(Config::from_json_str(&json).unwrap(), config);
    }
}
