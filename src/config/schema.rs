//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.

use serde::{Deserialize, Serialize};

/// Default credit installed per successful backend authorization.
pub const DEFAULT_BATCH_SIZE: i64 = 5;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CreditConfig {
    /// Credit cache sizing and policy.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Credit cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of fingerprints held (placeholders included).
    pub capacity: usize,

    /// Requests covered by one backend authorization.
    pub batch_size: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CreditConfig::default();
        assert_eq!(config.cache.capacity, 10_000);
        assert_eq!(config.cache.batch_size, 5);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: CreditConfig = toml::from_str("[cache]\nbatch_size = 20\n").unwrap();
        assert_eq!(config.cache.batch_size, 20);
        assert_eq!(config.cache.capacity, 10_000);
        assert_eq!(config.observability.log_level, "info");
    }
}
