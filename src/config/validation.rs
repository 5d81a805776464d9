//! Configuration validation.
//!
//! serde handles the syntax; this checks value ranges. All errors are
//! collected, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::CreditConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &CreditConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.cache.capacity == 0 {
        errors.push(ValidationError {
            field: "cache.capacity",
            message: "must be greater than 0".to_string(),
        });
    }

    if config.cache.batch_size <= 0 {
        errors.push(ValidationError {
            field: "cache.batch_size",
            message: format!("must be greater than 0, got {}", config.cache.batch_size),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address",
            message: format!(
                "invalid socket address `{}`",
                config.observability.metrics_address
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
