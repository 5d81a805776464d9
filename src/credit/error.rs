//! Credit cache error definitions.

use thiserror::Error;

/// Boxed error produced by a credit supplier.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while consulting the credit cache.
#[derive(Debug, Error)]
pub enum CreditError {
    /// The request context could not be turned into a fingerprint.
    #[error("Fingerprint derivation failed: {0}")]
    Derivation(String),

    /// The supplier computing a missing entry's initial credit failed.
    /// No entry is left behind.
    #[error("Credit load failed: {0}")]
    Load(#[source] BoxError),
}

/// Result type for credit cache operations.
pub type CreditResult<T> = Result<T, CreditError>;
