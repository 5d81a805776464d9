//! Authorization caching seam for the gateway plugin.
//!
//! # Data Flow
//! ```text
//! gateway request
//!     → BatchedAuthCache::decide
//!         → Skip          (credit consumed locally, report asynchronously)
//!         → CallBackend   (authorize with the metering backend)
//!               → success: cache()      (seed a fresh batch)
//!               → denial:  invalidate()
//! ```
//!
//! # Design Decisions
//! - Fail open to the backend, never to bypass: any fingerprint or load
//!   error yields `CallBackend`
//! - A skip is granted only by a decrement that observed positive credit,
//!   so racing requests can never exceed one batch

pub mod batched;
pub mod decision;

pub use batched::BatchedAuthCache;
pub use decision::{AuthDecision, BackendReason};

use crate::credit::{BackendIdentity, CreditResult, RequestContext};

/// A cache of backend authorization results, keyed by request context.
pub trait CachingAuthenticator: Send + Sync {
    /// Is a still-valid authorization cached for this request?
    fn is_auth_cached(
        &self,
        backend: &BackendIdentity,
        request: &RequestContext,
        extras: &[&str],
    ) -> CreditResult<bool>;

    /// Record a successful backend authorization.
    fn cache(
        &self,
        backend: &BackendIdentity,
        request: &RequestContext,
        extras: &[&str],
    ) -> CreditResult<()>;

    /// Drop any cached authorization, e.g. after a denial.
    fn invalidate(
        &self,
        backend: &BackendIdentity,
        request: &RequestContext,
        extras: &[&str],
    ) -> CreditResult<()>;
}
