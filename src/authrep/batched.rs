//! Batched authorization cache.
//!
//! One successful backend authorization buys a batch of requests that may
//! skip the synchronous backend call. The usage they carry is still reported,
//! asynchronously, by the gateway.

use crate::authrep::decision::{AuthDecision, BackendReason};
use crate::authrep::CachingAuthenticator;
use crate::config::schema::CacheConfig;
use crate::credit::{BackendIdentity, CreditCache, CreditResult, Fingerprint, RequestContext};
use crate::observability::metrics;

/// [`CachingAuthenticator`] backed by a [`CreditCache`].
#[derive(Clone, Debug)]
pub struct BatchedAuthCache {
    credits: CreditCache,
}

impl BatchedAuthCache {
    pub fn new(credits: CreditCache) -> Self {
        Self { credits }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(CreditCache::from_config(config))
    }

    /// The underlying credit cache.
    pub fn credits(&self) -> &CreditCache {
        &self.credits
    }

    /// Whether the gateway may report this request asynchronously instead of
    /// waiting on the backend.
    pub fn should_force_async_authrep(
        &self,
        backend: &BackendIdentity,
        request: &RequestContext,
        extras: &[&str],
    ) -> CreditResult<bool> {
        self.is_auth_cached(backend, request, extras)
    }

    /// Consume one unit of credit, returning the value seen before.
    pub fn decrement(
        &self,
        backend: &BackendIdentity,
        request: &RequestContext,
        extras: &[&str],
    ) -> CreditResult<i64> {
        let fingerprint = Fingerprint::derive(backend, request, extras)?;
        Ok(self.credits.decrement_and_check(&fingerprint))
    }

    /// Decide whether this request may skip the backend, consuming credit
    /// if it may.
    ///
    /// Errors never grant a skip: a request that cannot be fingerprinted is
    /// sent to the backend.
    pub fn decide(
        &self,
        backend: &BackendIdentity,
        request: &RequestContext,
        extras: &[&str],
    ) -> AuthDecision {
        let decision = match self.decrement(backend, request, extras) {
            Ok(observed) if observed > 0 => AuthDecision::Skip {
                remaining: observed - 1,
            },
            Ok(_) => AuthDecision::CallBackend {
                reason: BackendReason::NoCredit,
            },
            Err(e) => {
                tracing::warn!(
                    service_id = %backend.service_id,
                    error = %e,
                    "Cannot fingerprint request, deferring to backend"
                );
                AuthDecision::CallBackend {
                    reason: BackendReason::Underivable(e.to_string()),
                }
            }
        };
        metrics::record_decision(decision.outcome());
        decision
    }
}

impl CachingAuthenticator for BatchedAuthCache {
    fn is_auth_cached(
        &self,
        backend: &BackendIdentity,
        request: &RequestContext,
        extras: &[&str],
    ) -> CreditResult<bool> {
        let fingerprint = Fingerprint::derive(backend, request, extras)?;
        Ok(self.credits.has_credit(&fingerprint))
    }

    fn cache(
        &self,
        backend: &BackendIdentity,
        request: &RequestContext,
        extras: &[&str],
    ) -> CreditResult<()> {
        let fingerprint = Fingerprint::derive(backend, request, extras)?;
        self.credits.seed(&fingerprint);
        Ok(())
    }

    fn invalidate(
        &self,
        backend: &BackendIdentity,
        request: &RequestContext,
        extras: &[&str],
    ) -> CreditResult<()> {
        let fingerprint = Fingerprint::derive(backend, request, extras)?;
        self.credits.invalidate(&fingerprint);
        Ok(())
    }
}
