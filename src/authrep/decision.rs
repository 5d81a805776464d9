//! Batched authorization decisions.

/// Why a request has to go to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReason {
    /// No cached credit for this fingerprint.
    NoCredit,
    /// The request context could not be fingerprinted.
    Underivable(String),
}

/// Outcome of consulting the credit cache for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Bypass the backend; one unit of credit was consumed.
    Skip {
        /// Credit left after this request.
        remaining: i64,
    },
    /// Authorize synchronously with the backend.
    CallBackend { reason: BackendReason },
}

impl AuthDecision {
    pub fn is_skip(&self) -> bool {
        matches!(self, AuthDecision::Skip { .. })
    }

    /// Label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthDecision::Skip { .. } => "skip",
            AuthDecision::CallBackend {
                reason: BackendReason::NoCredit,
            } => "backend_no_credit",
            AuthDecision::CallBackend {
                reason: BackendReason::Underivable(_),
            } => "backend_underivable",
        }
    }
}
