//! Batched credit cache for metered authorization backends.
//!
//! Sits in front of a remote authorize/report service and decides whether a
//! request may skip the backend because an equivalent request was recently
//! authorized and its batch still has credit.

pub mod authrep;
pub mod config;
pub mod credit;
pub mod observability;

pub use authrep::{AuthDecision, BatchedAuthCache, CachingAuthenticator};
pub use config::CreditConfig;
pub use credit::{BackendIdentity, Credit, CreditCache, CreditError, Fingerprint, RequestContext};
