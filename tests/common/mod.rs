//! Shared fixtures for integration tests.

#![allow(dead_code)]

use credit_cache::credit::{BackendIdentity, Fingerprint, RequestContext};

pub fn backend() -> BackendIdentity {
    BackendIdentity::new("https://su1.3scale.net", "svc-test")
}

/// A request from application `app` reporting one hit.
pub fn request(app: &str) -> RequestContext {
    RequestContext::new()
        .credential("user_key", app)
        .usage("hits", 1)
}

pub fn fingerprint(app: &str) -> Fingerprint {
    Fingerprint::derive(&backend(), &request(app), &[]).expect("fixture must be derivable")
}
