//! Fingerprint derivation.
//!
//! A fingerprint identifies one authorization decision context: the metering
//! backend it was made against, the credentials and usage dimensions of the
//! request, and any extra discriminators the caller mixes in. Equivalent
//! requests map to the same fingerprint no matter how their attributes were
//! ordered when the context was built.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::credit::error::{CreditError, CreditResult};

const TAG_ENDPOINT: u8 = 0x01;
const TAG_SERVICE: u8 = 0x02;
const TAG_CREDENTIAL: u8 = 0x03;
const TAG_USAGE: u8 = 0x04;
const TAG_TARGET: u8 = 0x05;
const TAG_EXTRA: u8 = 0x06;

/// Identity of the metering backend configuration a decision was made against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendIdentity {
    /// Backend endpoint (e.g., "https://su1.3scale.net").
    pub endpoint: String,
    /// Service the request is authorized against.
    pub service_id: String,
}

impl BackendIdentity {
    pub fn new(endpoint: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            service_id: service_id.into(),
        }
    }
}

/// Request attributes relevant to authorization equivalence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Credential fields, e.g. `user_key` or `app_id` + `app_key`.
    pub credentials: BTreeMap<String, String>,
    /// Usage being reported: metric name -> increment.
    pub usage: BTreeMap<String, i64>,
    /// Optional operation the request targets (e.g., "GET /orders").
    /// Surrounding whitespace is ignored; case is significant.
    pub target: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential field.
    pub fn credential(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.credentials.insert(name.into(), value.into());
        self
    }

    /// Add a usage metric increment.
    pub fn usage(mut self, metric: impl Into<String>, delta: i64) -> Self {
        self.usage.insert(metric.into(), delta);
        self
    }

    /// Set the targeted operation.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Opaque cache key for an authorization decision context (SHA-256).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Derive the fingerprint for a request against a backend.
    ///
    /// Credential and metric names are normalized (trimmed, ASCII
    /// lowercase). Extra discriminators are compared as a multiset, so their
    /// order does not matter.
    pub fn derive(
        backend: &BackendIdentity,
        request: &RequestContext,
        extras: &[&str],
    ) -> CreditResult<Self> {
        if backend.endpoint.trim().is_empty() || backend.service_id.trim().is_empty() {
            return Err(CreditError::Derivation(
                "backend identity is incomplete".to_string(),
            ));
        }
        if request.credentials.is_empty() {
            return Err(CreditError::Derivation(
                "request carries no credentials".to_string(),
            ));
        }

        let credentials = normalize_names("credential", &request.credentials)?;
        if let Some((name, _)) = credentials.iter().find(|(_, v)| v.is_empty()) {
            return Err(CreditError::Derivation(format!(
                "credential `{}` is empty",
                name
            )));
        }
        let usage = normalize_names("usage metric", &request.usage)?;

        let mut extras: Vec<&str> = extras.to_vec();
        if extras.iter().any(|e| e.is_empty()) {
            return Err(CreditError::Derivation(
                "empty discriminator".to_string(),
            ));
        }
        extras.sort_unstable();

        let mut hasher = Sha256::new();
        field(&mut hasher, TAG_ENDPOINT, backend.endpoint.trim().as_bytes());
        field(&mut hasher, TAG_SERVICE, backend.service_id.trim().as_bytes());
        for (name, value) in &credentials {
            field(&mut hasher, TAG_CREDENTIAL, name.as_bytes());
            field(&mut hasher, TAG_CREDENTIAL, value.as_bytes());
        }
        for (metric, delta) in &usage {
            field(&mut hasher, TAG_USAGE, metric.as_bytes());
            field(&mut hasher, TAG_USAGE, &delta.to_be_bytes());
        }
        if let Some(target) = request.target.as_deref().map(str::trim) {
            if target.is_empty() {
                return Err(CreditError::Derivation("empty target".to_string()));
            }
            field(&mut hasher, TAG_TARGET, target.as_bytes());
        }
        for extra in extras {
            field(&mut hasher, TAG_EXTRA, extra.as_bytes());
        }

        Ok(Self(hasher.finalize().into()))
    }

    /// Fingerprint for a caller-managed key.
    ///
    /// Used by orchestrators that already hold a canonical key for the
    /// decision context.
    pub fn of(key: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(key.as_ref()).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First eight bytes in hex, for logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

/// Length-prefixed, tagged field so adjacent values cannot run together.
fn field(hasher: &mut Sha256, tag: u8, bytes: &[u8]) {
    hasher.update([tag]);
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

fn normalize_names<'a, V>(
    kind: &str,
    map: &'a BTreeMap<String, V>,
) -> CreditResult<BTreeMap<String, &'a V>> {
    let mut out = BTreeMap::new();
    for (name, value) in map {
        let normalized = name.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(CreditError::Derivation(format!("{} with empty name", kind)));
        }
        if out.insert(normalized, value).is_some() {
            return Err(CreditError::Derivation(format!(
                "duplicate {} `{}`",
                kind,
                name.trim()
            )));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> BackendIdentity {
        BackendIdentity::new("https://su1.3scale.net", "svc-1")
    }

    fn request() -> RequestContext {
        RequestContext::new()
            .credential("user_key", "abc123")
            .usage("hits", 1)
    }

    #[test]
    fn test_equivalent_requests_match() {
        let a = Fingerprint::derive(&backend(), &request(), &["GET"]).unwrap();
        let b = Fingerprint::derive(&backend(), &request(), &["GET"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_attribute_order_is_irrelevant() {
        let first = RequestContext::new()
            .credential("app_id", "id")
            .credential("app_key", "key")
            .usage("hits", 1)
            .usage("bytes", 512);
        let second = RequestContext::new()
            .usage("bytes", 512)
            .credential("app_key", "key")
            .usage("hits", 1)
            .credential("app_id", "id");

        let a = Fingerprint::derive(&backend(), &first, &["x", "y"]).unwrap();
        let b = Fingerprint::derive(&backend(), &second, &["y", "x"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_names_are_normalized() {
        let upper = RequestContext::new().credential(" User_Key ", "abc123").usage("HITS", 1);
        let a = Fingerprint::derive(&backend(), &upper, &[]).unwrap();
        let b = Fingerprint::derive(&backend(), &request(), &[]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_target_is_trimmed() {
        let padded = request().target("  GET /orders ");
        let plain = request().target("GET /orders");
        assert_eq!(
            Fingerprint::derive(&backend(), &padded, &[]).unwrap(),
            Fingerprint::derive(&backend(), &plain, &[]).unwrap()
        );

        // Case is part of the operation identity.
        let lower = request().target("get /orders");
        assert_ne!(
            Fingerprint::derive(&backend(), &lower, &[]).unwrap(),
            Fingerprint::derive(&backend(), &plain, &[]).unwrap()
        );

        let blank = request().target("   ");
        assert!(Fingerprint::derive(&backend(), &blank, &[]).is_err());
    }

    #[test]
    fn test_distinct_contexts_differ() {
        let base = Fingerprint::derive(&backend(), &request(), &[]).unwrap();

        let other_service = BackendIdentity::new("https://su1.3scale.net", "svc-2");
        assert_ne!(base, Fingerprint::derive(&other_service, &request(), &[]).unwrap());

        let other_key = RequestContext::new().credential("user_key", "xyz").usage("hits", 1);
        assert_ne!(base, Fingerprint::derive(&backend(), &other_key, &[]).unwrap());

        let more_hits = RequestContext::new().credential("user_key", "abc123").usage("hits", 2);
        assert_ne!(base, Fingerprint::derive(&backend(), &more_hits, &[]).unwrap());

        let targeted = request().target("GET /orders");
        assert_ne!(base, Fingerprint::derive(&backend(), &targeted, &[]).unwrap());

        assert_ne!(base, Fingerprint::derive(&backend(), &request(), &["POST"]).unwrap());
    }

    #[test]
    fn test_fields_do_not_run_together() {
        let a = RequestContext::new().credential("user_key", "ab").credential("x", "c");
        let b = RequestContext::new().credential("user_key", "a").credential("x", "bc");
        assert_ne!(
            Fingerprint::derive(&backend(), &a, &[]).unwrap(),
            Fingerprint::derive(&backend(), &b, &[]).unwrap()
        );
    }

    #[test]
    fn test_derivation_failures() {
        let no_service = BackendIdentity::new("https://su1.3scale.net", " ");
        assert!(matches!(
            Fingerprint::derive(&no_service, &request(), &[]),
            Err(CreditError::Derivation(_))
        ));

        let anonymous = RequestContext::new().usage("hits", 1);
        assert!(Fingerprint::derive(&backend(), &anonymous, &[]).is_err());

        let blank_key = RequestContext::new().credential("user_key", "");
        assert!(Fingerprint::derive(&backend(), &blank_key, &[]).is_err());

        let clash = RequestContext::new()
            .credential("user_key", "a")
            .credential("USER_KEY", "b");
        let err = Fingerprint::derive(&backend(), &clash, &[]).unwrap_err();
        assert!(err.to_string().contains("duplicate credential"));

        assert!(Fingerprint::derive(&backend(), &request(), &[""]).is_err());
    }

    #[test]
    fn test_display_and_short() {
        let fp = Fingerprint::of("A");
        assert_eq!(fp.to_string().len(), 64);
        assert_eq!(fp.short().len(), 16);
        assert!(fp.to_string().starts_with(&fp.short()));
        assert_eq!(Fingerprint::of("A"), fp);
        assert_ne!(Fingerprint::of("B"), fp);
    }
}
