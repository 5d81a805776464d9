//! Gateway-facing flow: decide, call the backend on a miss, record the result.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use credit_cache::authrep::{AuthDecision, BackendReason, BatchedAuthCache, CachingAuthenticator};
use credit_cache::config::CacheConfig;
use credit_cache::credit::{BackendIdentity, RequestContext};

mod common;

/// Drive one request the way the gateway plugin does.
fn handle(auth: &BatchedAuthCache, request: &RequestContext, backend_calls: &AtomicUsize, allow: bool) {
    let backend = common::backend();
    if auth.decide(&backend, request, &[]).is_skip() {
        return;
    }
    backend_calls.fetch_add(1, Ordering::SeqCst);
    if allow {
        auth.cache(&backend, request, &[]).unwrap();
    } else {
        auth.invalidate(&backend, request, &[]).unwrap();
    }
}

#[test]
fn test_one_backend_call_per_batch() {
    let config = CacheConfig {
        capacity: 128,
        batch_size: 5,
    };
    let auth = BatchedAuthCache::from_config(&config);
    let calls = AtomicUsize::new(0);
    let request = common::request("app-1");

    // First request goes to the backend, the next five ride on the batch.
    for _ in 0..6 {
        handle(&auth, &request, &calls, true);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    handle(&auth, &request, &calls, true);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_denied_requests_always_reach_backend() {
    let auth = BatchedAuthCache::from_config(&CacheConfig::default());
    let calls = AtomicUsize::new(0);
    let request = common::request("revoked");

    for _ in 0..10 {
        handle(&auth, &request, &calls, false);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 10);
}

#[test]
fn test_denial_drops_remaining_batch() {
    let auth = BatchedAuthCache::from_config(&CacheConfig::default());
    let backend = common::backend();
    let request = common::request("app");

    auth.cache(&backend, &request, &[]).unwrap();
    assert!(auth.decide(&backend, &request, &[]).is_skip());

    auth.invalidate(&backend, &request, &[]).unwrap();
    assert_eq!(
        auth.decide(&backend, &request, &[]),
        AuthDecision::CallBackend {
            reason: BackendReason::NoCredit
        }
    );
}

#[test]
fn test_backends_do_not_share_credit() {
    let auth = BatchedAuthCache::from_config(&CacheConfig::default());
    let request = common::request("app");
    let other = BackendIdentity::new("https://su1.3scale.net", "svc-other");

    auth.cache(&common::backend(), &request, &[]).unwrap();
    assert!(auth.is_auth_cached(&common::backend(), &request, &[]).unwrap());
    assert!(!auth.is_auth_cached(&other, &request, &[]).unwrap());
}

#[test]
fn test_malformed_request_fails_open_to_backend() {
    let auth = BatchedAuthCache::from_config(&CacheConfig::default());
    let anonymous = RequestContext::new().usage("hits", 1);

    assert!(auth.is_auth_cached(&common::backend(), &anonymous, &[]).is_err());
    assert!(auth.should_force_async_authrep(&common::backend(), &anonymous, &[]).is_err());
    assert!(matches!(
        auth.decide(&common::backend(), &anonymous, &[]),
        AuthDecision::CallBackend {
            reason: BackendReason::Underivable(_)
        }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_gateway_tasks() {
    let batch = 4;
    let auth = BatchedAuthCache::from_config(&CacheConfig {
        capacity: 64,
        batch_size: batch,
    });
    let backend = common::backend();
    let request = common::request("burst");
    auth.cache(&backend, &request, &[]).unwrap();

    let skips = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let auth = auth.clone();
            let backend = backend.clone();
            let request = request.clone();
            let skips = skips.clone();
            tokio::spawn(async move {
                if auth.decide(&backend, &request, &[]).is_skip() {
                    skips.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for t in tasks {
        t.await.unwrap();
    }

    assert_eq!(skips.load(Ordering::SeqCst), batch as usize);
}
