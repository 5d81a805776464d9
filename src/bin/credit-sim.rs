//! Burst simulator for the batched credit cache.
//!
//! Runs concurrent workers that push requests through a [`BatchedAuthCache`]
//! in front of an in-process mock metering backend, then reports how many
//! backend calls the batches saved.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Serialize;

use credit_cache::authrep::{BatchedAuthCache, CachingAuthenticator};
use credit_cache::config::{load_config, CreditConfig};
use credit_cache::credit::{BackendIdentity, RequestContext};
use credit_cache::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "credit-sim")]
#[command(about = "Simulate a request burst against the batched credit cache", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults are used when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Total requests to send.
    #[arg(short, long, default_value_t = 1000)]
    requests: usize,

    /// Concurrent workers.
    #[arg(short, long, default_value_t = 8)]
    workers: usize,

    /// Distinct applications (credentials) issuing requests.
    #[arg(short, long, default_value_t = 4)]
    apps: usize,

    /// Simulated backend round trip in milliseconds.
    #[arg(long, default_value_t = 5)]
    backend_latency_ms: u64,

    /// Fraction of backend authorizations that are denied (0.0 - 1.0).
    #[arg(long, default_value_t = 0.0)]
    deny_ratio: f64,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Default)]
struct Counters {
    backend_calls: AtomicUsize,
    skipped: AtomicUsize,
    denied: AtomicUsize,
}

#[derive(Serialize)]
struct Summary {
    requests: usize,
    backend_calls: usize,
    skipped: usize,
    denied: usize,
    requests_per_backend_call: f64,
    cached_entries: usize,
    elapsed_ms: u128,
}

/// Stand-in for the remote authorize call.
async fn mock_authorize(latency: Duration, deny_ratio: f64) -> bool {
    tokio::time::sleep(latency).await;
    fastrand::f64() >= deny_ratio
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CreditConfig::default(),
    };

    logging::init(&config.observability.log_level)?;

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    tracing::info!(
        capacity = config.cache.capacity,
        batch_size = config.cache.batch_size,
        requests = cli.requests,
        workers = cli.workers,
        "Starting simulation"
    );

    let auth = BatchedAuthCache::from_config(&config.cache);
    let backend = Arc::new(BackendIdentity::new("https://backend.mock", "svc-sim"));
    let counters = Arc::new(Counters::default());
    let next = Arc::new(AtomicUsize::new(0));
    let latency = Duration::from_millis(cli.backend_latency_ms);
    let deny_ratio = cli.deny_ratio.clamp(0.0, 1.0);
    let apps = cli.apps.max(1);
    let total = cli.requests;

    let start = Instant::now();
    let mut handles = Vec::with_capacity(cli.workers);
    for _ in 0..cli.workers.max(1) {
        let auth = auth.clone();
        let backend = backend.clone();
        let counters = counters.clone();
        let next = next.clone();

        handles.push(tokio::spawn(async move {
            while next.fetch_add(1, Ordering::Relaxed) < total {
                let app = fastrand::usize(..apps);
                let request = RequestContext::new()
                    .credential("user_key", format!("app-{}", app))
                    .usage("hits", 1);

                if auth.decide(&backend, &request, &[]).is_skip() {
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }

                counters.backend_calls.fetch_add(1, Ordering::Relaxed);
                let result = if mock_authorize(latency, deny_ratio).await {
                    auth.cache(&backend, &request, &[])
                } else {
                    counters.denied.fetch_add(1, Ordering::Relaxed);
                    auth.invalidate(&backend, &request, &[])
                };
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Failed to record backend result");
                }
            }
        }));
    }

    for handle in handles {
        handle.await?;
    }

    let backend_calls = counters.backend_calls.load(Ordering::Relaxed);
    let summary = Summary {
        requests: total,
        backend_calls,
        skipped: counters.skipped.load(Ordering::Relaxed),
        denied: counters.denied.load(Ordering::Relaxed),
        requests_per_backend_call: if backend_calls == 0 {
            0.0
        } else {
            total as f64 / backend_calls as f64
        },
        cached_entries: auth.credits().len(),
        elapsed_ms: start.elapsed().as_millis(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("requests:               {}", summary.requests);
        println!("backend calls:          {}", summary.backend_calls);
        println!("skipped (batched):      {}", summary.skipped);
        println!("denied:                 {}", summary.denied);
        println!("requests/backend call:  {:.2}", summary.requests_per_backend_call);
        println!("cached entries:         {}", summary.cached_entries);
        println!("elapsed:                {} ms", summary.elapsed_ms);
    }

    Ok(())
}
