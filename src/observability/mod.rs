//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! credit cache / authenticator produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape (when the exporter is installed)
//! ```
//!
//! # Design Decisions
//! - Fingerprints are logged in short hex form, never raw credentials
//! - Metrics are cheap (atomic increments) and safe without a recorder

pub mod logging;
pub mod metrics;
