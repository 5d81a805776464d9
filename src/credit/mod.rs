//! Credit cache subsystem.
//!
//! # Data Flow
//! ```text
//! request context + backend identity
//!     → fingerprint.rs (normalize, hash into a Fingerprint)
//!     → cache.rs (has_credit / decrement_and_check / seed / invalidate)
//!         → DashMap shard lock (per-key atomic step)
//!         → recency.rs (LRU order, chooses capacity victims)
//! ```
//!
//! # Lifecycle of an entry
//! ```text
//! absent ──has_credit──▶ Placeholder ──seed──▶ Active(N)
//!   ▲                         │                   │ decrement_and_check
//!   │                         │                   ▼
//!   └──── invalidate / capacity eviction / exhausted (observed ≤ 1)
//! ```
//!
//! # Design Decisions
//! - Tagged state instead of a magic sentinel value
//! - No global lock around the entry map; only the recency order is shared
//! - Batch size is a constructor input, never a literal in the cache logic

pub mod cache;
pub mod entry;
pub mod error;
pub mod fingerprint;
mod recency;

pub use cache::CreditCache;
pub use entry::Credit;
pub use error::{BoxError, CreditError, CreditResult};
pub use fingerprint::{BackendIdentity, Fingerprint, RequestContext};
