//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CreditConfig (validated, immutable)
//!     → CreditCache::from_config / logging / metrics
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Batch size is loaded once; changing it means building a new cache

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{CacheConfig, CreditConfig, ObservabilityConfig, DEFAULT_BATCH_SIZE};
