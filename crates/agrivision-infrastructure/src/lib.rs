//! Infrastructure layer: concrete transports behind the core capability traits.
//!
//! - [`config`]: backend connection settings from env vars and an optional TOML file
//! - [`rest`]: record reads and credential auth against the hosted backend
//! - [`poll_feed`]: cursor-based long-poll implementation of the change feed
//! - [`memory`]: in-process backend used by tests and `--demo` mode

pub mod config;
pub mod memory;
pub mod poll_feed;
pub mod rest;

pub use config::BackendConfig;
pub use memory::{InMemoryBackend, InMemoryIdentityService};
pub use poll_feed::PollChangeFeed;
pub use rest::{RestIdentityService, RestPredictionRepository};
