//! Shipway Store - hierarchical metadata store access
//!
//! The platform keeps its mutable state in a distributed, consistent
//! key/value store with `/`-delimited hierarchical keys. This crate owns:
//!
//! - [`KvStore`]: the capability trait the rest of the receiver consumes
//! - [`MemoryKvStore`]: in-memory implementation for development and tests
//! - [`AppStore`]: typed access to per-application metadata (registration,
//!   build args, environment variables, deployment history)
//!
//! Persisted layout under the configured namespace:
//!
//! ```text
//! /{ns}/users/{user}/apps/{app}                      (registration marker)
//! /{ns}/users/{user}/apps/{app}/build-args/{KEY}
//! /{ns}/users/{user}/apps/{app}/envs/{KEY}
//! /{ns}/users/{user}/apps/{app}/deployments/{ts}     = revision
//! ```

#![deny(unsafe_code)]

pub mod app;
pub mod error;
pub mod kv;
pub mod memory;

pub use app::AppStore;
pub use error::{Result, StoreError};
pub use kv::KvStore;
pub use memory::MemoryKvStore;
