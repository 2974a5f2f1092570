//! Shipway Compose - the user-declared multi-container specification
//!
//! Users push a repository carrying a compose file describing their
//! services. The receiver loads it into a typed, schema-versioned structure
//! once, mutates it through a handful of controlled operations (build-arg
//! and environment injection, port rewriting, image replacement), and
//! serializes it back for the build and scheduling stages.
//!
//! Two schema shapes are recognized transparently: the flat v1 service map
//! and the v2 `{version, services}` document. The shape is resolved once at
//! load time into [`ComposeSchema`], never re-checked per accessor.

#![deny(unsafe_code)]

pub mod error;
pub mod service;
pub mod spec;

pub use error::{ComposeError, Result};
pub use service::{BuildConfig, BuildSection, Environment, PortValue, ServiceConfig, Ulimit};
pub use spec::{ComposeSchema, ComposeSpec};

/// Service receiving injected build args and environment variables.
pub const WEB_SERVICE: &str = "web";
