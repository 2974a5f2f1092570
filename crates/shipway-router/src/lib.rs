//! Shipway Router - edge proxy route registration
//!
//! The edge proxy (vulcand) watches the metadata store and reconfigures
//! itself from records written under `/vulcand`. Publishing a deployment
//! means writing three kinds of records:
//!
//! - a backend per project (`{"Type":"http"}`),
//! - a frontend per routing identifier, carrying the host-matching route,
//! - a server per deployed web container, carrying its reachable URL.
//!
//! Records are plain JSON strings in the store; the proxy itself is never
//! contacted directly.

#![deny(unsafe_code)]

pub mod error;
pub mod records;
pub mod router;

pub use error::{Result, RouterError};
pub use records::{Backend, Frontend, FrontendSettings, Server};
pub use router::Router;

/// Root of the proxy's configuration subtree in the store.
pub const ROUTER_KEY_BASE: &str = "/vulcand";
