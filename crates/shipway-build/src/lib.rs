//! Shipway Build - realize a deployment's images and make them pullable
//!
//! The build stage walks the compose specification, builds an image for
//! every service declaring a build context, pushes the batch to the
//! platform registry (creating repositories on demand), and finally points
//! the specification at the pushed, registry-qualified references so the
//! scheduling stage sees final image URIs.
//!
//! The actual builder and registry are external collaborators consumed
//! through [`ImageBuilder`] and [`RegistryClient`].

#![deny(unsafe_code)]

pub mod error;
pub mod stage;
pub mod traits;

pub use error::{BuildError, Result};
pub use stage::{BuildStage, BuiltImage};
pub use traits::{BoxError, ImageBuilder, OutputFn, RegistryAuth, RegistryClient};
