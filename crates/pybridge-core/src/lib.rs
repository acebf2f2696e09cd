//! Core dependency-bootstrap logic for pybridge.
//!
//! Discovers per-backend dependency manifests, resolves each package
//! specification to a concrete installable reference, and materializes it
//! into an isolated `--target` environment via the external package manager,
//! streaming process output back to the embedding host as it is produced.

pub mod environment;
pub mod installer;
pub mod manager;
pub mod paths;
pub mod registry;
pub mod reporter;
pub mod resolver;
pub mod status;

pub use manager::{DependencyManager, ManagerConfig};
pub use paths::*;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for wheel downloads
pub const USER_AGENT: &str = concat!("pybridge-core/", env!("CARGO_PKG_VERSION"));
