//! Shared types for pybridge: package specifications, dependency manifests,
//! and the status/result records exchanged with the host.

pub mod manifest;
pub mod types;

// Re-exports
pub use manifest::{DependencyRecord, MANIFEST_SUFFIX, Manifest, ManifestError};
pub use types::*;
