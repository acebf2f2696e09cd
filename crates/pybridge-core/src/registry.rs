//! Backend manifest discovery.
//!
//! Scans a directory for files following the `<backend>_dependencies.toml`
//! convention and keeps the resulting backend → manifest mapping. One broken
//! manifest file never prevents the others from loading: the failure is
//! logged and that backend is simply absent from the map.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use pybridge_schema::{Manifest, ManifestError};

#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Owns the backend → [`Manifest`] mapping for the process lifetime.
///
/// Re-scans replace the held mapping atomically: the full replacement map is
/// built first and swapped in under one write lock, so concurrent readers
/// never observe a partial update.
#[derive(Debug, Default)]
pub struct ManifestRegistry {
    manifests: RwLock<BTreeMap<String, Manifest>>,
}

impl ManifestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `dir` and replace the held mapping with the result. Returns the
    /// number of manifests loaded.
    pub fn discover(&self, dir: &Path) -> usize {
        let map = discover_manifests(dir);
        let count = map.len();
        let mut guard = self
            .manifests
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = map;
        count
    }

    /// Look up one backend's manifest.
    pub fn get(&self, backend: &str) -> Option<Manifest> {
        self.manifests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(backend)
            .cloned()
    }

    /// Names of all discovered backends, sorted.
    pub fn backend_names(&self) -> Vec<String> {
        self.manifests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// A point-in-time copy of the whole mapping.
    pub fn snapshot(&self) -> BTreeMap<String, Manifest> {
        self.manifests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of discovered manifests.
    pub fn len(&self) -> usize {
        self.manifests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when no manifests have been discovered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scan a directory (non-recursively) for manifest files. Fault-contained:
/// a file that fails to read, parse, or validate is logged and skipped.
pub fn discover_manifests(dir: &Path) -> BTreeMap<String, Manifest> {
    let mut map = BTreeMap::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(dir = %dir.display(), %err, "manifest directory not readable");
            return map;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(backend) = Manifest::backend_name_from_path(&path) else {
            continue;
        };
        match load_manifest_file(&backend, &path) {
            Ok(manifest) => {
                tracing::debug!(backend = %backend, specs = manifest.len(), "loaded manifest");
                map.insert(backend, manifest);
            }
            Err(err) => {
                tracing::warn!(
                    manifest = %path.display(),
                    %err,
                    "skipping manifest that failed to load"
                );
            }
        }
    }
    map
}

fn load_manifest_file(backend: &str, path: &Path) -> Result<Manifest, DiscoveryError> {
    let text = std::fs::read_to_string(path)?;
    Ok(Manifest::parse(backend, &text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"
        [[dependency]]
        name = "alpha"
        version = "1.0"

        [[dependency]]
        name = "beta"
        url = "https://example.com/beta-2.0-py3-none-any.whl"
    "#;

    #[test]
    fn discovery_ignores_files_outside_the_convention() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("local_dependencies.toml"), GOOD).unwrap();
        std::fs::write(dir.path().join("notes.toml"), "a = 1").unwrap();
        std::fs::write(dir.path().join("readme.md"), "hello").unwrap();

        let map = discover_manifests(dir.path());
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("local"));
        assert_eq!(map["local"].len(), 2);
    }

    #[test]
    fn one_broken_manifest_does_not_abort_discovery() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("local_dependencies.toml"), GOOD).unwrap();
        std::fs::write(
            dir.path().join("broken_dependencies.toml"),
            "[[dependency]\nname = ",
        )
        .unwrap();
        // Valid TOML, invalid spec: non-registry source with a branch.
        std::fs::write(
            dir.path().join("invalid_dependencies.toml"),
            "[[dependency]]\nname = \"x\"\nbranch = \"main\"\n",
        )
        .unwrap();

        let map = discover_manifests(dir.path());
        assert_eq!(map.keys().collect::<Vec<_>>(), ["local"]);
    }

    #[test]
    fn missing_directory_yields_empty_map() {
        let map = discover_manifests(Path::new("/nonexistent/bridges"));
        assert!(map.is_empty());
    }

    #[test]
    fn rescan_replaces_the_mapping_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("first_dependencies.toml"), GOOD).unwrap();

        let registry = ManifestRegistry::new();
        assert_eq!(registry.discover(dir.path()), 1);
        assert!(registry.get("first").is_some());

        std::fs::remove_file(dir.path().join("first_dependencies.toml")).unwrap();
        std::fs::write(dir.path().join("second_dependencies.toml"), GOOD).unwrap();

        assert_eq!(registry.discover(dir.path()), 1);
        assert!(registry.get("first").is_none());
        assert!(registry.get("second").is_some());
        assert_eq!(registry.backend_names(), ["second"]);
    }
}
