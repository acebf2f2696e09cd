//! Backend dependency manifests.
//!
//! Each backend ("bridge") ships a declarative manifest file named
//! `<backend>_dependencies.toml` listing the packages it needs, in install
//! order:
//!
//! ```toml
//! [[dependency]]
//! name = "torch"
//! version = "1.13.1+cu117"
//! args = ["--extra-index-url", "https://download.pytorch.org/whl/cu117"]
//!
//! [[dependency]]
//! name = "xformers"
//! url = "https://example.com/xformers-0.0.15-cp39-none-win_amd64.whl"
//! ```
//!
//! Records are plain data; the source kind is inferred from the `url` field
//! (`.git` in the URL means a VCS install, any other URL is a downloadable
//! artifact, no URL means a registry install).

use std::path::Path;

use serde::Deserialize;

use crate::types::{PackageName, PackageSource, PackageSpec, SpecError};

/// Naming convention suffix for manifest files.
pub const MANIFEST_SUFFIX: &str = "_dependencies.toml";

/// Errors raised while parsing a manifest file.
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    /// The file is not valid TOML for the manifest schema.
    #[error("Invalid manifest TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A dependency record failed validation.
    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// One `[[dependency]]` record as written in a manifest file.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyRecord {
    /// Distribution name.
    pub name: String,
    /// Exact version pin; absent means latest.
    pub version: Option<String>,
    /// Source URL for VCS or artifact installs.
    pub url: Option<String>,
    /// Branch/tag/commit for VCS installs.
    pub branch: Option<String>,
    /// Extra package-manager arguments, passed through verbatim.
    #[serde(default)]
    pub args: Vec<String>,
    /// Skip the package manager's own download cache.
    #[serde(default)]
    pub no_cache: bool,
    /// Always upgrade to the newest matching release.
    #[serde(default)]
    pub upgrade: bool,
    /// Importable module name override for status probes.
    pub module: Option<String>,
}

impl DependencyRecord {
    /// Classify the record's source and build a validated [`PackageSpec`].
    ///
    /// # Errors
    ///
    /// Returns a [`SpecError`] when the record violates a source invariant
    /// (empty name, blank URL, branch without a git URL).
    pub fn into_spec(self) -> Result<PackageSpec, SpecError> {
        if self.name.is_empty() {
            return Err(SpecError::EmptyName);
        }

        let source = match self.url {
            None => {
                if self.branch.is_some() {
                    return Err(SpecError::BranchWithoutVcs(self.name));
                }
                PackageSource::Registry
            }
            Some(url) if url.contains(".git") => PackageSource::Vcs {
                url,
                branch: self.branch,
            },
            Some(url) => {
                if self.branch.is_some() {
                    return Err(SpecError::BranchWithoutVcs(self.name));
                }
                PackageSource::Wheel { url }
            }
        };

        let spec = PackageSpec {
            name: PackageName::new(&self.name),
            version: self.version,
            source,
            args: self.args,
            module: self.module,
            no_cache: self.no_cache,
            upgrade: self.upgrade,
        };
        spec.validate()?;
        Ok(spec)
    }
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    dependency: Vec<DependencyRecord>,
}

/// Ordered set of package specifications required by one backend.
///
/// Order is insertion order from the defining file. Specs are independent
/// units; the order is a recommendation for sequential installs, not a
/// dependency chain.
#[derive(Debug, Clone)]
pub struct Manifest {
    name: String,
    specs: Vec<PackageSpec>,
}

impl Manifest {
    /// Parse a manifest from its TOML source.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] if the TOML is malformed or any record
    /// fails spec validation. Callers discovering many manifests are expected
    /// to contain this failure per file.
    pub fn parse(backend: &str, toml_text: &str) -> Result<Self, ManifestError> {
        let file: ManifestFile = toml::from_str(toml_text)?;
        let specs = file
            .dependency
            .into_iter()
            .map(DependencyRecord::into_spec)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: backend.to_string(),
            specs,
        })
    }

    /// Construct a manifest from already-validated specs.
    pub fn new(name: impl Into<String>, specs: Vec<PackageSpec>) -> Self {
        Self {
            name: name.into(),
            specs,
        }
    }

    /// Derive the backend name from a manifest file path, if the file name
    /// follows the `<backend>_dependencies.toml` convention.
    pub fn backend_name_from_path(path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_str()?;
        let backend = file_name.strip_suffix(MANIFEST_SUFFIX)?;
        if backend.is_empty() {
            None
        } else {
            Some(backend.to_string())
        }
    }

    /// The owning backend's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The specs in declaration order.
    pub fn specs(&self) -> &[PackageSpec] {
        &self.specs
    }

    /// Number of specs in the manifest.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns `true` when the manifest declares no dependencies.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Look up a spec by name.
    pub fn find(&self, name: &PackageName) -> Option<&PackageSpec> {
        self.specs.iter().find(|s| &s.name == name)
    }
}
