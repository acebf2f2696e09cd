use serde::{Deserialize, Serialize};

/// Name of a Python distribution as it appears on an index (e.g. "torch").
///
/// Normalized to lowercase on construction so that lookups and manifest keys
/// are case-insensitive, matching how package indexes treat names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name, normalizing the input to lowercase.
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// Return the normalized name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::ffi::OsStr> for PackageName {
    fn as_ref(&self) -> &std::ffi::OsStr {
        self.0.as_ref()
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.to_lowercase()
    }
}

/// Where a package's installable artifact comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageSource {
    /// Plain index install; pip resolves `name==version` (or latest) itself.
    Registry,
    /// Git-hosted source tree installed via a `git+<url>` reference.
    Vcs {
        /// Repository URL (anything containing `.git`).
        url: String,
        /// Optional branch, tag, or commit appended as `@<ref>`.
        branch: Option<String>,
    },
    /// URL-hosted artifact (wheel or sdist) downloaded to a local cache
    /// before install.
    Wheel {
        /// Direct download URL.
        url: String,
    },
}

/// Errors raised when validating a [`PackageSpec`].
#[derive(thiserror::Error, Debug)]
pub enum SpecError {
    /// The package name is empty.
    #[error("Package name is empty")]
    EmptyName,

    /// A VCS or wheel source was declared without a URL.
    #[error("Package '{0}' declares a non-registry source but no URL")]
    MissingUrl(String),

    /// A branch was given for a package that is not installed from VCS.
    #[error("Package '{0}' sets a branch but its source is not a git repository")]
    BranchWithoutVcs(String),
}

/// One installable dependency as declared by a backend manifest.
///
/// Immutable once constructed; specs are built from manifest records at
/// discovery time and validated then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Distribution name, unique within its manifest.
    pub name: PackageName,

    /// Exact version pin. `None` means "latest".
    pub version: Option<String>,

    /// Artifact source.
    pub source: PackageSource,

    /// Extra arguments passed through to the package manager verbatim
    /// (e.g. an alternate index URL).
    #[serde(default)]
    pub args: Vec<String>,

    /// Importable module name when it differs from the distribution name
    /// (e.g. distribution "pillow" imports as "PIL").
    pub module: Option<String>,

    /// Append `--no-cache` to the install invocation.
    #[serde(default)]
    pub no_cache: bool,

    /// Append `--upgrade` to the install invocation.
    #[serde(default)]
    pub upgrade: bool,
}

impl PackageSpec {
    /// Convenience constructor for a plain registry dependency.
    pub fn registry(name: &str, version: Option<&str>) -> Self {
        Self {
            name: PackageName::new(name),
            version: version.map(str::to_string),
            source: PackageSource::Registry,
            args: Vec::new(),
            module: None,
            no_cache: false,
            upgrade: false,
        }
    }

    /// Validates the spec's source invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::EmptyName`] if the name is empty, or
    /// [`SpecError::MissingUrl`] if a VCS/wheel source carries an empty URL.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.name.as_str().is_empty() {
            return Err(SpecError::EmptyName);
        }
        match &self.source {
            PackageSource::Registry => Ok(()),
            PackageSource::Vcs { url, .. } | PackageSource::Wheel { url } => {
                if url.trim().is_empty() {
                    Err(SpecError::MissingUrl(self.name.to_string()))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// The module name to probe when checking install status.
    pub fn module_name(&self) -> &str {
        self.module.as_deref().unwrap_or(self.name.as_str())
    }
}

/// Terminal state of a dependency, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyState {
    /// No trace of the package in the target environment.
    NotInstalled,
    /// Package metadata or module found in the target environment.
    Installed,
    /// The last install attempt failed.
    Error,
}

impl std::fmt::Display for DependencyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotInstalled => "not installed",
            Self::Installed => "installed",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Outcome of a single install attempt. Created and consumed per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallResult {
    /// Name of the spec that was installed.
    pub name: PackageName,
    /// [`DependencyState::Installed`] or [`DependencyState::Error`].
    pub state: DependencyState,
    /// Exit code of the package-manager process, verbatim. `None` when the
    /// process never ran or was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured error text; present iff `state` is an error.
    pub message: Option<String>,
}

impl InstallResult {
    /// Successful install.
    pub fn installed(name: PackageName) -> Self {
        Self {
            name,
            state: DependencyState::Installed,
            exit_code: Some(0),
            message: None,
        }
    }

    /// Failed install with the process exit code and captured error text.
    pub fn error(name: PackageName, exit_code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            name,
            state: DependencyState::Error,
            exit_code,
            message: Some(message.into()),
        }
    }

    /// Returns `true` if the install completed successfully.
    pub fn is_installed(&self) -> bool {
        self.state == DependencyState::Installed
    }
}

/// Result of a status probe for one spec. Recomputed on every query; the
/// target directory can change underneath the process, so nothing is cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyStatus {
    /// Name of the probed spec.
    pub name: PackageName,
    /// Installed / not installed.
    pub state: DependencyState,
    /// Version recorded in the environment's package metadata, when found.
    pub version: Option<String>,
    /// Whether the importable module resolves in the target environment.
    pub module_found: bool,
}

impl DependencyStatus {
    /// Returns `true` if the probe found the dependency installed.
    pub fn is_installed(&self) -> bool {
        self.state == DependencyState::Installed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_name_normalizes_case() {
        let name = PackageName::new("Pillow");
        assert_eq!(name.as_str(), "pillow");
        assert_eq!(name, "PILLOW");
    }

    #[test]
    fn registry_spec_validates() {
        let spec = PackageSpec::registry("torch", Some("1.13.1+cu117"));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn non_registry_source_requires_url() {
        let mut spec = PackageSpec::registry("xformers", None);
        spec.source = PackageSource::Wheel { url: "  ".into() };
        assert!(matches!(spec.validate(), Err(SpecError::MissingUrl(_))));
    }

    #[test]
    fn empty_name_rejected() {
        let spec = PackageSpec::registry("", None);
        assert!(matches!(spec.validate(), Err(SpecError::EmptyName)));
    }

    #[test]
    fn module_name_prefers_override() {
        let mut spec = PackageSpec::registry("pillow", None);
        assert_eq!(spec.module_name(), "pillow");
        spec.module = Some("PIL".into());
        assert_eq!(spec.module_name(), "PIL");
    }
}
