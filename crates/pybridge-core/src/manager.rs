//! Host-facing dependency management surface.
//!
//! [`DependencyManager`] wires the registry, resolver, installer, status
//! inspector, and environment together behind the operations the host
//! integration layer calls. Configuration is explicit: an instance owns its
//! interpreter path, environment paths, and manifest map; there are no
//! ambient globals.
//!
//! Resolution and install failures cross this surface as [`InstallResult`]
//! error values rather than `Err`, because the host renders a
//! per-dependency list and must not abort on the first failure.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::environment::Environment;
use crate::installer::{InstallError, InstallRequest};
use crate::registry::ManifestRegistry;
use crate::reporter::Reporter;
use crate::resolver::{ResolveError, ResolvedRef, SourceResolver};
use crate::status::StatusInspector;
use pybridge_schema::{DependencyStatus, InstallResult, Manifest, PackageSpec};

/// A manifest-level operation named a backend the registry does not know.
#[derive(thiserror::Error, Debug)]
#[error("Unknown backend '{0}'")]
pub struct UnknownBackend(pub String);

/// Explicit configuration for a [`DependencyManager`].
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Python interpreter used to invoke the package manager.
    pub python: PathBuf,
    /// Install target handed to `--target`.
    pub site_packages: PathBuf,
    /// Previously-used environment location, cleared on request.
    pub legacy_site_packages: Option<PathBuf>,
    /// Cache directory for downloaded artifacts.
    pub wheel_cache: PathBuf,
}

impl ManagerConfig {
    /// Configuration rooted at the standard layout (see [`crate::paths`]),
    /// with the interpreter discovered on `PATH`. Falls back to a bare
    /// `python3` when discovery fails; the interpreter is only executed at
    /// install time, so status-only flows still work without one.
    pub fn from_default_paths() -> Self {
        Self {
            python: discover_python().unwrap_or_else(|| PathBuf::from("python3")),
            site_packages: crate::paths::site_packages_path(),
            legacy_site_packages: Some(crate::paths::legacy_site_packages_path()),
            wheel_cache: crate::paths::wheel_cache_path(),
        }
    }
}

/// Locate a Python interpreter on `PATH`.
pub fn discover_python() -> Option<PathBuf> {
    which::which("python3")
        .or_else(|_| which::which("python"))
        .ok()
}

/// Owns the dependency subsystem for one isolated environment.
#[derive(Debug)]
pub struct DependencyManager {
    config: ManagerConfig,
    registry: ManifestRegistry,
    resolver: SourceResolver,
    inspector: StatusInspector,
    environment: Environment,
    // Concurrent installs into one target directory are unsafe; this is the
    // single-flight lock for the environment this manager owns.
    install_lock: tokio::sync::Mutex<()>,
}

impl DependencyManager {
    pub fn new(config: ManagerConfig) -> Self {
        let mut environment = Environment::new(&config.site_packages);
        if let Some(legacy) = &config.legacy_site_packages {
            environment = environment.with_legacy(legacy);
        }
        Self {
            resolver: SourceResolver::new(reqwest::Client::new(), &config.wheel_cache),
            inspector: StatusInspector::new(&config.site_packages),
            environment,
            registry: ManifestRegistry::new(),
            install_lock: tokio::sync::Mutex::new(()),
            config,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ManifestRegistry {
        &self.registry
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Install a hook invoked once whenever the environment is cleared, so
    /// the host can persist a "dependencies were reset" flag.
    pub fn set_reset_hook(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.environment.set_reset_hook(hook);
    }

    /// Re-scan `dir` for backend manifests, replacing the held mapping
    /// atomically. Returns the number of manifests loaded.
    pub fn load_manifests(&self, dir: &Path) -> usize {
        self.registry.discover(dir)
    }

    /// Resolve a spec without installing it (the dry-run path).
    ///
    /// # Errors
    ///
    /// Propagates [`ResolveError`] from artifact downloads.
    pub async fn resolve<R: Reporter>(
        &self,
        spec: &PackageSpec,
        reporter: &R,
    ) -> Result<ResolvedRef, ResolveError> {
        self.resolver.resolve(spec, reporter).await
    }

    /// Resolve and install one spec. Every failure mode is folded into the
    /// returned [`InstallResult`].
    pub async fn install_dependency<R: Reporter>(
        &self,
        spec: &PackageSpec,
        force_reinstall: bool,
        reporter: &R,
        cancel: &CancellationToken,
    ) -> InstallResult {
        let _flight = self.install_lock.lock().await;

        if let Err(err) = self.environment.ensure() {
            return InstallResult::error(spec.name.clone(), None, err.to_string());
        }

        let reference = match self.resolver.resolve(spec, reporter).await {
            Ok(reference) => reference,
            Err(err) => {
                return InstallResult::error(spec.name.clone(), None, err.to_string());
            }
        };

        let outcome = InstallRequest::new(
            &self.config.python,
            self.environment.site_packages(),
            &reference,
            spec,
            reporter,
        )
        .with_force_reinstall(force_reinstall)
        .with_cancel(cancel.clone())
        .execute()
        .await;

        match outcome {
            Ok(result) => result,
            Err(InstallError::Cancelled) => {
                InstallResult::error(spec.name.clone(), None, "Install cancelled")
            }
            Err(err) => InstallResult::error(spec.name.clone(), None, err.to_string()),
        }
    }

    /// Install a backend's dependencies sequentially, in manifest order.
    ///
    /// Already-satisfied specs are skipped unless `force_reinstall` is set.
    /// A failure in one spec never prevents attempting the rest; the full
    /// per-spec outcome list is returned.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownBackend`] when no manifest with that name exists.
    pub async fn install_manifest<R: Reporter>(
        &self,
        backend: &str,
        force_reinstall: bool,
        reporter: &R,
        cancel: &CancellationToken,
    ) -> Result<Vec<InstallResult>, UnknownBackend> {
        let manifest = self.manifest(backend)?;
        let started = Instant::now();
        reporter.section(&format!("Installing dependencies for '{backend}'"));

        let mut results = Vec::with_capacity(manifest.len());
        for spec in manifest.specs() {
            if cancel.is_cancelled() {
                reporter.warning("Install cancelled; remaining dependencies skipped");
                break;
            }
            if !force_reinstall && self.inspector.status(spec).is_installed() {
                reporter.done(&spec.name, "already installed");
                continue;
            }

            let result = self
                .install_dependency(spec, force_reinstall, reporter, cancel)
                .await;
            if result.is_installed() {
                reporter.done(&spec.name, "installed");
            } else {
                let reason = result
                    .message
                    .as_deref()
                    .and_then(|m| m.lines().next_back())
                    .unwrap_or("install failed");
                reporter.failed(&spec.name, reason);
            }
            results.push(result);
        }

        let installed = results.iter().filter(|r| r.is_installed()).count();
        let failed = results.len() - installed;
        reporter.summary(installed, failed, started.elapsed().as_secs_f64());
        Ok(results)
    }

    /// Probe one spec against the target environment.
    pub fn dependency_status(&self, spec: &PackageSpec) -> DependencyStatus {
        self.inspector.status(spec)
    }

    /// Probe every spec in a backend's manifest, in manifest order.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownBackend`] when no manifest with that name exists.
    pub fn manifest_status(&self, backend: &str) -> Result<Vec<DependencyStatus>, UnknownBackend> {
        let manifest = self.manifest(backend)?;
        Ok(manifest
            .specs()
            .iter()
            .map(|spec| self.inspector.status(spec))
            .collect())
    }

    /// Every unsatisfied spec of a backend: the whole list, not just the
    /// first, so the host can present the complete set to the operator.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownBackend`] when no manifest with that name exists.
    pub fn missing_dependencies(
        &self,
        backend: &str,
    ) -> Result<Vec<DependencyStatus>, UnknownBackend> {
        Ok(self
            .manifest_status(backend)?
            .into_iter()
            .filter(|status| !status.is_installed())
            .collect())
    }

    /// True iff every spec in the backend's manifest reports installed.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownBackend`] when no manifest with that name exists.
    pub fn all_dependencies_installed(&self, backend: &str) -> Result<bool, UnknownBackend> {
        Ok(self.missing_dependencies(backend)?.is_empty())
    }

    /// Clear the isolated environment (and optionally the legacy location).
    /// The next install re-creates the target via `ensure`.
    ///
    /// # Errors
    ///
    /// Propagates filesystem errors from the delete.
    pub fn clear_all_dependencies(&self, also_clear_legacy: bool) -> std::io::Result<()> {
        self.environment.clear(also_clear_legacy)
    }

    fn manifest(&self, backend: &str) -> Result<Manifest, UnknownBackend> {
        self.registry
            .get(backend)
            .ok_or_else(|| UnknownBackend(backend.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use pybridge_schema::{DependencyState, PackageSource};

    fn manager_in(tmp: &Path) -> DependencyManager {
        DependencyManager::new(ManagerConfig {
            python: PathBuf::from("python3"),
            site_packages: tmp.join("env/site-packages"),
            legacy_site_packages: Some(tmp.join("site-packages")),
            wheel_cache: tmp.join("wheels"),
        })
    }

    fn write_manifest(dir: &Path, backend: &str, body: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(format!("{backend}_dependencies.toml")), body).unwrap();
    }

    fn mark_installed(site_packages: &Path, name: &str, version: &str) {
        let dist = site_packages.join(format!("{name}-{version}.dist-info"));
        std::fs::create_dir_all(&dist).unwrap();
        let module = site_packages.join(name);
        std::fs::create_dir_all(&module).unwrap();
        std::fs::write(module.join("__init__.py"), "").unwrap();
    }

    #[test]
    fn missing_dependencies_reports_every_gap() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = manager_in(tmp.path());
        let bridges = tmp.path().join("bridges");
        write_manifest(
            &bridges,
            "local",
            r#"
                [[dependency]]
                name = "alpha"
                version = "1.0"

                [[dependency]]
                name = "beta"

                [[dependency]]
                name = "gamma"
            "#,
        );
        assert_eq!(manager.load_manifests(&bridges), 1);

        mark_installed(&manager.config().site_packages, "beta", "2.0");

        let missing = manager.missing_dependencies("local").unwrap();
        let names: Vec<_> = missing.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["alpha", "gamma"]);
        assert!(!manager.all_dependencies_installed("local").unwrap());

        mark_installed(&manager.config().site_packages, "alpha", "1.0");
        mark_installed(&manager.config().site_packages, "gamma", "0.1");
        assert!(manager.all_dependencies_installed("local").unwrap());
    }

    #[test]
    fn unknown_backend_is_an_explicit_error() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = manager_in(tmp.path());
        assert!(manager.manifest_status("nope").is_err());
        assert!(manager.all_dependencies_installed("nope").is_err());
    }

    #[tokio::test]
    async fn resolution_failure_becomes_an_error_result() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone-1.0-py3-none-any.whl")
            .with_status(503)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let manager = manager_in(tmp.path());
        let mut spec = PackageSpec::registry("gone", None);
        spec.source = PackageSource::Wheel {
            url: format!("{}/gone-1.0-py3-none-any.whl", server.url()),
        };

        let result = manager
            .install_dependency(&spec, false, &NullReporter, &CancellationToken::new())
            .await;
        assert_eq!(result.state, DependencyState::Error);
        assert!(result.message.as_deref().unwrap().contains("status=503"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn install_manifest_continues_past_failures() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();

        // Stub interpreter: fails only for the 'bad' requirement.
        let python = tmp.path().join("fake-python");
        std::fs::write(
            &python,
            "#!/bin/sh\ncase \"$*\" in *bad*) echo 'cannot install bad' >&2; exit 1;; esac\necho ok\nexit 0\n",
        )
        .unwrap();
        let mut perms = std::fs::metadata(&python).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&python, perms).unwrap();

        let mut manager = manager_in(tmp.path());
        manager.config.python.clone_from(&python);
        let bridges = tmp.path().join("bridges");
        write_manifest(
            &bridges,
            "local",
            r#"
                [[dependency]]
                name = "bad"

                [[dependency]]
                name = "good"
            "#,
        );
        manager.load_manifests(&bridges);

        let results = manager
            .install_manifest("local", false, &NullReporter, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].state, DependencyState::Error);
        assert_eq!(results[0].exit_code, Some(1));
        assert_eq!(results[1].state, DependencyState::Installed);
        // The environment was created on demand.
        assert!(manager.config().site_packages.is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn satisfied_specs_are_skipped_unless_forced() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let python = tmp.path().join("fake-python");
        std::fs::write(&python, "#!/bin/sh\necho ran\nexit 0\n").unwrap();
        let mut perms = std::fs::metadata(&python).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&python, perms).unwrap();

        let mut manager = manager_in(tmp.path());
        manager.config.python.clone_from(&python);
        let bridges = tmp.path().join("bridges");
        write_manifest(
            &bridges,
            "local",
            "[[dependency]]\nname = \"alpha\"\nversion = \"1.0\"\n",
        );
        manager.load_manifests(&bridges);
        mark_installed(&manager.config().site_packages, "alpha", "1.0");

        let results = manager
            .install_manifest("local", false, &NullReporter, &CancellationToken::new())
            .await
            .unwrap();
        assert!(results.is_empty());

        let forced = manager
            .install_manifest("local", true, &NullReporter, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(forced.len(), 1);
        assert!(forced[0].is_installed());
    }
}
