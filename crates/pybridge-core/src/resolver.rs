//! Package source resolution.
//!
//! Turns a [`PackageSpec`] into the concrete reference handed to the package
//! manager: a plain `name==version` pin, a `git+` VCS reference, or the local
//! path of a URL-hosted artifact downloaded into the wheel cache.
//!
//! Downloads are streamed to disk and reported chunk-by-chunk. A cached file
//! of the same derived name is reused without touching the network; artifact
//! content is assumed immutable once named. No retries happen at this layer,
//! retry policy belongs to the caller.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;
use crate::paths::filename_from_url;
use pybridge_schema::{PackageSource, PackageSpec};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed, status={status} for {url}")]
    Status { status: u16, url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The concrete reference handed to the package manager for one spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRef {
    /// Registry reference: `<name>==<version>`, or bare `<name>` for latest.
    Registry(String),
    /// VCS reference: `git+<url>[@<ref>]#egg=<name>`.
    Vcs(String),
    /// Absolute path of a downloaded artifact (wheel or sdist).
    Artifact(PathBuf),
}

impl ResolvedRef {
    /// The reference as a single package-manager argument.
    pub fn as_install_arg(&self) -> Cow<'_, str> {
        match self {
            Self::Registry(s) | Self::Vcs(s) => Cow::Borrowed(s),
            Self::Artifact(p) => p.to_string_lossy(),
        }
    }
}

impl std::fmt::Display for ResolvedRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_install_arg())
    }
}

/// Resolves package sources against a local artifact cache.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    client: Client,
    wheel_cache: PathBuf,
}

impl SourceResolver {
    /// Create a resolver that caches downloaded artifacts under `wheel_cache`.
    pub fn new(client: Client, wheel_cache: impl Into<PathBuf>) -> Self {
        Self {
            client,
            wheel_cache: wheel_cache.into(),
        }
    }

    /// Resolve a spec to its installable reference, fetching URL-hosted
    /// artifacts into the cache when absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] when an artifact download fails; registry
    /// and VCS references never fail to resolve.
    pub async fn resolve<R: Reporter>(
        &self,
        spec: &PackageSpec,
        reporter: &R,
    ) -> Result<ResolvedRef, ResolveError> {
        match &spec.source {
            PackageSource::Registry => Ok(ResolvedRef::Registry(registry_ref(spec))),
            PackageSource::Vcs { url, branch } => {
                Ok(ResolvedRef::Vcs(vcs_ref(spec, url, branch.as_deref())))
            }
            PackageSource::Wheel { url } => {
                let path = self.fetch_artifact(spec, url, reporter).await?;
                Ok(ResolvedRef::Artifact(path))
            }
        }
    }

    /// Download a URL-hosted artifact into the cache, or reuse the cached
    /// copy when one of the same derived name is already present.
    async fn fetch_artifact<R: Reporter>(
        &self,
        spec: &PackageSpec,
        url: &str,
        reporter: &R,
    ) -> Result<PathBuf, ResolveError> {
        tokio::fs::create_dir_all(&self.wheel_cache).await?;

        // A name derivable from the URL alone lets a cache hit skip the
        // network entirely.
        if let Some(name) = filename_from_url_component(url) {
            let dest = self.wheel_cache.join(&name);
            if dest.is_file() {
                tracing::debug!(artifact = %dest.display(), "using cached artifact");
                return Ok(dest);
            }
        }

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(ResolveError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        // Content-Disposition wins over the URL path when the server names
        // the file explicitly.
        let name = content_disposition_filename(response.headers())
            .or_else(|| filename_from_url_component(url))
            .unwrap_or_else(|| format!("{}.whl", spec.name));
        let dest = self.wheel_cache.join(&name);
        if dest.is_file() {
            return Ok(dest);
        }

        let total = response.content_length();
        reporter.downloading(&spec.name, 0, total);

        // Stream to a partial file and rename on completion, so an aborted
        // download never masquerades as a cached artifact.
        let part = dest.with_extension("part");
        let mut file = File::create(&part).await?;
        let mut downloaded: u64 = 0;
        let mut response = response;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            reporter.downloading(&spec.name, downloaded, total);
        }
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&part, &dest).await?;

        tracing::info!(artifact = %dest.display(), bytes = downloaded, "downloaded artifact");
        Ok(dest)
    }
}

/// `<name>==<version>` when pinned, else the bare name.
fn registry_ref(spec: &PackageSpec) -> String {
    match &spec.version {
        Some(version) => format!("{}=={version}", spec.name),
        None => spec.name.to_string(),
    }
}

/// `git+<url>[@<ref>]#egg=<name>`.
fn vcs_ref(spec: &PackageSpec, url: &str, branch: Option<&str>) -> String {
    let mut reference = format!("git+{url}");
    if let Some(branch) = branch {
        reference.push('@');
        reference.push_str(branch);
    }
    reference.push_str("#egg=");
    reference.push_str(&spec.name);
    reference
}

/// Derive a filename from the URL's path component, ignoring any query or
/// fragment. Returns `None` when the path has no usable final segment.
fn filename_from_url_component(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = filename_from_url(path);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Parse the filename out of a `Content-Disposition` header, keeping only the
/// final path component so a hostile header cannot escape the cache.
fn content_disposition_filename(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let value = headers
        .get(reqwest::header::CONTENT_DISPOSITION)?
        .to_str()
        .ok()?;
    let raw = value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?
        .trim_matches('"')
        .trim();
    let name = Path::new(raw).file_name()?.to_str()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
