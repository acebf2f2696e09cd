//! Package-manager invocation.
//!
//! Materializes a resolved reference into the target environment by running
//! `<python> -u -m pip install --target <site-packages> ...` as a child
//! process. Both output pipes are drained concurrently and forwarded
//! line-by-line to the [`Reporter`] as they are produced: the caller
//! observes partial output long before the process exits, so a
//! compile-from-source package shows liveness instead of appearing hung.
//!
//! A nonzero exit is not an error at this layer: it is returned as an
//! [`InstallResult`] carrying the verbatim exit code and a tail of the
//! captured stderr, because the host renders per-dependency outcomes rather
//! than aborting on the first failure. A failed or cancelled install may
//! leave the target directory partially written; recovery is a subsequent
//! install with `force_reinstall`, not rollback.

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::Reporter;
use crate::resolver::ResolvedRef;
use pybridge_schema::{InstallResult, PackageSpec};

/// Lines of stderr retained for the error message of a failed install.
const STDERR_TAIL_LINES: usize = 40;

#[derive(Error, Debug)]
pub enum InstallError {
    /// The package-manager process could not be spawned or waited on.
    #[error("Failed to run package manager: {0}")]
    Io(#[from] std::io::Error),

    /// The install was cancelled and the child process killed.
    #[error("Install cancelled")]
    Cancelled,
}

/// Request for one install invocation.
///
/// Concurrent installs into one target directory are unsafe; callers
/// serialize invocations per environment (see [`crate::manager`]).
pub struct InstallRequest<'a, R: Reporter> {
    python: &'a Path,
    site_packages: &'a Path,
    reference: &'a ResolvedRef,
    spec: &'a PackageSpec,
    force_reinstall: bool,
    reporter: &'a R,
    cancel: CancellationToken,
}

impl<R: Reporter> std::fmt::Debug for InstallRequest<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallRequest")
            .field("spec", &self.spec.name)
            .field("reference", &self.reference)
            .field("force_reinstall", &self.force_reinstall)
            .finish_non_exhaustive()
    }
}

impl<'a, R: Reporter> InstallRequest<'a, R> {
    pub fn new(
        python: &'a Path,
        site_packages: &'a Path,
        reference: &'a ResolvedRef,
        spec: &'a PackageSpec,
        reporter: &'a R,
    ) -> Self {
        Self {
            python,
            site_packages,
            reference,
            spec,
            force_reinstall: false,
            reporter,
            cancel: CancellationToken::new(),
        }
    }

    /// Force a reinstall even when the package manager considers the
    /// requirement satisfied (the recovery path after a partial failure).
    pub fn with_force_reinstall(mut self, force: bool) -> Self {
        self.force_reinstall = force;
        self
    }

    /// Cancellation point: when the token fires mid-install the child is
    /// killed and [`InstallError::Cancelled`] returned.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn command_args(&self) -> Vec<String> {
        let mut args = vec![
            "-u".to_string(),
            "-m".to_string(),
            "pip".to_string(),
            "install".to_string(),
            "--target".to_string(),
            self.site_packages.to_string_lossy().into_owned(),
            self.reference.as_install_arg().into_owned(),
        ];
        args.extend(self.spec.args.iter().cloned());
        if self.force_reinstall {
            args.push("--force-reinstall".to_string());
        }
        if self.spec.upgrade {
            args.push("--upgrade".to_string());
        }
        if self.spec.no_cache {
            args.push("--no-cache".to_string());
        }
        args
    }

    /// Run the install to completion (or cancellation).
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Io`] if the process cannot be spawned and
    /// [`InstallError::Cancelled`] on cancellation. A nonzero exit code is
    /// returned as an error-state [`InstallResult`], not an `Err`.
    pub async fn execute(self) -> Result<InstallResult, InstallError> {
        let args = self.command_args();
        tracing::debug!(
            python = %self.python.display(),
            args = ?args,
            "invoking package manager"
        );

        let mut child = Command::new(self.python)
            .args(&args)
            .env("PYTHONPATH", self.site_packages)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("child stderr not captured"))?;

        // Merge both pipes into one ordered line stream. Stderr lines also
        // feed the tail buffer that becomes the error message on failure.
        let (tx, mut rx) = mpsc::channel::<(bool, String)>(64);
        let out_task = tokio::spawn(forward_lines(stdout, tx.clone(), false));
        let err_task = tokio::spawn(forward_lines(stderr, tx, true));

        let mut stderr_tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some((from_stderr, line)) => {
                        if from_stderr {
                            if stderr_tail.len() == STDERR_TAIL_LINES {
                                stderr_tail.pop_front();
                            }
                            stderr_tail.push_back(line.clone());
                        }
                        self.reporter.install_output(&self.spec.name, &line);
                    }
                    None => break,
                },
                () = self.cancel.cancelled() => {
                    tracing::info!(spec = %self.spec.name, "install cancelled, killing child");
                    child.start_kill().ok();
                    let _ = child.wait().await;
                    return Err(InstallError::Cancelled);
                }
            }
        }

        let status = child.wait().await?;
        let _ = out_task.await;
        let _ = err_task.await;

        if status.success() {
            tracing::info!(spec = %self.spec.name, "install complete");
            return Ok(InstallResult::installed(self.spec.name.clone()));
        }

        let exit_code = status.code();
        let message = if stderr_tail.is_empty() {
            format!("Package manager exited with {status}; check the streamed log")
        } else {
            Vec::from(stderr_tail).join("\n")
        };
        tracing::warn!(
            spec = %self.spec.name,
            exit_code = ?exit_code,
            "install failed"
        );
        Ok(InstallResult::error(
            self.spec.name.clone(),
            exit_code,
            message,
        ))
    }
}

async fn forward_lines(
    reader: impl AsyncRead + Unpin,
    tx: mpsc::Sender<(bool, String)>,
    from_stderr: bool,
) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send((from_stderr, line)).await.is_err() {
            break;
        }
    }
}
