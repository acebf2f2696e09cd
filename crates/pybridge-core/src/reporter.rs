//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and streamed install
//! output without being coupled to a specific host UI implementation.

use pybridge_schema::PackageName;

pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Resolving", "Installing").
    fn section(&self, title: &str);

    /// Updates the progress of an artifact download.
    fn downloading(&self, name: &PackageName, current: u64, total: Option<u64>);

    /// One line of live package-manager output for the named spec.
    ///
    /// Invoked as lines are produced, before the install completes, so a
    /// long-running source build is distinguishable from a hang.
    fn install_output(&self, name: &PackageName, line: &str);

    /// Marks a spec's operation as successfully completed.
    fn done(&self, name: &PackageName, detail: &str);

    /// Marks a spec's operation as failed with a specific reason.
    fn failed(&self, name: &PackageName, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary of a multi-spec install run.
    fn summary(&self, installed: usize, failed: usize, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title)
    }
    fn downloading(&self, name: &PackageName, current: u64, total: Option<u64>) {
        (**self).downloading(name, current, total)
    }
    fn install_output(&self, name: &PackageName, line: &str) {
        (**self).install_output(name, line)
    }
    fn done(&self, name: &PackageName, detail: &str) {
        (**self).done(name, detail)
    }
    fn failed(&self, name: &PackageName, reason: &str) {
        (**self).failed(name, reason)
    }
    fn info(&self, msg: &str) {
        (**self).info(msg)
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg)
    }
    fn error(&self, msg: &str) {
        (**self).error(msg)
    }
    fn summary(&self, installed: usize, failed: usize, elapsed_secs: f64) {
        (**self).summary(installed, failed, elapsed_secs)
    }
}

/// A no-op reporter for silent operations (e.g., status probes, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &PackageName, _: u64, _: Option<u64>) {}
    fn install_output(&self, _: &PackageName, _: &str) {}
    fn done(&self, _: &PackageName, _: &str) {}
    fn failed(&self, _: &PackageName, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: usize, _: f64) {}
}
