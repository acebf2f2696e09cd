//! Console output for the CLI: a [`Reporter`] implementation that streams
//! install output as it arrives, plus small formatting helpers.

use pybridge_core::Reporter;
use pybridge_schema::PackageName;

/// Reporter that prints live progress to the terminal.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        if !self.quiet {
            println!("\n{title}");
        }
    }

    fn downloading(&self, name: &PackageName, current: u64, total: Option<u64>) {
        // One line per artifact; the per-chunk calls are silent so a large
        // wheel does not flood the terminal.
        if self.quiet || current != 0 {
            return;
        }
        match total {
            Some(total) => println!("Downloading {name} ({})", format_size(total)),
            None => println!("Downloading {name}"),
        }
    }

    fn install_output(&self, _name: &PackageName, line: &str) {
        if !self.quiet {
            println!("  {line}");
        }
    }

    fn done(&self, name: &PackageName, detail: &str) {
        println!("{name}: {detail}");
    }

    fn failed(&self, name: &PackageName, reason: &str) {
        eprintln!("{name}: FAILED - {reason}");
    }

    fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{msg}");
        }
    }

    fn warning(&self, msg: &str) {
        eprintln!("warning: {msg}");
    }

    fn error(&self, msg: &str) {
        eprintln!("error: {msg}");
    }

    fn summary(&self, installed: usize, failed: usize, elapsed_secs: f64) {
        println!("\n{installed} installed, {failed} failed in {elapsed_secs:.1}s");
    }
}

/// Plain output helper for commands that do not stream install progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn info(&self, msg: &str) {
        println!("{msg}");
    }

    pub fn success(&self, msg: &str) {
        println!("{msg}");
    }

    pub fn warning(&self, msg: &str) {
        eprintln!("warning: {msg}");
    }
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    let bytes_f = bytes as f64;
    if bytes_f >= GIB {
        format!("{:.1} GiB", bytes_f / GIB)
    } else if bytes_f >= MIB {
        format!("{:.1} MiB", bytes_f / MIB)
    } else if bytes_f >= KIB {
        format!("{:.1} KiB", bytes_f / KIB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_picks_sensible_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
