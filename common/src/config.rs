use std::path::PathBuf;
use std::time::Duration;

use crate::error::RunError;

pub const DEFAULT_SCAN_TYPE: &str = "-sS -Pn";
pub const DEFAULT_OUTPUT_DIR: &str = "nmap_reports";
pub const DEFAULT_TITLE: &str = "nmap report";
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_BINARY: &str = "nmap";

/// Which ports the external scanner should look at. The two forms are
/// mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelector {
    /// An explicit list or range, passed verbatim (e.g. `22,80,443` or `1-1000`).
    List(String),
    /// The N most common ports.
    Top(u32),
}

/// Options shared by every target of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub scan_style: Vec<String>,
    pub ports: Option<PortSelector>,
    pub extra_args: Vec<String>,
    /// Per-target limit. `None` waits for the scanner indefinitely.
    pub timeout: Option<Duration>,
}

impl ScanOptions {
    /// Builds options from the raw flag strings a user typed.
    ///
    /// Flag strings are split with shell quoting rules so that
    /// `--script "http-title and safe"` stays a single argument.
    pub fn from_flags(
        scan_type: &str,
        extra_args: &str,
        ports: Option<PortSelector>,
        timeout: Option<Duration>,
    ) -> Result<Self, RunError> {
        Ok(Self {
            scan_style: split_flags(scan_type)?,
            ports,
            extra_args: split_flags(extra_args)?,
            timeout,
        })
    }
}

fn split_flags(flags: &str) -> Result<Vec<String>, RunError> {
    shell_words::split(flags)
        .map_err(|e| RunError::Config(format!("cannot split flags '{flags}': {e}")))
}

pub struct Config {
    /// Where artifacts and reports are written.
    pub output_dir: PathBuf,
    /// Requested parallel scans.
    pub workers: usize,
    pub title: String,
    /// Name or path of the external scanner binary.
    pub binary: String,
    pub scan: ScanOptions,
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
