//! The central **abstraction** for running the external scanner.
//!
//! This module defines the [`Scanner`] capability that concrete strategies implement:
//!
//! * [`nmap::NmapScanner`] spawns the real binary once per target.
//! * [`canned::CannedScanner`] hands back prepared artifacts without any process,
//!   so orchestration and parsing can be exercised where nmap is not installed.
//!
//! **Architectural Note:**
//! The orchestrator depends on this trait only. It never knows whether a process
//! was spawned, which keeps the failure classification ([`ScanError`]) the single
//! contract between both sides.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nscope_common::config::{PortSelector, ScanOptions};
use nscope_common::error::ScanError;
use nscope_common::network::host::Host;
use nscope_common::network::target;
use nscope_common::scan::{ScanResult, ScanWarning};

pub mod canned;
pub mod nmap;

/// The structured document one scanner invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawArtifact {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Everything captured from one scanner invocation, before parsing.
#[derive(Debug, Clone)]
pub struct RawScan {
    pub target: String,
    pub command: String,
    pub exit_status: Option<i32>,
    pub stderr: String,
    pub timestamp: DateTime<Utc>,
    pub artifact: RawArtifact,
    pub warnings: Vec<ScanWarning>,
}

impl RawScan {
    /// Attaches parsed hosts and consumes the raw scan into its final result.
    pub fn into_result(self, hosts: Vec<Host>, parse_warning: Option<ScanWarning>) -> ScanResult {
        let mut warnings = self.warnings;
        warnings.extend(parse_warning);

        ScanResult {
            target: self.target,
            command: self.command,
            exit_status: self.exit_status,
            stderr: self.stderr,
            timestamp: self.timestamp,
            artifact_path: self.artifact.path,
            hosts,
            warnings,
        }
    }
}

/// Runs the external scanner against a single target.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Name of the tool, used in logs and errors.
    fn tool(&self) -> &str;

    /// Checks that the tool can be executed at all.
    ///
    /// Called once before any target is dispatched so that a missing binary
    /// stops the run before a single artifact is written.
    async fn preflight(&self) -> Result<(), ScanError> {
        Ok(())
    }

    /// Scans `target` and returns the captured artifact and process metadata.
    ///
    /// Only [`ScanError::ToolUnavailable`] is fatal to the run. Exit statuses and
    /// missing output are reported through [`RawScan::warnings`] instead.
    async fn scan(&self, target: &str, options: &ScanOptions) -> Result<RawScan, ScanError>;
}

/// nmap returns 1 when the target is down or unreachable. Not an error.
const BENIGN_EXIT_CODES: [i32; 2] = [0, 1];

/// Warning for an exit status outside the tool's success convention.
pub fn classify_exit(code: Option<i32>) -> Option<ScanWarning> {
    match code {
        Some(code) if BENIGN_EXIT_CODES.contains(&code) => None,
        code => Some(ScanWarning::ToolExit { code }),
    }
}

/// Deterministic artifact location for `target` inside `output_dir`.
pub fn artifact_path(output_dir: &Path, target: &str) -> PathBuf {
    output_dir.join(format!("{}.xml", target::sanitize(target)))
}

/// Builds the argument vector for one invocation.
///
/// Order: scan style, port selector, extra flags, XML output, target last.
pub fn build_args(target: &str, options: &ScanOptions, artifact: &Path) -> Vec<String> {
    let mut args: Vec<String> = options.scan_style.clone();

    match &options.ports {
        Some(PortSelector::List(spec)) => {
            args.push("-p".to_string());
            args.push(spec.clone());
        }
        Some(PortSelector::Top(count)) => {
            args.push("--top-ports".to_string());
            args.push(count.to_string());
        }
        None => {}
    }

    args.extend(options.extra_args.iter().cloned());
    args.push("-oX".to_string());
    args.push(artifact.to_string_lossy().into_owned());
    args.push(target.to_string());
    args
}

/// Shell-quoted command line, suitable for copy and paste.
pub fn command_line(binary: &str, args: &[String]) -> String {
    shell_words::join(std::iter::once(binary).chain(args.iter().map(String::as_str)))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
