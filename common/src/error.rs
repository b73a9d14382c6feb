//! # Error Taxonomy
//!
//! Two layers of failure exist in a run:
//!
//! * [`RunError`]: fatal. The run stops and the binary exits with
//!   [`RunError::exit_code`].
//! * [`ScanError`]: raised by a scanner for a single target. Only
//!   [`ScanError::ToolUnavailable`] escalates to a [`RunError`]; everything else
//!   is folded into that target's result as a
//!   [`ScanWarning`](crate::scan::ScanWarning).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("no targets supplied")]
    NoTargets,

    #[error("external tool `{tool}` could not be executed: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write report {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::NoTargets => 1,
            RunError::ToolUnavailable { .. } => 2,
            RunError::ReportWrite { .. } => 3,
            RunError::Config(_) | RunError::Io { .. } => 4,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("external tool `{tool}` could not be executed: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("scan of {target} failed: {source}")]
    Io {
        target: String,
        #[source]
        source: io::Error,
    },
}

impl From<ScanError> for RunError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::ToolUnavailable { tool, source } => RunError::ToolUnavailable { tool, source },
            ScanError::Io { target, source } => RunError::Io {
                context: format!("scan of {target} failed"),
                source,
            },
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
