//! # Scan Results
//!
//! [`ScanResult`] is the unit of work that leaves the orchestrator: one per
//! requested target, whatever happened while scanning it.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::network::host::Host;
use crate::network::port::Port;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub target: String,
    /// Command line that produced the artifact, kept for audit.
    pub command: String,
    /// `None` when the process was killed (timeout or signal).
    pub exit_status: Option<i32>,
    pub stderr: String,
    pub timestamp: DateTime<Utc>,
    pub artifact_path: PathBuf,
    pub hosts: Vec<Host>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

impl ScanResult {
    pub fn open_ports(&self) -> impl Iterator<Item = (&Host, &Port)> {
        self.hosts
            .iter()
            .flat_map(|host| host.open_ports().map(move |port| (host, port)))
    }

    pub fn hosts_up(&self) -> usize {
        self.hosts.iter().filter(|host| host.is_up()).count()
    }
}

/// A non-fatal problem that reduced the fidelity of one target's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanWarning {
    /// The tool exited with a status other than 0 or 1, or was killed by a signal.
    ToolExit { code: Option<i32> },
    /// The tool did not finish within the configured timeout and was killed.
    Timeout { millis: u64 },
    /// The artifact could not be read or written.
    ArtifactIo { message: String },
    /// The artifact was empty, truncated or not well-formed XML.
    ArtifactParse { message: String },
    /// The scanner could not run to completion for this target.
    Execution { message: String },
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanWarning::ToolExit { code: Some(code) } => {
                write!(f, "scanner exited with status {code}")
            }
            ScanWarning::ToolExit { code: None } => write!(f, "scanner was terminated by a signal"),
            ScanWarning::Timeout { millis } => {
                write!(f, "scanner timed out after {:.1}s", *millis as f64 / 1000.0)
            }
            ScanWarning::ArtifactIo { message } => write!(f, "artifact unavailable: {message}"),
            ScanWarning::ArtifactParse { message } => write!(f, "artifact not parsable: {message}"),
            ScanWarning::Execution { message } => write!(f, "scan failed: {message}"),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::host::HostStatus;
    use crate::network::port::PortState;

    fn sample() -> ScanResult {
        let host = Host {
            status: HostStatus::Up,
            ports: vec![
                Port::new("tcp", 21, PortState::Closed),
                Port::new("tcp", 22, PortState::Open).with_service("ssh"),
            ],
            ..Default::default()
        };
        ScanResult {
            target: "10.0.0.1".to_string(),
            command: "nmap -sS -oX out/10.0.0.1.xml 10.0.0.1".to_string(),
            exit_status: Some(0),
            stderr: String::new(),
            timestamp: Utc::now(),
            artifact_path: PathBuf::from("out/10.0.0.1.xml"),
            hosts: vec![host],
            warnings: vec![ScanWarning::Timeout { millis: 1500 }],
        }
    }

    #[test]
    fn open_ports_yields_only_open() {
        let result = sample();
        let open: Vec<u16> = result.open_ports().map(|(_, p)| p.port_id).collect();
        assert_eq!(open, vec![22]);
        assert_eq!(result.hosts_up(), 1);
    }

    #[test]
    fn warnings_are_tagged_in_json() {
        let json = serde_json::to_string(&ScanWarning::ToolExit { code: Some(255) }).unwrap();
        assert_eq!(json, r#"{"kind":"tool_exit","code":255}"#);
    }

    #[test]
    fn result_survives_json() {
        let result = sample();
        let json = serde_json::to_string(&result).unwrap();
        let back: ScanResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn warning_display() {
        assert_eq!(
            ScanWarning::Timeout { millis: 1500 }.to_string(),
            "scanner timed out after 1.5s"
        );
        assert_eq!(
            ScanWarning::ToolExit { code: None }.to_string(),
            "scanner was terminated by a signal"
        );
    }
}
