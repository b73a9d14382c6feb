//! # Host Model
//!
//! One network endpoint as reported by the external scanner, together with the
//! addresses, names, ports and script output attributed to it.

use serde::{Deserialize, Serialize};

use crate::network::port::{Port, PortState, ScriptOutput};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub addr: String,
    /// `ipv4`, `ipv6` or `mac` for nmap, kept as reported.
    pub addr_type: Option<String>,
    /// Hardware vendor, only present on MAC addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hostname {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

impl HostStatus {
    pub fn from_state(state: &str) -> Self {
        match state {
            "up" => HostStatus::Up,
            "down" => HostStatus::Down,
            _ => HostStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostStatus::Up => "up",
            HostStatus::Down => "down",
            HostStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for HostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsMatch {
    pub name: String,
    pub accuracy: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Host {
    pub addresses: Vec<Address>,
    pub hostnames: Vec<Hostname>,
    pub status: HostStatus,
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub os_matches: Vec<OsMatch>,
    /// Script output attributed to the host rather than to a single port.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<ScriptOutput>,
}

impl Host {
    /// First IP address, falling back to whatever address came first.
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| matches!(a.addr_type.as_deref(), Some("ipv4") | Some("ipv6")))
            .or_else(|| self.addresses.first())
            .map(|a| a.addr.as_str())
    }

    pub fn open_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.state == PortState::Open)
    }

    pub fn is_up(&self) -> bool {
        self.status == HostStatus::Up
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
