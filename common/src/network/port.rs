use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Port state as reported by the scanner.
///
/// nmap uses a handful of well known values; anything else is carried through
/// in [`PortState::Other`] so the model never loses what the tool said.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PortState {
    Open,
    Closed,
    Filtered,
    OpenFiltered,
    ClosedFiltered,
    Unfiltered,
    #[default]
    Unknown,
    Other(String),
}

impl PortState {
    pub fn as_str(&self) -> &str {
        match self {
            PortState::Open => "open",
            PortState::Closed => "closed",
            PortState::Filtered => "filtered",
            PortState::OpenFiltered => "open|filtered",
            PortState::ClosedFiltered => "closed|filtered",
            PortState::Unfiltered => "unfiltered",
            PortState::Unknown => "unknown",
            PortState::Other(state) => state,
        }
    }

    pub fn is_open(&self) -> bool {
        *self == PortState::Open
    }
}

impl From<&str> for PortState {
    fn from(state: &str) -> Self {
        match state {
            "open" => PortState::Open,
            "closed" => PortState::Closed,
            "filtered" => PortState::Filtered,
            "open|filtered" => PortState::OpenFiltered,
            "closed|filtered" => PortState::ClosedFiltered,
            "unfiltered" => PortState::Unfiltered,
            "" | "unknown" => PortState::Unknown,
            other => PortState::Other(other.to_string()),
        }
    }
}

impl From<String> for PortState {
    fn from(state: String) -> Self {
        PortState::from(state.as_str())
    }
}

impl From<PortState> for String {
    fn from(state: PortState) -> Self {
        match state {
            PortState::Other(state) => state,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service fingerprint attached to a port.
///
/// The attributes nmap emits depend on the scan mode (`-sV` adds `product`,
/// `version`, `extrainfo`, `ostype`, `method`, `conf`, ...). The commonly used
/// ones get their own fields and every other attribute lands in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Service {
    pub name: Option<String>,
    pub product: Option<String>,
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Service {
    /// `product version` when either is known.
    pub fn banner(&self) -> Option<String> {
        match (self.product.as_deref(), self.version.as_deref()) {
            (Some(product), Some(version)) => Some(format!("{product} {version}")),
            (Some(product), None) => Some(product.to_string()),
            (None, Some(version)) => Some(version.to_string()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScriptOutput {
    pub id: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub protocol: String,
    pub port_id: u16,
    pub state: PortState,
    pub reason: Option<String>,
    pub service: Option<Service>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<ScriptOutput>,
}

impl Port {
    pub fn new(protocol: impl Into<String>, port_id: u16, state: PortState) -> Self {
        Self {
            protocol: protocol.into(),
            port_id,
            state,
            reason: None,
            service: None,
            scripts: Vec::new(),
        }
    }

    pub fn with_service(mut self, name: impl Into<String>) -> Self {
        self.service = Some(Service {
            name: Some(name.into()),
            ..Default::default()
        });
        self
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service.as_ref().and_then(|s| s.name.as_deref())
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
