//! # nmap XML parser
//!
//! Reads an artifact into a small element tree with `quick-xml`, then walks the
//! tree into the [`Host`] model. Every block nmap may emit (`ports`, `os`,
//! `hostscript`, per-port `service` and `script`) is optional: what is missing
//! in the document is missing in the model.
//!
//! The walk only uses ordered collections, so the same bytes always produce the
//! same hosts.

use std::collections::{BTreeMap, HashSet};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use tracing::{debug, warn};

use nscope_common::network::host::{Address, Host, HostStatus, Hostname, OsMatch};
use nscope_common::network::port::{Port, PortState, ScriptOutput, Service};
use nscope_common::scan::ScanWarning;

use crate::scanner::RawArtifact;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("artifact contains no XML document")]
    Empty,
    #[error("malformed XML: {0}")]
    Malformed(String),
    #[error("document ended inside <{0}>")]
    Truncated(String),
}

/// Parses an artifact, logging and swallowing any failure.
///
/// An unparsable artifact yields no hosts plus the warning to attach to the
/// target's result.
pub fn parse_hosts(artifact: &RawArtifact) -> (Vec<Host>, Option<ScanWarning>) {
    match parse_artifact(&artifact.bytes) {
        Ok(hosts) => {
            debug!("Parsed {} host(s) from {}", hosts.len(), artifact.path.display());
            (hosts, None)
        }
        Err(e) => {
            warn!("Failed to parse XML at {}: {e}", artifact.path.display());
            let warning = ScanWarning::ArtifactParse {
                message: e.to_string(),
            };
            (Vec::new(), Some(warning))
        }
    }
}

/// Parses raw artifact bytes into hosts.
pub fn parse_artifact(bytes: &[u8]) -> Result<Vec<Host>, ParseError> {
    let root = read_tree(bytes)?;
    Ok(root.children("host").map(host_from).collect())
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: BTreeMap<String, String>,
    children: Vec<Element>,
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    fn attr_owned(&self, key: &str) -> Option<String> {
        self.attrs.get(key).cloned()
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All attributes except `known`, for the open `extra` maps.
    fn remaining_attrs(&self, known: &[&str]) -> BTreeMap<String, String> {
        self.attrs
            .iter()
            .filter(|(key, _)| !known.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

fn read_tree(bytes: &[u8]) -> Result<Element, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf: Vec<u8> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            ParseError::Malformed(format!("{e} (at byte {})", reader.buffer_position()))
        })?;

        match event {
            Event::Start(start) => stack.push(element_from(&start)?),
            Event::Empty(start) => {
                let element = element_from(&start)?;
                attach(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::Malformed("unexpected closing tag".to_string()))?;
                attach(element, &mut stack, &mut root)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Truncated(open.name.clone()));
    }
    root.ok_or(ParseError::Empty)
}

fn attach(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(ParseError::Malformed(format!(
            "second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

fn element_from(start: &BytesStart) -> Result<Element, ParseError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = BTreeMap::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::Malformed(format!("in <{name}>: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::Malformed(format!("in <{name} {key}>: {e}")))?
            .into_owned();
        attrs.insert(key, value);
    }

    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn host_from(element: &Element) -> Host {
    let addresses = element
        .children("address")
        .filter_map(|a| {
            Some(Address {
                addr: a.attr_owned("addr")?,
                addr_type: a.attr_owned("addrtype"),
                vendor: a.attr_owned("vendor"),
            })
        })
        .collect();

    let hostnames = element
        .child("hostnames")
        .into_iter()
        .flat_map(|h| h.children("hostname"))
        .filter_map(|h| {
            Some(Hostname {
                name: h.attr_owned("name")?,
                kind: h.attr_owned("type"),
            })
        })
        .collect();

    let status = element
        .child("status")
        .and_then(|s| s.attr("state"))
        .map(HostStatus::from_state)
        .unwrap_or_default();

    let ports = element.child("ports").map(ports_from).unwrap_or_default();

    let os_matches = element
        .child("os")
        .into_iter()
        .flat_map(|os| os.children("osmatch"))
        .filter_map(|m| {
            Some(OsMatch {
                name: m.attr_owned("name")?,
                accuracy: m.attr("accuracy").and_then(|a| a.parse().ok()),
            })
        })
        .collect();

    let scripts = element
        .children("hostscript")
        .flat_map(|hs| hs.children("script"))
        .map(script_from)
        .collect();

    Host {
        addresses,
        hostnames,
        status,
        ports,
        os_matches,
        scripts,
    }
}

fn ports_from(element: &Element) -> Vec<Port> {
    let mut seen: HashSet<(String, u16)> = HashSet::new();
    let mut ports: Vec<Port> = Vec::new();

    for port_el in element.children("port") {
        let Some(port) = port_from(port_el) else {
            debug!("Skipping port element without a valid portid: {:?}", port_el.attrs);
            continue;
        };
        if !seen.insert((port.protocol.clone(), port.port_id)) {
            debug!("Dropping duplicate {}/{}", port.port_id, port.protocol);
            continue;
        }
        ports.push(port);
    }
    ports
}

fn port_from(element: &Element) -> Option<Port> {
    let port_id: u16 = element.attr("portid")?.trim().parse().ok()?;
    let protocol = element.attr("protocol").unwrap_or("unknown").to_string();

    let state_el = element.child("state");
    let state = state_el
        .and_then(|s| s.attr("state"))
        .map(PortState::from)
        .unwrap_or_default();
    let reason = state_el.and_then(|s| s.attr_owned("reason"));

    let service = element.child("service").map(|s| Service {
        name: s.attr_owned("name"),
        product: s.attr_owned("product"),
        version: s.attr_owned("version"),
        extra: s.remaining_attrs(&["name", "product", "version"]),
    });

    let scripts = element.children("script").map(script_from).collect();

    Some(Port {
        protocol,
        port_id,
        state,
        reason,
        service,
        scripts,
    })
}

fn script_from(element: &Element) -> ScriptOutput {
    ScriptOutput {
        id: element.attr_owned("id").unwrap_or_default(),
        output: element.attr_owned("output").unwrap_or_default(),
        extra: element.remaining_attrs(&["id", "output"]),
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
