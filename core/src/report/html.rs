//! Single-file HTML report: one card per target.
//!
//! Every string that came from the scanner or the user passes through
//! [`escape`] before it is interpolated.

use std::fmt::Write;

use nscope_common::network::host::Host;
use nscope_common::network::port::Port;
use nscope_common::scan::ScanResult;

use super::RenderContext;

/// Characters of stderr shown per target.
const STDERR_EXCERPT_CHARS: usize = 2_000;

pub fn render(results: &[ScanResult], ctx: &RenderContext) -> String {
    let title = escape(&ctx.title);
    let mut html = String::new();

    html.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\"/>\n");
    html.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/>\n");
    let _ = writeln!(html, "  <title>{title}</title>");
    let _ = writeln!(html, "  <style>\n{}\n  </style>", ctx.theme.stylesheet());
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>{title}</h1>");
    let _ = writeln!(
        html,
        "<p class=\"meta\">Generated: {} - {} target(s)</p>",
        ctx.generated_at.to_rfc3339(),
        results.len()
    );

    for result in results {
        target_card(&mut html, result);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn target_card(html: &mut String, result: &ScanResult) {
    let _ = writeln!(html, "<div class=\"card\"><h2>{}</h2>", escape(&result.target));
    let exit = result
        .exit_status
        .map(|code| code.to_string())
        .unwrap_or_else(|| "none".to_string());
    let _ = writeln!(
        html,
        "<p class=\"meta\">Cmd: <code>{}</code><br/>Exit status: {}, xml: {}</p>",
        escape(&result.command),
        exit,
        escape(&result.artifact_path.to_string_lossy())
    );

    if !result.warnings.is_empty() {
        html.push_str("<ul class=\"warnings\">\n");
        for warning in &result.warnings {
            let _ = writeln!(html, "<li>{}</li>", escape(&warning.to_string()));
        }
        html.push_str("</ul>\n");
    }

    if !result.stderr.trim().is_empty() {
        let _ = writeln!(
            html,
            "<details><summary>stderr</summary><pre>{}</pre></details>",
            escape(&excerpt(&result.stderr, STDERR_EXCERPT_CHARS))
        );
    }

    if result.hosts.is_empty() {
        html.push_str("<p>No hosts found in XML output.</p>\n");
    }
    for host in &result.hosts {
        host_section(html, host);
    }

    html.push_str("</div>\n");
}

fn host_section(html: &mut String, host: &Host) {
    if !host.addresses.is_empty() {
        let addrs = join_escaped(host.addresses.iter().map(|a| match &a.vendor {
            Some(vendor) => format!("{} ({vendor})", a.addr),
            None => a.addr.clone(),
        }));
        let _ = writeln!(html, "<p><strong>Addresses:</strong> {addrs}</p>");
    }
    if !host.hostnames.is_empty() {
        let names = join_escaped(host.hostnames.iter().map(|h| h.name.clone()));
        let _ = writeln!(html, "<p><strong>Hostnames:</strong> {names}</p>");
    }
    let _ = writeln!(html, "<p><strong>Status:</strong> {}</p>", host.status);

    if !host.ports.is_empty() {
        html.push_str(
            "<table><thead><tr><th>Port</th><th>Proto</th><th>State</th><th>Service</th><th>Notes</th></tr></thead><tbody>\n",
        );
        for port in &host.ports {
            port_row(html, port);
        }
        html.push_str("</tbody></table>\n");
    }

    if !host.os_matches.is_empty() {
        let matches = join_escaped(host.os_matches.iter().map(|m| match m.accuracy {
            Some(accuracy) => format!("{} ({accuracy}%)", m.name),
            None => m.name.clone(),
        }));
        let _ = writeln!(html, "<p><strong>OS matches:</strong> {matches}</p>");
    }

    if !host.scripts.is_empty() {
        html.push_str("<h3>Host script output</h3>\n");
        for script in &host.scripts {
            let _ = writeln!(
                html,
                "<h4>{}</h4><pre>{}</pre>",
                escape(&script.id),
                escape(&script.output)
            );
        }
    }
}

fn port_row(html: &mut String, port: &Port) {
    let class = if port.state.is_open() {
        "state-open"
    } else {
        "state-closed"
    };

    let service = match &port.service {
        Some(service) => {
            let name = service.name.as_deref().unwrap_or_default();
            match service.banner() {
                Some(banner) if !name.is_empty() => format!("{name} ({banner})"),
                Some(banner) => banner,
                None => name.to_string(),
            }
        }
        None => String::new(),
    };

    let notes = port
        .scripts
        .iter()
        .map(|s| escape(&format!("{}: {}", s.id, s.output)))
        .collect::<Vec<_>>()
        .join("; ");

    let _ = writeln!(
        html,
        "<tr><td>{}</td><td>{}</td><td class=\"{class}\">{}</td><td>{}</td><td>{notes}</td></tr>",
        port.port_id,
        escape(&port.protocol),
        escape(port.state.as_str()),
        escape(&service),
    );
}

fn join_escaped(items: impl Iterator<Item = String>) -> String {
    items.map(|item| escape(&item)).collect::<Vec<_>>().join(", ")
}

/// First `max` characters of `text`, marked when cut.
fn excerpt(text: &str, max: usize) -> String {
    let trimmed = text.trim_end();
    match trimmed.char_indices().nth(max) {
        Some((cut, _)) => format!("{}\n[... truncated]", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use chrono::Utc;
    use nscope_common::network::host::{Address, HostStatus};
    use nscope_common::network::port::{PortState, ScriptOutput};
    use nscope_common::scan::ScanWarning;

    fn result(target: &str, hosts: Vec<Host>) -> ScanResult {
        ScanResult {
            target: target.to_string(),
            command: format!("nmap -oX out.xml {target}"),
            exit_status: Some(0),
            stderr: String::new(),
            timestamp: Utc::now(),
            artifact_path: PathBuf::from("out.xml"),
            hosts,
            warnings: Vec::new(),
        }
    }

    fn scenario_host() -> Host {
        Host {
            addresses: vec![Address {
                addr: "10.0.0.1".to_string(),
                addr_type: Some("ipv4".to_string()),
                vendor: None,
            }],
            status: HostStatus::Up,
            ports: vec![
                Port::new("tcp", 21, PortState::Closed),
                Port::new("tcp", 22, PortState::Open).with_service("ssh"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn escape_covers_all_special_characters() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn open_port_gets_open_class() {
        let html = render(&[result("10.0.0.1", vec![scenario_host()])], &RenderContext::new("t"));

        assert!(html.contains(
            "<tr><td>22</td><td>tcp</td><td class=\"state-open\">open</td><td>ssh</td>"
        ));
        assert!(html.contains(
            "<tr><td>21</td><td>tcp</td><td class=\"state-closed\">closed</td><td></td>"
        ));
    }

    #[test]
    fn scanner_text_is_never_injected() {
        let mut host = scenario_host();
        host.ports[1].scripts.push(ScriptOutput {
            id: "http-title".to_string(),
            output: "<script>alert(1)</script>".to_string(),
            extra: BTreeMap::new(),
        });
        host.scripts.push(ScriptOutput {
            id: "banner".to_string(),
            output: "a & b > c".to_string(),
            extra: BTreeMap::new(),
        });
        let mut result = result("<img src=x>", vec![host]);
        result.stderr = "</pre><b>".to_string();

        let html = render(&[result], &RenderContext::new("<title>"));

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("</pre><b>"));
        assert!(!html.contains("a & b"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("<title>&lt;title&gt;</title>"));
    }

    #[test]
    fn hostless_target_and_warnings_are_shown() {
        let mut failed = result("10.0.0.9", Vec::new());
        failed.exit_status = None;
        failed.stderr = "QUITTING!".to_string();
        failed.warnings.push(ScanWarning::Timeout { millis: 2000 });

        let html = render(&[failed], &RenderContext::new("t"));

        assert!(html.contains("No hosts found in XML output."));
        assert!(html.contains("Exit status: none"));
        assert!(html.contains("<li>scanner timed out after 2.0s</li>"));
        assert!(html.contains("<pre>QUITTING!</pre>"));
    }

    #[test]
    fn long_stderr_is_cut_on_char_boundary() {
        let text = "é".repeat(STDERR_EXCERPT_CHARS + 10);
        let cut = excerpt(&text, STDERR_EXCERPT_CHARS);

        assert!(cut.ends_with("[... truncated]"));
        assert_eq!(cut.chars().filter(|c| *c == 'é').count(), STDERR_EXCERPT_CHARS);
    }
}
