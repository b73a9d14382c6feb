//! Condensed Markdown summary. Only ports in state `open` are listed.

use std::fmt::Write;

use nscope_common::scan::ScanResult;

use super::RenderContext;

pub fn render(results: &[ScanResult], ctx: &RenderContext) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# {}\n", ctx.title);
    let _ = writeln!(md, "Generated: {}\n", ctx.generated_at.to_rfc3339());

    for result in results {
        let _ = writeln!(md, "## {}", result.target);
        let _ = writeln!(md, "- Command: {}", inline_code(&result.command));

        if !result.warnings.is_empty() {
            let warnings: Vec<String> = result.warnings.iter().map(|w| w.to_string()).collect();
            let _ = writeln!(md, "- Warnings: {}", warnings.join("; "));
        }

        if result.hosts.is_empty() {
            md.push_str("- No hosts found\n");
        }

        for host in &result.hosts {
            let addrs: Vec<&str> = host.addresses.iter().map(|a| a.addr.as_str()).collect();
            let _ = writeln!(md, "- Addresses: {}", addrs.join(", "));
            let _ = writeln!(md, "  - Status: {}", host.status);

            let mut open = host.open_ports().peekable();
            if open.peek().is_some() {
                md.push_str("  - Open ports:\n");
            }
            for port in open {
                match port.service_name() {
                    Some(name) => {
                        let _ = writeln!(md, "    - {}/{} — {name}", port.port_id, port.protocol);
                    }
                    None => {
                        let _ = writeln!(md, "    - {}/{}", port.port_id, port.protocol);
                    }
                }
            }
        }
        md.push('\n');
    }
    md
}

/// Wraps `text` in a code span whose fence is longer than any backtick run
/// inside it.
fn inline_code(text: &str) -> String {
    let longest_run = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run + 1);

    if longest_run > 0 {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}
