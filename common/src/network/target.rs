//! # Scan Targets
//!
//! Targets are opaque to nscope: anything the external scanner accepts
//! (a host name, an address, a CIDR block, an nmap range expression) is passed
//! through untouched. This module only collects them and derives the
//! filesystem-safe name used for per-target artifacts.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::RunError;

/// Parses a comma-separated list of targets (e.g., "10.0.0.1, scanme.example,10.0.1.0/24").
pub fn parse_commas(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads one target per line. Blank lines and `#` comments are skipped.
pub fn load_from_file(path: &Path) -> Result<Vec<String>, RunError> {
    let content = fs::read_to_string(path).map_err(|source| RunError::Io {
        context: format!("failed to read targets file {}", path.display()),
        source,
    })?;

    let targets = parse_lines(&content);
    debug!("Loaded {} target(s) from {}", targets.len(), path.display());
    Ok(targets)
}

fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Drops repeated targets, keeping the first occurrence in place.
pub fn dedup(targets: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    targets
        .into_iter()
        .filter(|target| seen.insert(target.clone()))
        .collect()
}

/// Maps a target to a name that is safe to use as a file stem.
///
/// Everything outside `[A-Za-z0-9._-]` becomes `_`, so `10.0.0.0/24` turns into
/// `10.0.0.0_24` and `fe80::1` into `fe80__1`.
pub fn sanitize(target: &str) -> String {
    let safe: String = target
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();

    if safe.is_empty() { String::from("_") } else { safe }
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
    use std::io::Write;

    #[test]
    fn parse_commas_trims_and_skips_empty() {
        let targets = parse_commas(" 192.168.1.1, scanme.example ,,10.0.0.0/24,");
        assert_eq!(targets, vec!["192.168.1.1", "scanme.example", "10.0.0.0/24"]);
    }

    #[test]
    fn parse_lines_skips_comments() {
        let content = "# lab hosts\n10.0.0.1\n\n   \n  10.0.0.2  \n#10.0.0.3\n";
        assert_eq!(parse_lines(content), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn load_from_file_reads_targets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10.0.0.1\n# skip\nscanme.example").unwrap();

        let targets = load_from_file(file.path()).unwrap();
        assert_eq!(targets, vec!["10.0.0.1", "scanme.example"]);
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let result = load_from_file(Path::new("/nonexistent/nscope/targets.txt"));
        assert!(matches!(result, Err(RunError::Io { .. })));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let targets = vec!["b", "a", "b", "c", "a"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(dedup(targets), vec!["b", "a", "c"]);
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize("10.0.0.0/24"), "10.0.0.0_24");
        assert_eq!(sanitize("fe80::1"), "fe80__1");
        assert_eq!(sanitize("scanme.example"), "scanme.example");
        assert_eq!(sanitize("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize(""), "_");
    }
}
