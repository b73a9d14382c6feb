use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use nscope_common::config::ScanOptions;
use nscope_common::error::RunError;
use nscope_common::network::port::PortState;
use nscope_common::network::target;
use nscope_common::scan::{ScanResult, ScanWarning};
use nscope_core::orchestrator::Orchestrator;
use nscope_core::report::{RenderContext, ReportGenerator, ReportPaths, json};
use nscope_core::scanner::canned::CannedScanner;
use nscope_core::scanner::nmap::NmapScanner;

use super::fixtures::{SSH_HOST, TRUNCATED, WEB_HOST};

async fn run_and_report(
    scanner: CannedScanner,
    targets: Vec<String>,
    workers: usize,
    dir: &Path,
) -> anyhow::Result<(Vec<ScanResult>, ReportPaths)> {
    let results = Orchestrator::new(Arc::new(scanner), ScanOptions::default(), workers)
        .run(targets)
        .await?;
    let paths = ReportGenerator::new(dir)
        .write_all(&results, &RenderContext::new("integration"))
        .await?;
    Ok((results, paths))
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

/// One target with a closed and an open port, four workers requested.
#[tokio::test]
async fn single_target_reaches_all_three_reports() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let scanner = CannedScanner::new().with_artifact("10.0.0.1", SSH_HOST);

    let (results, paths) =
        run_and_report(scanner, vec!["10.0.0.1".to_string()], 4, dir.path()).await?;
    assert_eq!(results.len(), 1);

    let dumped = json::parse(&read(&paths.json))?;
    assert_eq!(dumped, results);
    let host = &dumped[0].hosts[0];
    let ports: Vec<(u16, PortState)> = host.ports.iter().map(|p| (p.port_id, p.state.clone())).collect();
    assert_eq!(ports, vec![(21, PortState::Closed), (22, PortState::Open)]);
    assert_eq!(host.ports[1].service_name(), Some("ssh"));

    let html = read(&paths.html);
    assert!(html.contains(r#"<td>22</td><td>tcp</td><td class="state-open">open</td>"#));
    assert!(html.contains(r#"<td>21</td><td>tcp</td><td class="state-closed">closed</td>"#));

    let md = read(&paths.markdown);
    assert!(md.contains("    - 22/tcp — ssh\n"));
    assert!(!md.contains("21/tcp"));
    Ok(())
}

#[tokio::test]
async fn missing_binary_writes_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let scanner = NmapScanner::new("/nonexistent/nscope/nmap", dir.path());

    let err = Orchestrator::new(Arc::new(scanner), ScanOptions::default(), 4)
        .run(vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()])
        .await
        .expect_err("run must fail without a scanner binary");

    assert!(matches!(err, RunError::ToolUnavailable { .. }));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn one_malformed_artifact_out_of_three() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let scanner = CannedScanner::new()
        .with_artifact("10.0.0.1", SSH_HOST)
        .with_artifact("10.0.0.2", TRUNCATED)
        .with_exit_code("10.0.0.2", 2)
        .with_stderr("10.0.0.2", "Failed to open device eth7")
        .with_artifact("10.0.0.3", WEB_HOST);
    let targets: Vec<String> = ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
        .iter()
        .map(|t| t.to_string())
        .collect();

    let (results, paths) = run_and_report(scanner, targets, 2, dir.path()).await?;

    let dumped = json::parse(&read(&paths.json))?;
    assert_eq!(dumped.len(), 3);
    for result in &dumped {
        match result.target.as_str() {
            "10.0.0.2" => {
                assert!(result.hosts.is_empty());
                assert_eq!(result.exit_status, Some(2));
                assert_eq!(result.stderr, "Failed to open device eth7");
                assert!(
                    result
                        .warnings
                        .iter()
                        .any(|w| matches!(w, ScanWarning::ArtifactParse { .. }))
                );
            }
            _ => assert_eq!(result.hosts.len(), 1, "{} lost its host", result.target),
        }
    }
    assert_eq!(
        dumped.iter().map(|r| r.target.clone()).collect::<BTreeSet<_>>(),
        results.iter().map(|r| r.target.clone()).collect::<BTreeSet<_>>()
    );

    let html = read(&paths.html);
    assert!(html.contains("<h2>10.0.0.2</h2>"));
    assert!(html.contains("Exit status: 2"));
    assert!(html.contains("Failed to open device eth7"));
    assert!(html.contains("No hosts found in XML output."));
    assert!(!html.contains("<script>"));

    let md = read(&paths.markdown);
    let section = md
        .split("## ")
        .find(|s| s.starts_with("10.0.0.2\n"))
        .expect("markdown section for the malformed target");
    assert!(section.contains("- No hosts found"));
    assert!(md.contains("    - 80/tcp — http\n"));
    Ok(())
}

#[tokio::test]
async fn targets_file_feeds_one_result_per_unique_target() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("targets.txt");
    std::fs::write(
        &file,
        "# lab\n10.0.0.1\n\n  10.0.0.3  \n10.0.0.1\n10.0.0.0/30\n",
    )?;

    let targets = target::dedup(target::load_from_file(&file)?);
    assert_eq!(targets, vec!["10.0.0.1", "10.0.0.3", "10.0.0.0/30"]);

    let scanner = CannedScanner::new().with_fallback(SSH_HOST);
    let results = Orchestrator::new(Arc::new(scanner.clone()), ScanOptions::default(), 8)
        .run(targets.clone())
        .await?;

    assert_eq!(scanner.calls(), 3);
    assert_eq!(
        results.iter().map(|r| r.target.clone()).collect::<BTreeSet<_>>(),
        targets.into_iter().collect::<BTreeSet<_>>()
    );
    let subnet = results
        .iter()
        .find(|r| r.target == "10.0.0.0/30")
        .expect("result for the subnet target");
    assert!(subnet.artifact_path.ends_with("10.0.0.0_30.xml"));
    Ok(())
}
