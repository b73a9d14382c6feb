use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;
use tracing::{Instrument, debug};

use nscope_common::config::Config;
use nscope_common::error::RunError;
use nscope_common::scan::ScanResult;
use nscope_core::orchestrator::{self, Orchestrator};
use nscope_core::report::{RenderContext, ReportGenerator, ReportPaths};
use nscope_core::scanner::nmap::NmapScanner;

use super::CommandLine;
use crate::terminal::{colors, print, progress};

type Detail = (String, ColoredString);

pub async fn scan(args: &CommandLine) -> anyhow::Result<()> {
    let cfg: Config = args.to_config()?;
    let targets: Vec<String> = args.load_targets()?;
    if targets.is_empty() {
        return Err(RunError::NoTargets.into());
    }

    create_output_dir(&cfg.output_dir).await?;
    print_settings(&cfg, targets.len(), args.quiet);

    let scanner = Arc::new(NmapScanner::new(cfg.binary.clone(), cfg.output_dir.clone()));
    let span = progress::scan_span(targets.len());
    let orchestrator = Orchestrator::new(scanner, cfg.scan.clone(), cfg.workers)
        .with_progress(progress::tracker(&span));

    let start_time: Instant = Instant::now();
    let mut results: Vec<ScanResult> = orchestrator.run(targets).instrument(span).await?;
    let elapsed: Duration = start_time.elapsed();

    results.sort_by(|a, b| a.target.cmp(&b.target));

    let ctx = RenderContext::new(cfg.title.clone());
    let paths = ReportGenerator::new(&cfg.output_dir)
        .write_all(&results, &ctx)
        .await?;

    scan_ends(&results, &paths, elapsed, args.quiet);
    Ok(())
}

async fn create_output_dir(dir: &Path) -> Result<(), RunError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| RunError::Io {
            context: format!("cannot create output directory {}", dir.display()),
            source,
        })?;
    debug!("Output directory ready: {}", dir.display());
    Ok(())
}

fn print_settings(cfg: &Config, target_count: usize, quiet: bool) {
    if quiet {
        return;
    }
    print::header("starting scanner", quiet);
    print::set_key_width(["Targets", "Workers", "Scanner", "Output"]);
    print::aligned_line("Targets", target_count.to_string());
    print::aligned_line("Workers", orchestrator::effective_workers(cfg.workers, target_count).to_string());
    print::aligned_line("Scanner", cfg.binary.clone());
    print::aligned_line("Output", cfg.output_dir.display().to_string());
}

fn scan_ends(results: &[ScanResult], paths: &ReportPaths, total_time: Duration, quiet: bool) {
    if !quiet {
        print::header("scan results", quiet);
        for (idx, result) in results.iter().enumerate() {
            print_result_tree(result, idx);
        }

        print::header("reports", quiet);
        print::set_key_width(["JSON", "HTML", "Markdown"]);
        print::aligned_line("JSON", paths.json.display().to_string());
        print::aligned_line("HTML", paths.html.display().to_string());
        print::aligned_line("Markdown", paths.markdown.display().to_string());
    }

    print_summary(results, total_time);
}

fn print_result_tree(result: &ScanResult, idx: usize) {
    print::tree_head(idx, &result.target);
    let mut details: Vec<Detail> = Vec::new();

    for host in &result.hosts {
        let name = host.primary_address().unwrap_or("unknown");
        details.push(("Host".to_string(), format!("{name} ({})", host.status).normal()));

        for port in host.open_ports() {
            let service = port.service_name().unwrap_or("unknown");
            let value = format!(
                "{} {}",
                format!("{}/{}", port.port_id, port.protocol).color(colors::OPEN_PORT),
                service.color(colors::SERVICE)
            );
            details.push(("Open".to_string(), value.normal()));
        }
    }

    if result.hosts.is_empty() {
        details.push(("Host".to_string(), "none found".dimmed()));
    }

    for warning in &result.warnings {
        details.push(("Warning".to_string(), warning.to_string().color(colors::WARNING)));
    }

    print::as_tree_one_level(details);
}

fn print_summary(results: &[ScanResult], total_time: Duration) {
    let hosts_up: usize = results.iter().map(ScanResult::hosts_up).sum();
    let open_ports: usize = results.iter().map(|r| r.open_ports().count()).sum();
    let warnings: usize = results.iter().map(|r| r.warnings.len()).sum();

    let targets: ColoredString = format!("{} targets", results.len()).bold().green();
    let hosts: ColoredString = format!("{hosts_up} up").bold().green();
    let ports: ColoredString = format!("{open_ports} open ports").bold().green();
    let warnings: ColoredString = match warnings {
        0 => "no warnings".normal(),
        n => format!("{n} warnings").bold().yellow(),
    };
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();

    print::fat_separator();
    print::centerln(&format!(
        "{}",
        format!("{targets}, {hosts}, {ports}, {warnings} in {total_time}").color(colors::TEXT_DEFAULT)
    ));
}
