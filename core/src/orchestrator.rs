//! # Scan Orchestration
//!
//! Fans a target list out to a bounded pool of workers. Each worker takes one
//! target off the shared queue, scans it, parses the artifact, and hands the
//! finished [`ScanResult`] to the collector before taking the next one.
//!
//! Per-target problems stay inside that target's result. Only a scanner that
//! cannot be executed at all stops the run.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use nscope_common::config::ScanOptions;
use nscope_common::error::{RunError, ScanError};
use nscope_common::network::target;
use nscope_common::scan::{ScanResult, ScanWarning};

use crate::parser;
use crate::scanner::Scanner;

/// Called by the collector with `(completed, total)` after every result.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

type TargetQueue = Arc<Mutex<VecDeque<String>>>;

pub struct Orchestrator {
    scanner: Arc<dyn Scanner>,
    options: Arc<ScanOptions>,
    workers: usize,
    progress: Option<ProgressFn>,
}

impl Orchestrator {
    pub fn new(scanner: Arc<dyn Scanner>, options: ScanOptions, workers: usize) -> Self {
        Self {
            scanner,
            options: Arc::new(options),
            workers,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Scans every target and returns one result per unique target, in
    /// completion order.
    ///
    /// Repeated targets are scanned once, since they would share an artifact
    /// file.
    pub async fn run(&self, targets: Vec<String>) -> Result<Vec<ScanResult>, RunError> {
        if targets.is_empty() {
            return Err(RunError::NoTargets);
        }

        let requested = targets.len();
        let targets = target::dedup(targets);
        if targets.len() < requested {
            debug!("Dropped {} repeated target(s)", requested - targets.len());
        }

        self.scanner.preflight().await?;

        let total = targets.len();
        let workers = effective_workers(self.workers, total);
        info!(
            "Scanning {total} target(s) with {workers} worker(s) using {}",
            self.scanner.tool()
        );

        let queue: TargetQueue = Arc::new(Mutex::new(targets.iter().cloned().collect()));
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel::<ScanResult>();

        let mut set: JoinSet<Result<(), ScanError>> = JoinSet::new();
        for id in 0..workers {
            set.spawn(worker(
                id,
                Arc::clone(&self.scanner),
                Arc::clone(&self.options),
                Arc::clone(&queue),
                Arc::clone(&stop),
                tx.clone(),
            ));
        }
        drop(tx);

        let mut results: Vec<ScanResult> = Vec::with_capacity(total);

        loop {
            tokio::select! {
                Some(result) = rx.recv() => {
                    results.push(result);
                    self.report_progress(results.len(), total);
                }
                joined = set.join_next() => match joined {
                    Some(Ok(Ok(()))) => {}
                    Some(Ok(Err(e))) => {
                        error!("Aborting run: {e}");
                        stop.store(true, Ordering::Relaxed);
                        set.abort_all();
                        return Err(e.into());
                    }
                    Some(Err(e)) if e.is_panic() => {
                        error!("A scan worker panicked: {e}");
                    }
                    Some(Err(e)) => debug!("Worker cancelled: {e}"),
                    None => break,
                },
            }
        }

        // Every sender is gone once the pool is empty.
        while let Some(result) = rx.recv().await {
            results.push(result);
            self.report_progress(results.len(), total);
        }

        fill_missing(&targets, &mut results);
        Ok(results)
    }

    fn report_progress(&self, completed: usize, total: usize) {
        if let Some(progress) = &self.progress {
            progress(completed, total);
        }
    }
}

/// Number of workers actually started: at least one, never more than targets.
pub fn effective_workers(requested: usize, targets: usize) -> usize {
    requested.max(1).min(targets)
}

async fn worker(
    id: usize,
    scanner: Arc<dyn Scanner>,
    options: Arc<ScanOptions>,
    queue: TargetQueue,
    stop: Arc<AtomicBool>,
    tx: UnboundedSender<ScanResult>,
) -> Result<(), ScanError> {
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let Some(target) = queue.lock().await.pop_front() else {
            break;
        };

        debug!("Worker {id} picked {target}");
        let result = match scan_target(scanner.as_ref(), &target, &options).await {
            Ok(result) => result,
            Err(e) => {
                stop.store(true, Ordering::Relaxed);
                return Err(e);
            }
        };

        if tx.send(result).is_err() {
            break;
        }
    }
    Ok(())
}

/// Scans and parses a single target.
///
/// Only [`ScanError::ToolUnavailable`] is returned as an error.
pub async fn scan_target(
    scanner: &dyn Scanner,
    target: &str,
    options: &ScanOptions,
) -> Result<ScanResult, ScanError> {
    match scanner.scan(target, options).await {
        Ok(raw) => {
            let (hosts, parse_warning) = parser::parse_hosts(&raw.artifact);
            Ok(raw.into_result(hosts, parse_warning))
        }
        Err(ScanError::Io { target, source }) => {
            warn!("Scan of {target} could not complete: {source}");
            let warning = ScanWarning::ArtifactIo {
                message: source.to_string(),
            };
            Ok(empty_result(&target, warning))
        }
        Err(e) => Err(e),
    }
}

fn empty_result(target: &str, warning: ScanWarning) -> ScanResult {
    ScanResult {
        target: target.to_string(),
        command: String::new(),
        exit_status: None,
        stderr: String::new(),
        timestamp: Utc::now(),
        artifact_path: PathBuf::new(),
        hosts: Vec::new(),
        warnings: vec![warning],
    }
}

/// Adds a host-less result for every target a crashed worker took with it.
fn fill_missing(targets: &[String], results: &mut Vec<ScanResult>) {
    let mut delivered: HashMap<&str, usize> = HashMap::new();
    for result in results.iter() {
        *delivered.entry(result.target.as_str()).or_default() += 1;
    }

    let mut missing: Vec<ScanResult> = Vec::new();
    for target in targets {
        match delivered.get_mut(target.as_str()) {
            Some(count) if *count > 0 => *count -= 1,
            _ => {
                warn!("No result for {target}, recording it as failed");
                missing.push(empty_result(
                    target,
                    ScanWarning::Execution {
                        message: "scan worker terminated unexpectedly".to_string(),
                    },
                ));
            }
        }
    }
    results.extend(missing);
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
    use std::collections::BTreeSet;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use crate::scanner::canned::CannedScanner;

    const ONE_HOST: &str = r#"<nmaprun><host><status state="up"/>
        <address addr="10.0.0.1" addrtype="ipv4"/>
        <ports><port protocol="tcp" portid="22"><state state="open"/><service name="ssh"/></port></ports>
        </host></nmaprun>"#;

    fn targets(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("10.0.0.{i}")).collect()
    }

    fn target_set(results: &[ScanResult]) -> BTreeSet<String> {
        results.iter().map(|r| r.target.clone()).collect()
    }

    async fn run_with(scanner: &CannedScanner, workers: usize, targets: Vec<String>) -> Result<Vec<ScanResult>, RunError> {
        Orchestrator::new(Arc::new(scanner.clone()), ScanOptions::default(), workers)
            .run(targets)
            .await
    }

    #[test]
    fn effective_workers_is_clamped() {
        assert_eq!(effective_workers(0, 5), 1);
        assert_eq!(effective_workers(4, 2), 2);
        assert_eq!(effective_workers(4, 10), 4);
        assert_eq!(effective_workers(1, 1), 1);
    }

    #[tokio::test]
    async fn empty_target_list_is_rejected() {
        let scanner = CannedScanner::new();
        let result = run_with(&scanner, 4, Vec::new()).await;
        assert!(matches!(result, Err(RunError::NoTargets)));
        assert_eq!(scanner.calls(), 0);
    }

    #[tokio::test]
    async fn one_result_per_target_for_any_worker_count() {
        for workers in [0, 1, 2, 3, 8, 32] {
            let scanner = CannedScanner::new().with_fallback(ONE_HOST);
            let results = run_with(&scanner, workers, targets(7)).await.unwrap();

            assert_eq!(results.len(), 7, "workers = {workers}");
            assert_eq!(target_set(&results), targets(7).into_iter().collect());
            assert_eq!(scanner.calls(), 7);
        }
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_worker_count() {
        let scanner = CannedScanner::new()
            .with_fallback(ONE_HOST)
            .with_delay(Duration::from_millis(20));
        let results = run_with(&scanner, 3, targets(10)).await.unwrap();

        assert_eq!(results.len(), 10);
        assert!(scanner.peak_concurrency() <= 3);
        assert!(scanner.peak_concurrency() >= 1);
    }

    #[tokio::test]
    async fn sequential_and_parallel_agree() {
        let scanner = CannedScanner::new()
            .with_fallback(ONE_HOST)
            .with_exit_code("10.0.0.2", 1);

        let mut sequential = run_with(&scanner, 1, targets(5)).await.unwrap();
        let mut parallel = run_with(&scanner, 5, targets(5)).await.unwrap();
        sequential.sort_by(|a, b| a.target.cmp(&b.target));
        parallel.sort_by(|a, b| a.target.cmp(&b.target));

        let strip = |r: &ScanResult| (r.target.clone(), r.exit_status, r.hosts.clone(), r.warnings.clone());
        assert_eq!(
            sequential.iter().map(strip).collect::<Vec<_>>(),
            parallel.iter().map(strip).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn missing_binary_stops_before_any_scan() {
        let scanner = CannedScanner::new().missing_binary();
        let result = run_with(&scanner, 4, targets(3)).await;

        assert!(matches!(result, Err(RunError::ToolUnavailable { .. })));
        assert_eq!(scanner.calls(), 0);
    }

    #[tokio::test]
    async fn tool_unavailable_during_scan_aborts_run() {
        let scanner = CannedScanner::new().missing_at_scan();
        let result = run_with(&scanner, 2, targets(20)).await;

        assert!(matches!(result, Err(RunError::ToolUnavailable { .. })));
        assert!(scanner.calls() < 20);
    }

    #[tokio::test]
    async fn malformed_artifact_only_degrades_its_target() {
        let scanner = CannedScanner::new()
            .with_fallback(ONE_HOST)
            .with_artifact("10.0.0.2", "<nmaprun><host>")
            .with_exit_code("10.0.0.2", 2)
            .with_stderr("10.0.0.2", "Failed to resolve");

        let results = run_with(&scanner, 4, targets(3)).await.unwrap();
        assert_eq!(results.len(), 3);

        for result in &results {
            if result.target == "10.0.0.2" {
                assert!(result.hosts.is_empty());
                assert_eq!(result.exit_status, Some(2));
                assert_eq!(result.stderr, "Failed to resolve");
                assert!(result.warnings.contains(&ScanWarning::ToolExit { code: Some(2) }));
                assert!(
                    result
                        .warnings
                        .iter()
                        .any(|w| matches!(w, ScanWarning::ArtifactParse { .. }))
                );
            } else {
                assert_eq!(result.hosts.len(), 1);
                assert!(result.warnings.is_empty());
            }
        }
    }

    #[tokio::test]
    async fn progress_reaches_total() {
        let calls = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));
        let progress: ProgressFn = {
            let calls = Arc::clone(&calls);
            let last = Arc::clone(&last);
            Arc::new(move |done, total| {
                assert_eq!(total, 4);
                calls.fetch_add(1, Ordering::SeqCst);
                last.store(done, Ordering::SeqCst);
            })
        };

        let scanner = CannedScanner::new().with_fallback(ONE_HOST);
        let results = Orchestrator::new(Arc::new(scanner), ScanOptions::default(), 2)
            .with_progress(progress)
            .run(targets(4))
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(last.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn repeated_targets_are_scanned_once() {
        let scanner = CannedScanner::new().with_fallback(ONE_HOST);
        let requested: Vec<String> = ["10.0.0.1", "10.0.0.2", "10.0.0.1", "10.0.0.2", "10.0.0.1"]
            .iter()
            .map(|t| t.to_string())
            .collect();

        let results = run_with(&scanner, 4, requested).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(target_set(&results), targets(2).into_iter().collect());
        assert_eq!(scanner.calls(), 2);
        assert!(results.iter().all(|r| r.warnings.is_empty()));
    }

    #[test]
    fn fill_missing_adds_placeholders() {
        let targets = targets(3);
        let mut results = vec![empty_result(
            "10.0.0.2",
            ScanWarning::Timeout { millis: 10 },
        )];

        fill_missing(&targets, &mut results);

        assert_eq!(results.len(), 3);
        assert_eq!(target_set(&results), targets.into_iter().collect());
        assert!(matches!(results[1].warnings[0], ScanWarning::Execution { .. }));
    }
}
