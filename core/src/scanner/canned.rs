//! A [`Scanner`] that never spawns anything.
//!
//! Artifacts, exit statuses and stderr are prepared up front per target. Used by
//! the test suites and handy for replaying saved nmap XML through the pipeline.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use nscope_common::config::ScanOptions;
use nscope_common::error::ScanError;

use super::{RawArtifact, RawScan, Scanner};

const CANNED_TOOL: &str = "nmap";

#[derive(Default)]
struct Counters {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct CannedScanner {
    artifacts: HashMap<String, Vec<u8>>,
    fallback: Vec<u8>,
    exit_codes: HashMap<String, i32>,
    stderr: HashMap<String, String>,
    delay: Option<Duration>,
    missing_at_preflight: bool,
    missing_at_scan: bool,
    counters: Arc<Counters>,
}

impl CannedScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifact returned for `target`.
    pub fn with_artifact(mut self, target: &str, content: impl Into<Vec<u8>>) -> Self {
        self.artifacts.insert(target.to_string(), content.into());
        self
    }

    /// Artifact returned for every target without its own.
    pub fn with_fallback(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.fallback = content.into();
        self
    }

    pub fn with_exit_code(mut self, target: &str, code: i32) -> Self {
        self.exit_codes.insert(target.to_string(), code);
        self
    }

    pub fn with_stderr(mut self, target: &str, stderr: &str) -> Self {
        self.stderr.insert(target.to_string(), stderr.to_string());
        self
    }

    /// Makes every scan take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Behaves as if the binary were not installed.
    pub fn missing_binary(mut self) -> Self {
        self.missing_at_preflight = true;
        self.missing_at_scan = true;
        self
    }

    /// Passes preflight but fails once a target is actually scanned.
    pub fn missing_at_scan(mut self) -> Self {
        self.missing_at_scan = true;
        self
    }

    /// Number of `scan` calls so far.
    pub fn calls(&self) -> usize {
        self.counters.calls.load(Ordering::SeqCst)
    }

    /// Highest number of scans that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    fn not_found(&self) -> ScanError {
        ScanError::ToolUnavailable {
            tool: CANNED_TOOL.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "canned scanner has no binary"),
        }
    }
}

#[async_trait]
impl Scanner for CannedScanner {
    fn tool(&self) -> &str {
        CANNED_TOOL
    }

    async fn preflight(&self) -> Result<(), ScanError> {
        if self.missing_at_preflight {
            return Err(self.not_found());
        }
        Ok(())
    }

    async fn scan(&self, target: &str, options: &ScanOptions) -> Result<RawScan, ScanError> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        if self.missing_at_scan {
            return Err(self.not_found());
        }

        let running = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let path = super::artifact_path(&PathBuf::from("canned"), target);
        let args = super::build_args(target, options, &path);
        let bytes = self
            .artifacts
            .get(target)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());

        let exit_status = Some(self.exit_codes.get(target).copied().unwrap_or(0));

        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(RawScan {
            target: target.to_string(),
            command: super::command_line(CANNED_TOOL, &args),
            exit_status,
            stderr: self.stderr.get(target).cloned().unwrap_or_default(),
            timestamp: Utc::now(),
            artifact: RawArtifact { path, bytes },
            warnings: super::classify_exit(exit_status).into_iter().collect(),
        })
    }
}
