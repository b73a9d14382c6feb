//! Production [`Scanner`] that spawns the nmap binary once per target.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use nscope_common::config::ScanOptions;
use nscope_common::error::ScanError;
use nscope_common::scan::ScanWarning;

use super::{RawArtifact, RawScan, Scanner};

pub struct NmapScanner {
    binary: String,
    output_dir: PathBuf,
}

impl NmapScanner {
    pub fn new(binary: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            output_dir: output_dir.into(),
        }
    }

    fn unavailable(&self, source: io::Error) -> ScanError {
        ScanError::ToolUnavailable {
            tool: self.binary.clone(),
            source,
        }
    }
}

#[async_trait]
impl Scanner for NmapScanner {
    fn tool(&self) -> &str {
        &self.binary
    }

    async fn preflight(&self) -> Result<(), ScanError> {
        let status = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| self.unavailable(source))?;

        debug!("{} --version exited with {status}", self.binary);
        Ok(())
    }

    async fn scan(&self, target: &str, options: &ScanOptions) -> Result<RawScan, ScanError> {
        let artifact_path = super::artifact_path(&self.output_dir, target);
        remove_stale_artifact(&artifact_path)
            .await
            .map_err(|source| ScanError::Io {
                target: target.to_string(),
                source,
            })?;

        let args = super::build_args(target, options, &artifact_path);
        let command = super::command_line(&self.binary, &args);
        info!("Running: {command}");

        let spawned = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut warnings: Vec<ScanWarning> = Vec::new();

        let (exit_status, stdout, stderr) = match spawned {
            Err(source) if cannot_execute(&source) => return Err(self.unavailable(source)),
            Err(e) => {
                warn!("Could not start {} for {target}: {e}", self.binary);
                warnings.push(ScanWarning::Execution {
                    message: e.to_string(),
                });
                (None, Vec::new(), String::new())
            }
            Ok(child) => match wait_for_exit(child, options.timeout).await {
                Ok(Some(output)) => {
                    let code = output.status.code();
                    if let Some(warning) = super::classify_exit(code) {
                        warn!("{} returned exit code {code:?} for {target}", self.binary);
                        warnings.push(warning);
                    }
                    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                    (code, output.stdout, stderr)
                }
                Ok(None) => {
                    let millis = options
                        .timeout
                        .map(|limit| limit.as_millis() as u64)
                        .unwrap_or_default();
                    warn!("{} timed out on {target}, process killed", self.binary);
                    warnings.push(ScanWarning::Timeout { millis });
                    (None, Vec::new(), String::new())
                }
                Err(e) => {
                    warn!("Lost track of {} while scanning {target}: {e}", self.binary);
                    warnings.push(ScanWarning::Execution {
                        message: e.to_string(),
                    });
                    (None, Vec::new(), String::new())
                }
            },
        };

        let bytes = collect_artifact(&artifact_path, stdout, &mut warnings).await;

        Ok(RawScan {
            target: target.to_string(),
            command,
            exit_status,
            stderr,
            timestamp: Utc::now(),
            artifact: RawArtifact {
                path: artifact_path,
                bytes,
            },
            warnings,
        })
    }
}

/// Spawn failures that mean the binary itself is unusable. Anything else
/// (descriptor exhaustion, a busy executable) only affects one target.
fn cannot_execute(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    )
}

/// Waits for the child to exit. `Ok(None)` means the timeout fired; dropping
/// the pending future kills the child through `kill_on_drop`.
async fn wait_for_exit(child: Child, limit: Option<Duration>) -> io::Result<Option<Output>> {
    match limit {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(output) => output.map(Some),
            Err(_elapsed) => Ok(None),
        },
        None => child.wait_with_output().await.map(Some),
    }
}

async fn remove_stale_artifact(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed stale artifact {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Reads the artifact the tool wrote. When it wrote nothing, captured stdout is
/// persisted in its place so there is always something to parse.
async fn collect_artifact(path: &Path, stdout: Vec<u8>, warnings: &mut Vec<ScanWarning>) -> Vec<u8> {
    match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No artifact at {}, persisting stdout instead", path.display());
            if let Err(e) = fs::write(path, &stdout).await {
                warn!("Failed to persist stdout to {}: {e}", path.display());
                warnings.push(ScanWarning::ArtifactIo {
                    message: e.to_string(),
                });
            }
            stdout
        }
        Err(e) => {
            warn!("Failed to read artifact {}: {e}", path.display());
            warnings.push(ScanWarning::ArtifactIo {
                message: e.to_string(),
            });
            Vec::new()
        }
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
