//! # Reports
//!
//! Three independent renderers over the same aggregated results:
//!
//! * [`json`]: lossless dump that parses back into the same results.
//! * [`html`]: self-contained page with one card per target.
//! * [`markdown`]: condensed summary listing only open ports.
//!
//! Renderers are pure functions of `(results, RenderContext)`. [`ReportGenerator`]
//! is the only part that touches the filesystem.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::info;

use nscope_common::error::RunError;
use nscope_common::scan::ScanResult;

pub mod html;
pub mod json;
pub mod markdown;

const STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Presentation settings for the HTML report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTheme {
    pub font_family: String,
    pub open_color: String,
    pub closed_color: String,
    pub muted_color: String,
    pub code_background: String,
}

impl Default for HtmlTheme {
    fn default() -> Self {
        Self {
            font_family: r#"system-ui, -apple-system, "Segoe UI", Roboto, Arial"#.to_string(),
            open_color: "green".to_string(),
            closed_color: "#888".to_string(),
            muted_color: "#666".to_string(),
            code_background: "#f8f8f8".to_string(),
        }
    }
}

impl HtmlTheme {
    pub fn stylesheet(&self) -> String {
        format!(
            "body{{font-family:{font};padding:20px}}\n\
             .card{{border-radius:8px;box-shadow:0 1px 4px rgba(0,0,0,0.08);padding:12px;margin:12px 0}}\n\
             h1,h2{{margin:8px 0}}\n\
             table{{width:100%;border-collapse:collapse}}\n\
             th,td{{padding:6px;border-bottom:1px solid #eee;text-align:left;font-size:13px}}\n\
             .state-open{{color:{open};font-weight:600}}\n\
             .state-closed{{color:{closed}}}\n\
             .meta{{font-size:12px;color:{muted}}}\n\
             .warnings{{color:#b35c00}}\n\
             pre{{background:{code};padding:8px;border-radius:6px;overflow:auto}}",
            font = self.font_family,
            open = self.open_color,
            closed = self.closed_color,
            muted = self.muted_color,
            code = self.code_background,
        )
    }
}

/// Everything a renderer needs besides the results themselves.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub theme: HtmlTheme,
}

impl RenderContext {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            generated_at: Utc::now(),
            theme: HtmlTheme::default(),
        }
    }

    /// Filename stamp shared by the three reports of one run.
    pub fn stamp(&self) -> String {
        self.generated_at.format(STAMP_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub html: PathBuf,
    pub markdown: PathBuf,
}

impl ReportPaths {
    fn in_dir(dir: &Path, stamp: &str) -> Self {
        Self {
            json: dir.join(format!("report_{stamp}.json")),
            html: dir.join(format!("report_{stamp}.html")),
            markdown: dir.join(format!("report_{stamp}.md")),
        }
    }
}

pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Renders and writes all three reports.
    pub async fn write_all(
        &self,
        results: &[ScanResult],
        ctx: &RenderContext,
    ) -> Result<ReportPaths, RunError> {
        let paths = ReportPaths::in_dir(&self.output_dir, &ctx.stamp());

        let json = json::render(results).map_err(|e| RunError::ReportWrite {
            path: paths.json.clone(),
            source: io::Error::from(e),
        })?;
        write_report(&paths.json, json).await?;
        info!("JSON written to {}", paths.json.display());

        write_report(&paths.html, html::render(results, ctx)).await?;
        info!("HTML report written to {}", paths.html.display());

        write_report(&paths.markdown, markdown::render(results, ctx)).await?;
        info!("Markdown summary written to {}", paths.markdown.display());

        Ok(paths)
    }
}

async fn write_report(path: &Path, content: String) -> Result<(), RunError> {
    fs::write(path, content)
        .await
        .map_err(|source| RunError::ReportWrite {
            path: path.to_path_buf(),
            source,
        })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
