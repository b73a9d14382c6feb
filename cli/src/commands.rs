pub mod scan;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, ArgGroup, Parser};
use tracing::level_filters::LevelFilter;

use nscope_common::config::{
    Config, DEFAULT_BINARY, DEFAULT_OUTPUT_DIR, DEFAULT_SCAN_TYPE, DEFAULT_TITLE, DEFAULT_WORKERS,
    PortSelector, ScanOptions,
};
use nscope_common::error::RunError;
use nscope_common::network::target;

#[derive(Parser, Debug)]
#[command(name = "nscope", version)]
#[command(about = "Runs nmap against many targets and writes JSON, HTML and Markdown reports.")]
#[command(group(ArgGroup::new("input").required(true).args(["targets", "targets_file"])))]
pub struct CommandLine {
    /// Comma separated targets (addresses, hostnames or CIDR ranges)
    #[arg(long, value_name = "LIST")]
    pub targets: Option<String>,

    /// File with one target per line; blank lines and '#' comments are ignored
    #[arg(long, value_name = "PATH")]
    pub targets_file: Option<PathBuf>,

    /// Port specification passed to nmap as '-p'
    #[arg(long, value_name = "SPEC", conflicts_with = "top_ports")]
    pub ports: Option<String>,

    /// Scan the N most common ports
    #[arg(long, value_name = "N")]
    pub top_ports: Option<u32>,

    /// Scan style flags
    #[arg(long, value_name = "FLAGS", default_value = DEFAULT_SCAN_TYPE, allow_hyphen_values = true)]
    pub scan_type: String,

    /// Additional flags appended to every invocation
    #[arg(long, value_name = "FLAGS", default_value = "", allow_hyphen_values = true)]
    pub extra_args: String,

    /// Directory for XML artifacts and reports
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Number of targets scanned in parallel
    #[arg(short = 't', long, value_name = "N", default_value_t = DEFAULT_WORKERS)]
    pub threads: usize,

    /// Title of the HTML and Markdown reports
    #[arg(long, default_value = DEFAULT_TITLE)]
    pub title: String,

    /// Kill a scan that runs longer than SECS
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// nmap binary to run
    #[arg(long, value_name = "PATH", default_value = DEFAULT_BINARY)]
    pub nmap: String,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only warnings, errors and the final summary
    #[arg(short, long)]
    pub quiet: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn log_level(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::WARN,
            (false, 0) => LevelFilter::INFO,
            (false, 1) => LevelFilter::DEBUG,
            (false, _) => LevelFilter::TRACE,
        }
    }

    fn port_selector(&self) -> Option<PortSelector> {
        match (&self.ports, self.top_ports) {
            (Some(spec), _) => Some(PortSelector::List(spec.clone())),
            (None, Some(count)) => Some(PortSelector::Top(count)),
            (None, None) => None,
        }
    }

    pub fn to_config(&self) -> Result<Config, RunError> {
        let scan = ScanOptions::from_flags(
            &self.scan_type,
            &self.extra_args,
            self.port_selector(),
            self.timeout.map(Duration::from_secs),
        )?;

        Ok(Config {
            output_dir: self.output_dir.clone(),
            workers: self.threads,
            title: self.title.clone(),
            binary: self.nmap.clone(),
            scan,
        })
    }

    /// Target list in first-seen order, without duplicates.
    pub fn load_targets(&self) -> Result<Vec<String>, RunError> {
        let targets = match (&self.targets, &self.targets_file) {
            (Some(list), _) => target::parse_commas(list),
            (None, Some(path)) => target::load_from_file(path)?,
            (None, None) => Vec::new(),
        };
        Ok(target::dedup(targets))
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
