use clap::{Args, Parser, Subcommand};
use secfetch::config::Config;
use secfetch::downloader::{DEFAULT_FILE_TYPES, DEFAULT_QUARTERS};
use secfetch::{DownloadOptions, DownloadResult, ProgressObserver};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "secfetch")]
#[command(about = "Download SEC EDGAR filings by quarter and form type, with resume")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download filings for a quarter
    Quarter {
        #[arg(long)]
        year: i32,

        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=4))]
        quarter: u32,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Download filings for a year (all quarters by default)
    Year {
        #[arg(long)]
        year: i32,

        /// Quarters to download, in order
        #[arg(long, num_args = 1.., value_parser = clap::value_parser!(u32).range(1..=4))]
        quarters: Option<Vec<u32>>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Form types (default: 10-Q)
    #[arg(long, num_args = 0..)]
    pub forms: Vec<String>,

    /// Download root [env: SECFETCH_DATA_DIR, default: data]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// File suffixes to keep from each filing
    #[arg(long, num_args = 1..)]
    pub file_types: Option<Vec<String>>,

    /// Also download amended (/A) variants of the requested forms
    #[arg(long)]
    pub include_amended: bool,

    /// Maximum filings downloaded at once [env: SECFETCH_CONCURRENCY, default: 6]
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// User agent sent to EDGAR, e.g. "Jane Doe jane@example.com" [env: SECFETCH_USER_AGENT]
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Manifest file (default: <data-dir>/_state/manifest.json)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Delete existing data for this run and download again
    #[arg(long)]
    pub redownload: bool,
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Commands::Quarter { common, .. } | Commands::Year { common, .. } => common,
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            Commands::Quarter { year, .. } | Commands::Year { year, .. } => *year,
        }
    }

    /// Quarters this command covers
    pub fn quarters(&self) -> Vec<u32> {
        match self {
            Commands::Quarter { quarter, .. } => vec![*quarter],
            Commands::Year { quarters, .. } => quarters
                .clone()
                .unwrap_or_else(|| DEFAULT_QUARTERS.to_vec()),
        }
    }
}

impl CommonArgs {
    /// Merge command line flags over the environment configuration
    pub fn to_options(&self, mut config: Config) -> DownloadOptions {
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(user_agent) = &self.user_agent {
            config.http.user_agent = Some(user_agent.clone());
        }

        let forms = if self.forms.is_empty() {
            vec!["10-Q".to_string()]
        } else {
            self.forms.clone()
        };
        let file_types = self
            .file_types
            .clone()
            .unwrap_or_else(|| DEFAULT_FILE_TYPES.iter().map(|s| s.to_string()).collect());

        DownloadOptions {
            config,
            forms,
            file_types,
            include_amended: self.include_amended,
            manifest_path: self.manifest.clone(),
        }
    }
}

const SPINNER: &[char] = &['|', '/', '-', '\\'];

const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const MAGENTA: &str = "\x1b[35m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Single-line progress display on stderr
pub struct ConsoleProgress;

impl ConsoleProgress {
    /// Erase the progress line so stdout output starts clean
    pub fn clear() {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\r{}\r", " ".repeat(60));
        let _ = stderr.flush();
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_progress(
        &self,
        completed: usize,
        total: usize,
        last: Option<&DownloadResult>,
        in_flight: usize,
    ) {
        if total == 0 {
            return;
        }
        let spin = match last {
            None => "...".to_string(),
            Some(_) => SPINNER[completed.saturating_sub(1) % SPINNER.len()].to_string(),
        };
        let in_flight_part = if in_flight > 0 {
            format!(" {}({} downloading){}", MAGENTA, in_flight, RESET)
        } else {
            String::new()
        };

        let mut stderr = std::io::stderr();
        let _ = write!(
            stderr,
            "\r  {}{}Processing{} {}{}/{}{} {}{}{}{}  ",
            CYAN, BOLD, RESET, GREEN, completed, total, RESET, YELLOW, spin, RESET, in_flight_part
        );
        let _ = stderr.flush();
    }
}
