use anyhow::Result;
use clap::Parser;
use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;
use tracing::{error, info};

use secfetch::config::Config;
use secfetch::has_existing_data_for_quarter;

mod cli;

use cli::{Cli, Commands, ConsoleProgress};

#[tokio::main]
async fn main() -> Result<()> {
    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "secfetch=info");
    }

    // Initialize logging to both console and file
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Create a file appender for logging
    let file_appender = tracing_appender::rolling::never(".", "secfetch.log");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    let cli = Cli::parse();
    let command = &cli.command;
    let common = command.common();
    let options = common.to_options(Config::from_env()?);
    options.config.validate()?;
    let year = command.year();
    let quarters = command.quarters();

    let mut redownload = common.redownload;
    if !redownload && std::io::stdin().is_terminal() {
        let data_dir = &options.config.data_dir;
        let manifest = options.manifest_path.as_deref();
        let mut has_existing = false;
        for &quarter in &quarters {
            if has_existing_data_for_quarter(data_dir, year, quarter, manifest)? {
                has_existing = true;
                break;
            }
        }
        if has_existing {
            let label = match command {
                Commands::Quarter { quarter, .. } => format!("Q{}", quarter),
                Commands::Year { .. } => "all quarters".to_string(),
            };
            redownload = prompt_resume_or_redownload(year, &label);
        }
    }

    info!(
        "Downloading {:?} for {} quarters {:?} into {}",
        options.forms,
        year,
        quarters,
        options.config.data_dir.display()
    );

    let observer = Arc::new(ConsoleProgress);
    let outcome = match command {
        Commands::Quarter { quarter, .. } => {
            secfetch::download_quarter(&options, year, *quarter, redownload, Some(observer)).await
        }
        Commands::Year { .. } => {
            secfetch::download_year(&options, year, &quarters, redownload, Some(observer)).await
        }
    };
    ConsoleProgress::clear();

    match outcome {
        Ok(results) => {
            let failed = results.iter().filter(|r| r.is_error()).count();
            info!(
                "Finished: {} results, {} failed",
                results.len(),
                failed
            );
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Err(e) => {
            error!("Download failed: {:#}", e);
            return Err(e);
        }
    }

    Ok(())
}

/// Ask whether to resume or redownload. Returns true for redownload.
fn prompt_resume_or_redownload(year: i32, label: &str) -> bool {
    let mut stderr = std::io::stderr();
    let _ = write!(
        stderr,
        "Existing data found for {} {}. Resume (skip already downloaded) or \
         Redownload (delete and fetch again)? [Resume/Redownload]: ",
        year, label
    );
    let _ = stderr.flush();

    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(
        line.trim().to_lowercase().as_str(),
        "redownload" | "r" | "re-download"
    )
}
