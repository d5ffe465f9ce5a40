//! lesson-check CLI - check the Python in lesson Markdown files

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lesson_check::config::CheckConfig;
use lesson_check::episode::EpisodeRunner;
use lesson_check::report::EpisodeReport;
use lesson_check::runner::CodeRunner;
use lesson_check::{Error, Result};

/// Check the Python in Markdown lesson files
#[derive(Parser)]
#[command(name = "lesson-check")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Check all .md files in this directory, unless -f is used
    directory: PathBuf,

    /// Files to check, relative to the directory
    #[arg(short = 'f', num_args = 1..)]
    files: Vec<String>,

    /// Give verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print each document's report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct DocumentReport<'a> {
    document: String,
    blocks: &'a EpisodeReport,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .compact()
        .init();
}

/// Documents to check, in name order
fn documents(directory: &Path, files: &[String]) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(Error::Configuration(format!(
            "{} is not a directory",
            directory.display()
        )));
    }
    if !files.is_empty() {
        return Ok(files.iter().map(|file| directory.join(file)).collect());
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "md") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Check every document; `Ok(false)` if any mismatched or failed
fn run(cli: &Cli) -> Result<bool> {
    let config = match &cli.config {
        Some(path) => CheckConfig::from_file(path)?,
        None => CheckConfig::default(),
    };
    let converter = config.converter()?;
    // A missing interpreter or required module fails every document
    drop(CodeRunner::with_config(config.runner.clone()).open()?);
    let episode = EpisodeRunner::from_config(&config);

    let mut clean = true;
    for path in documents(&cli.directory, &cli.files)? {
        info!("Processing {}", path.display());
        let report = match converter
            .convert(&path)
            .and_then(|elements| episode.run(&elements))
        {
            Ok(report) => report,
            Err(err) => {
                error!("{}: {err}", path.display());
                clean = false;
                continue;
            }
        };

        report.log();
        clean &= report.passed();
        if cli.json {
            let document = DocumentReport {
                document: path.display().to_string(),
                blocks: &report,
            };
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }
    Ok(clean)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            error!("{err}");
            ExitCode::from(2)
        }
    }
}
