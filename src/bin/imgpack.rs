use std::fs::File;
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use miette::IntoDiagnostic;
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

use imgpack::app::{App, RunSummary};
use imgpack::archive::verify_archive;
use imgpack::config::{ConfigLoader, PipelineConfig};
use imgpack::error::PackError;
use imgpack::fetcher::HttpImageClient;
use imgpack::ledger::write_export_csv;
use imgpack::output::{JsonOutput, OutputMode, TerminalProgress, print_summary};
use imgpack::table::Table;

#[derive(Parser)]
#[command(name = "imgpack")]
#[command(about = "Download the images listed in a table (columns `Item` and `URL`) into one ZIP archive")]
#[command(version, author)]
struct Cli {
    /// CSV file with `Item` and `URL` columns
    input: Utf8PathBuf,

    /// Directory that receives the archive and the failure report
    #[arg(long, default_value = ".")]
    out_dir: Utf8PathBuf,

    /// JSON config file (defaults to ./imgpack.json when present)
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<PackError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PackError) -> u8 {
    if error.is_precondition() { 2 } else { 1 }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let table = Table::from_path(cli.input.as_std_path())?;
    std::fs::create_dir_all(cli.out_dir.as_std_path())
        .map_err(|err| PackError::Filesystem(format!("create {}: {err}", cli.out_dir)))?;

    let client = HttpImageClient::new(&config)?;
    let mut app = App::new(config, client);
    let staging = NamedTempFile::new_in(cli.out_dir.as_std_path())
        .map_err(|err| PackError::Filesystem(err.to_string()))?;

    let report = match output_mode {
        OutputMode::NonInteractive => app.run(&table, staging, &JsonOutput)?,
        OutputMode::Interactive => app.run(&table, staging, &TerminalProgress::new())?,
    };

    let archive_path = cli.out_dir.join(&app.config().archive_name);
    persist(report.archive, &archive_path)?;
    let stored = File::open(archive_path.as_std_path())
        .map_err(|err| PackError::Filesystem(format!("open {archive_path}: {err}")))
        .and_then(verify_archive)?;
    tracing::debug!(entries = stored.len(), path = %archive_path, "archive verified");

    let report_path = match &report.summary.failures {
        Some(failures) => {
            let path = cli.out_dir.join(&app.config().failure_report_name);
            write_failure_report(&failures.export, &path)?;
            Some(path)
        }
        None => None,
    };

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_summary(&report.summary).into_diagnostic()?,
        OutputMode::Interactive => {
            print_summary(&report.summary);
            print_artifacts(app.config(), &report.summary, &archive_path, report_path.as_deref());
        }
    }
    Ok(())
}

fn persist(file: NamedTempFile, path: &Utf8Path) -> Result<(), PackError> {
    file.persist(path.as_std_path())
        .map(|_| ())
        .map_err(|err| PackError::Filesystem(format!("write {path}: {}", err.error)))
}

fn write_failure_report(
    rows: &[imgpack::ledger::ExportRow],
    path: &Utf8Path,
) -> Result<(), PackError> {
    let dir = path.parent().unwrap_or(Utf8Path::new("."));
    let mut staging = NamedTempFile::new_in(dir.as_std_path())
        .map_err(|err| PackError::Filesystem(err.to_string()))?;
    write_export_csv(rows, staging.as_file_mut())?;
    persist(staging, path)
}

fn print_artifacts(
    config: &PipelineConfig,
    summary: &RunSummary,
    archive_path: &Utf8Path,
    report_path: Option<&Utf8Path>,
) {
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";
    println!(
        "{cyan}archive: {archive_path} ({} entr{}, *.{}){reset}",
        summary.archive_entries,
        if summary.archive_entries == 1 { "y" } else { "ies" },
        config.extension
    );
    if let Some(path) = report_path {
        println!("{cyan}failure report: {path}{reset}");
    }
}
