#![cfg(not(tarpaulin_include))]

use clap::Parser;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use sweeper::cleaning::{CleaningOptions, apply_cleaning};
use sweeper::downloader::{self, ExportFormat};
use sweeper::loader::{UploadedFile, load_uploads};
use sweeper::table::Table;

/// Clean and convert CSV / Excel files from the command line
#[derive(Parser, Debug)]
#[command(name = "sweep")]
struct Args {
    /// Files to process (.csv or .xlsx)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Remove duplicate rows
    #[arg(long)]
    dedupe: bool,

    /// Fill missing numeric values with the column mean
    #[arg(long)]
    fill_missing: bool,

    /// Comma-separated columns to keep (default: all)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Output format: csv or excel
    #[arg(long, default_value = "csv")]
    to: String,

    /// Directory the converted files are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn process(
    table: &mut Table,
    name: &str,
    source: &Path,
    args: &Args,
    format: ExportFormat,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let options = CleaningOptions {
        remove_duplicates: args.dedupe,
        fill_missing: args.fill_missing,
    };
    let report = apply_cleaning(table, options);
    if args.dedupe || args.fill_missing {
        println!(
            "  cleaned: {} duplicates removed, {} cells filled",
            report.duplicates_removed, report.cells_filled
        );
    }

    let selected = table.select(&args.columns)?;
    let download = downloader::export(&selected, name, format)?;

    let target = args.out_dir.join(&download.file_name);
    if same_file(source, &target) {
        return Err(format!("refusing to overwrite input file {}", source.display()).into());
    }
    fs::write(&target, &download.bytes)?;
    Ok(target)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let format: ExportFormat = match args.to.parse() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = fs::create_dir_all(&args.out_dir) {
        eprintln!("Error: cannot create {}: {}", args.out_dir.display(), e);
        return ExitCode::FAILURE;
    }

    let mut failures = 0;
    let mut uploads = Vec::new();
    let mut sources = Vec::new();
    for path in &args.files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match fs::read(path) {
            Ok(bytes) => {
                uploads.push(UploadedFile::new(name, bytes));
                sources.push(path.clone());
            }
            Err(e) => {
                eprintln!("Error loading {}: {}", name, e);
                failures += 1;
            }
        }
    }

    for (outcome, source) in load_uploads(uploads).into_iter().zip(&sources) {
        println!("{} - {:.2} KB", outcome.name, outcome.size_kb);
        let mut table = match outcome.result {
            Ok(table) => table,
            Err(e) => {
                eprintln!("Error loading {}: {}", outcome.name, e);
                failures += 1;
                continue;
            }
        };

        match process(&mut table, &outcome.name, source, &args, format) {
            Ok(target) => {
                info!("Wrote {}", target.display());
                println!("  wrote {}", target.display());
            }
            Err(e) => {
                error!("Failed to convert {}: {}", outcome.name, e);
                eprintln!("Error converting {}: {}", outcome.name, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        eprintln!("{} file(s) failed", failures);
        ExitCode::FAILURE
    } else {
        println!("Processing complete!");
        ExitCode::SUCCESS
    }
}
