use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mediasort_core::{CancellationToken, SortOptions};

#[derive(Parser)]
#[command(
    name = "mediasort",
    version,
    about = "Organize photo, video and audio files into a date-based folder tree"
)]
struct Cli {
    /// Folder to organize
    source: PathBuf,

    /// Destination root for the sorted tree
    #[arg(short, long)]
    output: PathBuf,

    /// Use filesystem times for undated files instead of grouping
    /// them into the no-metadata folder
    #[arg(long)]
    no_metadata_fallback: bool,

    /// Do not move sidecar files together with their primary file
    #[arg(long)]
    no_sidecars: bool,

    /// JSON options file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let t_total = std::time::Instant::now();

    let mut options = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("can't read config {}", path.display()))?;
            serde_json::from_str::<SortOptions>(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => SortOptions::new(cli.source.clone(), cli.output.clone()),
    };
    options.source = cli.source;
    options.result = cli.output;
    if cli.no_metadata_fallback {
        options.group_no_metadata = false;
    }
    if cli.no_sidecars {
        options.find_sidecars = false;
    }

    let token = CancellationToken::new();
    {
        let token = token.clone();
        ctrlc::set_handler(move || token.cancel())?;
    }

    eprintln!("Searching files in {}", options.source.display());
    let report = mediasort_core::sort_files(&options, Some(&token))?;

    if !report.unremoved_folders.is_empty() {
        eprintln!(
            "The following folders are not empty:\n{}",
            report.unremoved_folders.join(",\n")
        );
    }
    if report.move_failures > 0 {
        eprintln!("{} files could not be moved, see the log", report.move_failures);
    }
    eprintln!(
        "Done! {} files found, {} moved, {} duplicates skipped ({:.2}s)",
        report.files_found,
        report.moved,
        report.duplicates,
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
