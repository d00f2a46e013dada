//! The `wdtag bulk` command: tag a folder and write caption sidecars.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use wdtag_core::{BulkOutcome, BulkSummary};

use super::{expand_path, load_tagger, ThresholdArgs};

/// Arguments for the `bulk` command.
#[derive(Args, Debug)]
pub struct BulkArgs {
    /// Directory of images to tag (not searched recursively)
    pub dir: PathBuf,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Write per-file outcomes as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Execute the bulk command.
pub fn execute(args: BulkArgs) -> anyhow::Result<()> {
    let dir = expand_path(&args.dir);
    if !dir.is_dir() {
        anyhow::bail!(
            "Not a directory: {:?}\n\n  Hint: `wdtag bulk` takes a folder; use `wdtag tag` for a single image.",
            dir
        );
    }

    let tagger = load_tagger(&args.thresholds)?;
    let (general, character) = tagger.default_strategies();

    let total = tagger.count_candidates(&dir)?;
    if total == 0 {
        println!("No supported images found in {}", dir.display());
        return Ok(());
    }

    let progress = create_progress_bar(total as u64);
    let start_time = std::time::Instant::now();
    let mut processed: u64 = 0;

    let outcomes = tagger.tag_folder(&dir, general, character, |outcome, _| {
        processed += 1;
        progress.inc(1);
        if !outcome.success {
            progress.println(format!("  failed: {}", outcome.file_name));
        }
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            progress.set_message(format!("{:.1} img/sec", processed as f64 / elapsed));
        }
    })?;

    let elapsed = start_time.elapsed();
    progress.finish_and_clear();

    let summary = BulkSummary::from_outcomes(&outcomes);
    print_summary(&summary, elapsed);

    if let Some(report) = &args.report {
        let report = expand_path(report);
        write_report(&report, &outcomes)?;
        tracing::info!("Report written to {:?}", report);
    }

    Ok(())
}

/// Create a progress bar for folder tagging.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table, followed by the failed files.
fn print_summary(summary: &BulkSummary, elapsed: Duration) {
    let rate = if elapsed.as_secs_f64() > 0.0 {
        summary.total() as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", summary.succeeded);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.total());
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");

    if !summary.failures.is_empty() {
        eprintln!();
        eprintln!("  Failed files:");
        for (file_name, message) in &summary.failures {
            eprintln!("    {file_name}: {message}");
        }
    }
}

/// Write outcomes as a pretty JSON array.
fn write_report(path: &Path, outcomes: &[BulkOutcome]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(outcomes)?;
    std::fs::write(path, json)?;
    Ok(())
}
