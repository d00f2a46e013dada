//! The `wdtag tag` command: classify a single image.

use std::path::PathBuf;

use clap::Args;
use wdtag_core::sidecar::format_tags;
use wdtag_core::PredictionResult;

use super::{expand_path, load_tagger, ThresholdArgs};

/// Arguments for the `tag` command.
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Image file to tag
    pub image: PathBuf,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Write the tags to a `.txt` sidecar next to the image
    #[arg(long)]
    pub save: bool,

    /// Print the full prediction as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the tag command.
pub fn execute(args: TagArgs) -> anyhow::Result<()> {
    let image = expand_path(&args.image);
    if !image.is_file() {
        anyhow::bail!(
            "Image not found: {:?}\n\n  Hint: Check the file path and try again.",
            image
        );
    }

    let tagger = load_tagger(&args.thresholds)?;
    let (general, character) = tagger.default_strategies();

    let start = std::time::Instant::now();
    let result = tagger.tag_file(&image, general, character)?;
    tracing::debug!("Tagged {:?} in {:?}", image, start.elapsed());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render(&result));
    }

    if args.save {
        let path = tagger.write_sidecar(&image, &result)?;
        tracing::info!("Sidecar written to {:?}", path);
    }

    Ok(())
}

/// Human-readable report: the combined tag line, then the rating distribution.
fn render(result: &PredictionResult) -> String {
    let mut out = String::new();
    out.push_str(&format_tags(&result.combined_tags()));
    out.push('\n');

    out.push_str(&format!(
        "\n  General ({}, threshold {:.3})\n",
        result.general.len(),
        result.general_threshold
    ));
    for tag in &result.general {
        let score = result.general_scores.get(tag).unwrap_or_default();
        out.push_str(&format!("    {:<32} {:.3}\n", tag, score));
    }

    if !result.character.is_empty() {
        out.push_str(&format!(
            "\n  Character ({}, threshold {:.3})\n",
            result.character.len(),
            result.character_threshold
        ));
        for tag in &result.character {
            let score = result.character_scores.get(tag).unwrap_or_default();
            out.push_str(&format!("    {:<32} {:.3}\n", tag, score));
        }
    }

    out.push_str("\n  Rating\n");
    for tag in &result.rating {
        out.push_str(&format!("    {:<32} {:.3}\n", tag.name, tag.confidence));
    }
    out
}
