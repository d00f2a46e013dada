//! wdtag CLI - tag anime-style images with WD tagger models.
//!
//! Runs a WD (waifu diffusion) tagger over one image or a whole folder and
//! writes comma-separated caption sidecars for training datasets.
//!
//! # Usage
//!
//! ```bash
//! # Download the default model
//! wdtag models download
//!
//! # Tag a single image
//! wdtag tag image.png --mcut
//!
//! # Tag a folder, writing image.txt next to every image
//! wdtag bulk ./dataset/ --general-threshold 0.4
//!
//! # Add a trigger word to every caption
//! wdtag tags add ./dataset/ my_character
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// wdtag - multi-label image tagging with WD tagger models.
#[derive(Parser, Debug)]
#[command(name = "wdtag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag a single image
    Tag(cli::tag::TagArgs),

    /// Tag every image in a folder and write `.txt` sidecars
    Bulk(cli::bulk::BulkArgs),

    /// Show, add or remove tags in caption sidecars
    Tags(cli::tags::TagsArgs),

    /// Manage tagger models (download, list, path)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match wdtag_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `wdtag config path`."
            );
            wdtag_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("wdtag v{}", wdtag_core::VERSION);

    match cli.command {
        Commands::Tag(args) => cli::tag::execute(args),
        Commands::Bulk(args) => cli::bulk::execute(args),
        Commands::Tags(args) => cli::tags::execute(args),
        Commands::Models(args) => cli::models::execute(args).await,
        Commands::Config(args) => cli::config::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_bulk_flags() {
        let cli = Cli::try_parse_from([
            "wdtag",
            "bulk",
            "./imgs",
            "--general-threshold",
            "0.4",
            "--character-mcut",
            "--report",
            "out.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Bulk(args) => {
                assert_eq!(args.thresholds.general_threshold, Some(0.4));
                assert!(args.thresholds.character_mcut);
                assert!(!args.thresholds.general_mcut);
                assert_eq!(args.report.unwrap().to_str(), Some("out.json"));
            }
            other => panic!("expected bulk, got {other:?}"),
        }
    }

    #[test]
    fn parse_tags_add() {
        let cli = Cli::try_parse_from(["wdtag", "tags", "add", "./imgs", "highres"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Tags(cli::tags::TagsArgs {
                command: cli::tags::TagsCommand::Add { .. }
            })
        ));
    }
}
