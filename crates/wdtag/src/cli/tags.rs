//! The `wdtag tags` command: inspect and edit sidecars across a folder.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use wdtag_core::pipeline::FileDiscovery;
use wdtag_core::sidecar::{self, SidecarSet};
use wdtag_core::Config;

use super::expand_path;

/// Arguments for the `tags` command.
#[derive(Args, Debug)]
pub struct TagsArgs {
    #[command(subcommand)]
    pub command: TagsCommand,
}

/// Subcommands for sidecar editing.
#[derive(Subcommand, Debug)]
pub enum TagsCommand {
    /// Show tag frequencies across a folder's sidecars
    Show {
        /// Image folder
        dir: PathBuf,

        /// Only show the N most common tags
        #[arg(long)]
        top: Option<usize>,
    },

    /// Add a tag to every image's sidecar in a folder, or to one image
    Add {
        /// Image folder or single image
        path: PathBuf,
        /// Tag to add
        tag: String,
    },

    /// Remove a tag from every image's sidecar in a folder, or from one image
    Remove {
        /// Image folder or single image
        path: PathBuf,
        /// Tag to remove
        tag: String,
    },
}

/// Execute the tags command.
pub fn execute(args: TagsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let discovery = FileDiscovery::new(config.processing.clone());

    match args.command {
        TagsCommand::Show { dir, top } => {
            let set = SidecarSet::load(&expand_path(&dir), &discovery)?;
            if set.is_empty() {
                println!("No supported images found in {}", dir.display());
                return Ok(());
            }

            let freq = set.frequencies();
            let limit = top.unwrap_or(freq.len());
            println!("{} images, {} distinct tags\n", set.len(), freq.len());
            for (tag, count) in freq.iter().take(limit) {
                println!("  {:>6}  {}", count, tag);
            }
        }

        TagsCommand::Add { path, tag } => {
            let tag = non_empty(&tag)?;
            let path = expand_path(&path);
            let changed = if path.is_file() {
                let image = supported_image(&discovery, &path)?;
                usize::from(sidecar::add_tag(image, tag)?)
            } else {
                let mut set = SidecarSet::load(&path, &discovery)?;
                let changed = set.add_to_all(tag);
                if changed > 0 {
                    set.save()?;
                }
                changed
            };
            println!("Added tag '{}' to {} images.", tag, changed);
        }

        TagsCommand::Remove { path, tag } => {
            let tag = non_empty(&tag)?;
            let path = expand_path(&path);
            let changed = if path.is_file() {
                let image = supported_image(&discovery, &path)?;
                usize::from(sidecar::remove_tag(image, tag)?)
            } else {
                let mut set = SidecarSet::load(&path, &discovery)?;
                let changed = set.remove_from_all(tag);
                if changed > 0 {
                    set.save()?;
                }
                changed
            };
            println!("Removed tag '{}' from {} images.", tag, changed);
        }
    }

    Ok(())
}

/// Only supported images have sidecars; `a.txt` would otherwise be its own.
fn supported_image<'a>(discovery: &FileDiscovery, path: &'a Path) -> anyhow::Result<&'a Path> {
    if !discovery.is_supported(path) {
        anyhow::bail!(
            "Not a supported image: {}\n\n  Hint: Pass the image file or its folder, not the caption.",
            path.display()
        );
    }
    Ok(path)
}

fn non_empty(tag: &str) -> anyhow::Result<&str> {
    let tag = tag.trim();
    if tag.is_empty() {
        anyhow::bail!("Tag must not be empty");
    }
    if tag.contains(',') {
        anyhow::bail!("Tag must not contain ',' (the sidecar separator): {tag:?}");
    }
    Ok(tag)
}
