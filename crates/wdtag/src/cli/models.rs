//! The `wdtag models` command for managing WD tagger models.

use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use wdtag_core::config::{LABELS_FILENAME, MODEL_FILENAME};
use wdtag_core::Config;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download a tagger model and its vocabulary
    Download {
        /// Variant to download (defaults to `[model] name` from config)
        #[arg(long)]
        model: Option<String>,
    },

    /// List known variants and whether they are installed
    List,

    /// Show model directory path
    Path,
}

/// A downloadable WD tagger release.
#[derive(Debug)]
struct ModelVariant {
    name: &'static str,
    label: &'static str,
    repo: &'static str,
}

const VARIANTS: &[ModelVariant] = &[
    ModelVariant {
        name: "wd-vit-tagger-v3",
        label: "ViT v3 (~380MB)",
        repo: "SmilingWolf/wd-vit-tagger-v3",
    },
    ModelVariant {
        name: "wd-vit-large-tagger-v3",
        label: "ViT-Large v3 (~1.2GB), slower, more accurate",
        repo: "SmilingWolf/wd-vit-large-tagger-v3",
    },
];

/// Both files every variant directory needs.
const VARIANT_FILES: &[&str] = &[MODEL_FILENAME, LABELS_FILENAME];

fn find_variant(name: &str) -> anyhow::Result<&'static ModelVariant> {
    VARIANTS.iter().find(|v| v.name == name).ok_or_else(|| {
        let known: Vec<&str> = VARIANTS.iter().map(|v| v.name).collect();
        anyhow::anyhow!(
            "Unknown model '{}'.\n\n  Hint: Known models are: {}",
            name,
            known.join(", ")
        )
    })
}

fn file_url(variant: &ModelVariant, file: &str) -> String {
    format!("https://huggingface.co/{}/resolve/main/{}", variant.repo, file)
}

/// Whether both files of a variant exist under `model_dir`.
fn is_installed(model_dir: &Path, variant: &ModelVariant) -> bool {
    let dir = model_dir.join(variant.name);
    VARIANT_FILES.iter().all(|f| dir.join(f).exists())
}

/// Download a variant's files into `model_dir/<name>/`. Skips files already present.
async fn download_variant(
    variant: &ModelVariant,
    model_dir: &Path,
    client: &reqwest::Client,
) -> anyhow::Result<()> {
    let variant_dir = model_dir.join(variant.name);
    std::fs::create_dir_all(&variant_dir)?;

    for file in VARIANT_FILES {
        let dest = variant_dir.join(file);
        if dest.exists() {
            tracing::info!("{} already exists at {:?}, skipping", file, dest);
            continue;
        }

        let url = file_url(variant, file);
        tracing::info!("Downloading {} ({})...", file, variant.label);
        tracing::info!("  Source: {}", url);
        tracing::info!("  Destination: {:?}", dest);

        download_file(client, &url, &dest).await?;

        let file_size = std::fs::metadata(&dest)?.len();
        let digest = wdtag_core::hash::content_hash(&dest)?;
        tracing::info!(
            "  {} complete ({:.1} MB, blake3 {})",
            file,
            file_size as f64 / (1024.0 * 1024.0),
            digest
        );
    }

    Ok(())
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs) -> anyhow::Result<()> {
    let config = Config::load()?;

    match args.command {
        ModelsCommand::Download { model } => {
            let name = model.unwrap_or_else(|| config.model.name.clone());
            let variant = find_variant(&name)?;

            let client = reqwest::Client::new();
            download_variant(variant, &config.model_dir(), &client).await?;

            if name != config.model.name {
                println!(
                    "Downloaded {}. Select it with: wdtag config set model.name {}",
                    name, name
                );
            }
            tracing::info!("All downloads complete.");
        }

        ModelsCommand::List => {
            let model_dir = config.model_dir();

            println!("Models:");
            println!("  Directory: {}\n", model_dir.display());

            for variant in VARIANTS {
                let status = if is_installed(&model_dir, variant) {
                    "ready"
                } else {
                    "not installed"
                };
                let default_marker = if variant.name == config.model.name {
                    "  (selected)"
                } else {
                    ""
                };
                println!("    - {:30} {:14}{}", variant.name, status, default_marker);
                println!("      {}", variant.label);
            }

            if !VARIANTS.iter().any(|v| v.name == config.model.name) {
                let status = if config.model_path().exists() && config.labels_path().exists() {
                    "ready"
                } else {
                    "not installed"
                };
                println!(
                    "    - {:30} {:14}  (selected, custom)",
                    config.model.name, status
                );
            }
        }

        ModelsCommand::Path => {
            println!("{}", config.model_dir().display());
        }
    }

    Ok(())
}

/// Download a file from a URL to a local path, streaming to disk.
///
/// Data goes to a `.part` file first and is renamed into place once complete,
/// so an interrupted download is retried on the next run.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    let part = part_path(dest);
    let mut file = tokio::fs::File::create(&part).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&part).await;
                anyhow::bail!("Download of {url} interrupted: {e}");
            }
        };
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size {
            if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                tracing::info!(
                    "  Progress: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            }
        }
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&part, dest).await?;

    Ok(())
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_variant() {
        assert_eq!(
            find_variant("wd-vit-large-tagger-v3").unwrap().repo,
            "SmilingWolf/wd-vit-large-tagger-v3"
        );
        let err = find_variant("wd-swinv2").unwrap_err().to_string();
        assert!(err.contains("wd-vit-tagger-v3"), "hint lists known models: {err}");
    }

    #[test]
    fn test_file_urls() {
        let variant = find_variant("wd-vit-tagger-v3").unwrap();
        assert_eq!(
            file_url(variant, MODEL_FILENAME),
            "https://huggingface.co/SmilingWolf/wd-vit-tagger-v3/resolve/main/model.onnx"
        );
        assert_eq!(
            file_url(variant, LABELS_FILENAME),
            "https://huggingface.co/SmilingWolf/wd-vit-tagger-v3/resolve/main/selected_tags.csv"
        );
    }

    #[test]
    fn test_is_installed_needs_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let variant = &VARIANTS[0];
        let variant_dir = dir.path().join(variant.name);
        std::fs::create_dir_all(&variant_dir).unwrap();

        std::fs::write(variant_dir.join(MODEL_FILENAME), b"onnx").unwrap();
        assert!(!is_installed(dir.path(), variant));

        std::fs::write(variant_dir.join(LABELS_FILENAME), b"name,category\n").unwrap();
        assert!(is_installed(dir.path(), variant));
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/m/wd/model.onnx")),
            PathBuf::from("/m/wd/model.onnx.part")
        );
    }

    #[test]
    fn test_default_model_is_known() {
        assert!(find_variant(&Config::default().model.name).is_ok());
    }
}
