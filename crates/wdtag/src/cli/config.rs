//! The `wdtag config` command for configuration management.

use clap::{Args, Subcommand};
use toml_edit::{value, DocumentMut, Item};
use wdtag_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Set a single value, e.g. `tagging.general_threshold 0.4`
    Set {
        /// Dotted key: `<section>.<field>`
        key: String,
        /// New value (booleans and numbers are detected automatically)
        value: String,
    },
}

/// Execute the config command.
pub fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            let toml = config.to_toml()?;
            println!("{}", toml);
        }

        ConfigCommand::Path => {
            let path = Config::default_path();
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let config = Config::default();
            let toml = config.to_toml()?;
            std::fs::write(&path, toml)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }

        ConfigCommand::Set { key, value } => {
            let path = Config::default_path();
            let current = if path.exists() {
                std::fs::read_to_string(&path)?
            } else {
                Config::default().to_toml()?
            };

            let updated = set_value(&current, &key, &value)?;

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, updated)?;
            println!("Set {} = {} in {}", key, value, path.display());
        }
    }

    Ok(())
}

/// Set `section.field` in a TOML document, preserving everything else.
///
/// The key must name a field that exists in the default configuration, and the
/// edited document must still load as a valid [`Config`].
fn set_value(content: &str, key: &str, raw: &str) -> anyhow::Result<String> {
    let (section, field) = key
        .split_once('.')
        .filter(|(s, f)| !s.is_empty() && !f.is_empty() && !f.contains('.'))
        .ok_or_else(|| anyhow::anyhow!("Key must look like `section.field`, got {key:?}"))?;

    let defaults: DocumentMut = Config::default().to_toml()?.parse()?;
    if defaults
        .get(section)
        .and_then(|t| t.get(field))
        .is_none()
    {
        anyhow::bail!(
            "Unknown config key: {key}\n\n  Hint: Run `wdtag config show` to list the available keys."
        );
    }

    let mut doc: DocumentMut = content.parse()?;
    doc[section][field] = parse_scalar(raw);
    let updated = doc.to_string();

    Config::from_toml(&updated).map_err(|e| anyhow::anyhow!("Rejected {key} = {raw}: {e}"))?;
    Ok(updated)
}

/// Interpret a command-line value as a TOML scalar.
fn parse_scalar(raw: &str) -> Item {
    if let Ok(b) = raw.parse::<bool>() {
        value(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        value(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        value(f)
    } else {
        value(raw)
    }
}
