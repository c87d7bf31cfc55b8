use std::path::Path;

use calboard_core::Config;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration, or a single value
    Show {
        /// Config key (e.g. "calendar.calendar_id", "sync.interval_secs")
        key: Option<String>,
    },
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
}

pub fn run(
    explicit: Option<&Path>,
    action: ConfigAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show { key: Some(key) } => {
            let (_, config) = super::load_config(explicit)?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown or unset key: {key}").into()),
            }
        }
        ConfigAction::Show { key: None } => {
            let (_, config) = super::load_config(explicit)?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Init { force } => {
            let path = super::config_path(explicit)?;
            if path.exists() && !force {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )
                .into());
            }
            Config::default().save(&path)?;
            println!("wrote {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", super::config_path(explicit)?.display());
        }
    }
    Ok(())
}
