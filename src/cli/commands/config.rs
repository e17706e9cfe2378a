//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: &Settings, path: Option<&str>) -> Result<()> {
    let config_path = path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Init => init_config(settings, &config_path)?,

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

fn init_config(settings: &Settings, config_path: &PathBuf) -> Result<()> {
    if config_path.exists() {
        Output::warning(&format!("Config already exists at {}", config_path.display()));
        Output::info("Edit it directly or remove it to start over.");
        return Ok(());
    }

    settings.save_to(config_path)?;
    Output::success(&format!("Created config at {}", config_path.display()));
    Ok(())
}
