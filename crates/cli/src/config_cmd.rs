use anyhow::{Context, Result};

use crate::config::{LoadedConfig, config_path};

/// Show the effective config and where it came from.
pub fn show_config(loaded: &LoadedConfig) -> Result<()> {
    match &loaded.path {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => match config_path() {
            Ok(path) => println!("# Defaults ({} not found)", path.display()),
            Err(_) => println!("# Defaults"),
        },
    }
    let rendered =
        toml::to_string_pretty(&loaded.config).context("Failed to serialize config")?;
    print!("{rendered}");
    Ok(())
}
