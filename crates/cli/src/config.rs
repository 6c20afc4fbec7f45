use anyhow::{Context, Result};
use directories::ProjectDirs;
use gridguide_runtime_config::{CONFIG_FILE_NAME, GuideConfig, apply_compat_fallbacks};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Effective configuration and the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: GuideConfig,
    pub path: Option<PathBuf>,
}

/// Get the config directory path (e.g. ~/.config/gridguide/)
pub fn config_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "gridguide")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().to_path_buf())
}

/// Canonical config file path.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

fn read_config_doc(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let doc = toml::from_str::<toml::Value>(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;
    Ok(doc)
}

fn load_config_from_doc(doc: &toml::Value, path: &Path) -> GuideConfig {
    let mut config = match doc.clone().try_into::<GuideConfig>() {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring config at {}: {}", path.display(), e);
            GuideConfig::default()
        }
    };
    if apply_compat_fallbacks(&mut config) {
        warn!(
            "Config at {} has out-of-range values, defaults were used for them",
            path.display()
        );
    }
    config
}

fn load_from_path(path: &Path) -> Result<LoadedConfig> {
    let doc = read_config_doc(path)?;
    Ok(LoadedConfig {
        config: load_config_from_doc(&doc, path),
        path: Some(path.to_path_buf()),
    })
}

/// Load `explicit` (which must exist), else the user config file when
/// present, else defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }
    match config_path() {
        Ok(path) if path.exists() => load_from_path(&path),
        _ => Ok(LoadedConfig {
            config: GuideConfig::default(),
            path: None,
        }),
    }
}
