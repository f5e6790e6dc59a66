// Configuration loader
// Loads settings from ~/.parley/config.toml (or an explicit path) and
// applies environment overrides

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::CONFIG_DIR_NAME;
use super::settings::Config;

/// Default location of the config file, if a home directory exists
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join("config.toml"))
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, ~/.parley/config.toml is
/// used when present and built-in defaults otherwise. `PARLEY_TIMEOUT_SECS`
/// and `PARLEY_UI_ADDR` override whatever the file says.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Configuration file not found: {}", path.display());
            }
            read_config_file(path)?
        }
        None => match default_config_path() {
            Some(path) if path.exists() => read_config_file(&path)?,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut Config, var: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(secs) = var("PARLEY_TIMEOUT_SECS").filter(|s| !s.is_empty()) {
        config.broker.timeout_secs = secs
            .trim()
            .parse()
            .with_context(|| format!("PARLEY_TIMEOUT_SECS is not a number: {}", secs))?;
    }
    if let Some(addr) = var("PARLEY_UI_ADDR").filter(|s| !s.is_empty()) {
        config.ui_host.bind_address = addr;
    }
    Ok(())
}
