use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::types::Settings;

/// Config file looked up when none is given explicitly.
pub const DEFAULT_CONFIG_FILE: &str = "densify.yaml";

/// Load settings from a YAML file.
///
/// - An explicitly given path must exist.
/// - The default `densify.yaml` is optional; when absent the built-in defaults apply.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(p) => {
            if !p.is_file() {
                bail!("Config not found: '{}'", p.display());
            }
            read_settings(p)
        }
        None => {
            let p = Path::new(DEFAULT_CONFIG_FILE);
            if p.is_file() {
                read_settings(p)
            } else {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Ok(Settings::default())
            }
        }
    }
}

/// Parse settings from YAML content. Omitted sections and keys take defaults.
pub fn parse_settings(content: &str) -> Result<Settings> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings =
        serde_yaml::from_str(content).context("Failed to parse settings YAML")?;
    Ok(settings)
}

fn read_settings(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    tracing::info!(path = %path.display(), "Loaded settings");
    parse_settings(&content)
}
