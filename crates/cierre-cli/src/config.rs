//! Configuration file management for cierre.
//!
//! Provides a TOML-based config file at `~/.config/cierre/config.toml` and a
//! resolution chain for the data snapshot path:
//! CLI flag > `CIERRE_DATA` env var > config file > `./cierre.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Fallback snapshot path when nothing else is configured.
pub const DEFAULT_DATA_PATH: &str = "cierre.json";

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub data: DataSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataSection {
    /// Path to the JSON data snapshot.
    pub path: PathBuf,
}

/// Return the cierre config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/cierre` or `~/.config/cierre`,
/// ignoring the platform-specific config dir on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("cierre");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("cierre")
}

/// Return the path to the cierre config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(())
}

/// Resolve the data snapshot path: CLI flag > env var > config file > default.
pub fn resolve_data_path(cli_path: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.clone();
    }
    if let Ok(path) = std::env::var("CIERRE_DATA") {
        return PathBuf::from(path);
    }
    if let Ok(config) = load_config() {
        return config.data.path;
    }
    PathBuf::from(DEFAULT_DATA_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("cierre/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }

    #[test]
    fn cli_flag_wins_resolution() {
        let flag = PathBuf::from("/tmp/farm.json");
        assert_eq!(resolve_data_path(Some(&flag)), flag);
    }

    #[test]
    fn config_file_round_trips() {
        let original = ConfigFile {
            data: DataSection {
                path: PathBuf::from("/srv/farm/cierre.json"),
            },
        };
        let contents = toml::to_string_pretty(&original).unwrap();
        let loaded: ConfigFile = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.data.path, original.data.path);
    }
}
