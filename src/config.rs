//! Arcade configuration (`$CONFIG_DIR/rustcade/config.toml`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ArcadeError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcadeConfig {
    /// Milliseconds between frames.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Fixed RNG seed for every game; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Registry id of a game to launch straight away.
    #[serde(default)]
    pub start_game: Option<String>,
    /// Filter directive for the log file, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How long a key counts as held when the terminal never reports release.
    #[serde(default = "default_key_release_ms")]
    pub key_release_ms: u64,
}

fn default_tick_ms() -> u64 {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_key_release_ms() -> u64 {
    150
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            seed: None,
            start_game: None,
            log_level: default_log_level(),
            key_release_ms: default_key_release_ms(),
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rustcade"))
}

pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("rustcade"))
}

pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

impl ArcadeConfig {
    /// Read `path`. A missing file yields the defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content).map_err(|source| ArcadeError::ConfigParse { path: path.to_path_buf(), source })
    }

    /// Load from `path` if given, else from the platform config directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(default_path) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ArcadeConfig::default();
        assert_eq!(config.tick_ms, 16);
        assert_eq!(config.key_release_ms, 150);
        assert_eq!(config.log_level, "info");
        assert!(config.seed.is_none());
        assert!(config.start_game.is_none());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ArcadeConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, ArcadeConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tick_ms = 33\nstart_game = \"snake\"\n").unwrap();
        let config = ArcadeConfig::load_from(&path).unwrap();
        assert_eq!(config.tick_ms, 33);
        assert_eq!(config.start_game.as_deref(), Some("snake"));
        assert_eq!(config.key_release_ms, 150);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tick_ms = \"fast\"").unwrap();
        let err = ArcadeConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ArcadeError::ConfigParse { .. }));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = ArcadeConfig { seed: Some(9), ..ArcadeConfig::default() };
        config.save_to(&path).unwrap();
        assert_eq!(ArcadeConfig::load_from(&path).unwrap(), config);
    }
}
