// SPDX-License-Identifier: GPL-3.0-only

//! User configuration

use crate::constants::{DEFAULT_FPS, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::sinks::SinkKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Persistent settings, stored as JSON under the user config dir
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which sink variant to open and how to reach it
    pub sink: SinkKind,
    /// Output resolution width (must be even)
    pub width: u32,
    /// Output resolution height (must be even)
    pub height: u32,
    /// Frame cadence
    pub fps: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
        }
    }
}

impl Config {
    /// Default on-disk location (`~/.config/vcam/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vcam").join("config.json"))
    }

    /// Load from the given path, falling back to defaults on any error
    ///
    /// A missing file is normal on first run; a malformed one is logged
    /// and replaced by defaults rather than aborting the app.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Load from the default location, or defaults if it is unavailable
    pub fn load_default() -> Self {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Self::default(),
        }
    }

    /// Persist to the given path, creating parent directories as needed
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_streamable() {
        let config = Config::default();
        assert_eq!(config.width % 2, 0);
        assert_eq!(config.height % 2, 0);
        assert!(config.fps > 0);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/vcam/config.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config {
            sink: SinkKind::Device {
                path: PathBuf::from("/dev/video10"),
            },
            width: 1920,
            height: 1080,
            fps: 60,
        };
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path), config);
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert_eq!(Config::load(&path), Config::default());
    }
}
