//! Game configuration, read from a RON file at startup.
//!
//! Every section and field is optional; anything left out takes its default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::level::LevelConfig;
use crate::physics::controller::ControllerOptions;
use crate::player::CameraOptions;

/// Where [`GameConfig::load_or_default`] looks when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "assets/course.ron";

/// Errors from reading the game configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Everything tunable about a session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub level: LevelConfig,
    pub controller: ControllerOptions,
    pub camera: CameraOptions,
}

impl GameConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<GameConfig, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Reads the configuration at `path`.
    pub fn load(path: &Path) -> Result<GameConfig, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        GameConfig::from_ron(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Reads the configuration at `path`, or uses the defaults if there is no
    /// file there. A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<GameConfig, ConfigError> {
        match GameConfig::load(path) {
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(GameConfig::default())
            }
            result => result,
        }
    }

    /// Inserts every section as a resource.
    pub fn insert_into(self, app: &mut App) {
        app.insert_resource(self.level)
            .insert_resource(self.controller)
            .insert_resource(self.camera);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Archetype;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = GameConfig::from_ron("()").unwrap();

        assert_eq!(config.level, LevelConfig::default());
        assert_eq!(config.controller.fall_height, -4.0);
        assert_eq!(config.camera.rate, 5.0);
    }

    #[test]
    fn partial_sections() {
        let config = GameConfig::from_ron(
            "(
                level: (segment_count: 3, archetypes: [Spinner]),
                controller: (jump_impulse: 0.8),
            )",
        )
        .unwrap();

        assert_eq!(config.level.segment_count(), 3);
        assert_eq!(config.level.archetypes(), &[Archetype::Spinner]);
        assert_eq!(config.controller.jump_impulse, 0.8);
        assert_eq!(config.controller.impulse_strength, 0.6);
    }

    #[test]
    fn empty_archetypes_rejected() {
        assert!(GameConfig::from_ron("(level: (archetypes: []))").is_err());
    }

    #[test]
    fn missing_file_falls_back() {
        let path = Path::new("this/does/not/exist.ron");
        assert!(matches!(GameConfig::load(path), Err(ConfigError::Io { .. })));
        assert!(GameConfig::load_or_default(path).is_ok());
    }

    #[test]
    fn shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = GameConfig::load(&path).unwrap();
        assert!(!config.level.archetypes().is_empty());
    }
}
