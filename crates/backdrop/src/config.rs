//! Headless run configuration. Loaded from `backdrop.ron` at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::Settings;

pub const CONFIG_FILE: &str = "backdrop.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("could not serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("could not write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Surface size, run length and the look settings for a headless run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackdropConfig {
    /// Surface width in CSS pixels.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Surface height in CSS pixels.
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f32,
    /// Frames to simulate.
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Write a snapshot every this many frames (0 writes only the last).
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: u32,
    /// Terrain seed; random when absent.
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub settings: Settings,
}

fn default_width() -> u32 {
    960
}
fn default_height() -> u32 {
    540
}
fn default_device_pixel_ratio() -> f32 {
    1.0
}
fn default_frames() -> u32 {
    120
}
fn default_snapshot_every() -> u32 {
    60
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("frames")
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            device_pixel_ratio: default_device_pixel_ratio(),
            frames: default_frames(),
            snapshot_every: default_snapshot_every(),
            seed: None,
            output_dir: default_output_dir(),
            settings: Settings::default(),
        }
    }
}

impl BackdropConfig {
    /// Load `backdrop.ron` from the current directory. A missing or invalid
    /// file yields the defaults.
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            log::info!("no config at {:?}, using defaults", path);
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Load a config file, failing on I/O or parse errors.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_ron(data: &str) -> Result<Self, ron::error::SpannedError> {
        let mut config: Self = ron::from_str(data)?;
        config.settings = config.settings.clamped();
        Ok(config)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Write this config as pretty RON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let s = self.to_ron()?;
        std::fs::write(path, s).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::GlintColor;
    use procgen::BiomeKind;

    #[test]
    fn missing_fields_take_defaults() {
        let c = BackdropConfig::from_ron("(frames: 120)").unwrap();
        assert_eq!(c, BackdropConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let c = BackdropConfig::from_ron(
            "(width: 300, height: 180, seed: Some(42), settings: (biome: desert, elevation: 200.0))",
        )
        .unwrap();
        assert_eq!((c.width, c.height), (300, 180));
        assert_eq!(c.seed, Some(42));
        assert_eq!(c.settings.biome, BiomeKind::Desert);
        assert_eq!(c.settings.elevation, 85.0);
        assert_eq!(c.settings.contrast, 0.9);
        assert_eq!(c.frames, 120);
    }

    #[test]
    fn config_round_trips_through_ron() {
        let mut c = BackdropConfig::default();
        c.seed = Some(7);
        c.settings.biome = BiomeKind::Meadow;
        c.settings.glint_color = Some(GlintColor { h: 30.0, s: 90.0, l: 70.0 });
        let text = c.to_ron().unwrap();
        assert_eq!(BackdropConfig::from_ron(&text).unwrap(), c);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("backdrop-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.ron");
        std::fs::write(&path, "(width: \"wide\")").unwrap();
        assert!(matches!(BackdropConfig::load_from(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            BackdropConfig::load_from(dir.join("missing.ron")),
            Err(ConfigError::Read { .. })
        ));

        let good = dir.join("good.ron");
        BackdropConfig::default().save(&good).unwrap();
        assert_eq!(BackdropConfig::load_from(&good).unwrap(), BackdropConfig::default());
        std::fs::remove_dir_all(&dir).ok();
    }
}
