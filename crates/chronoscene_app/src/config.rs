// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene description loaded at startup.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current scene description format version
pub const SCENE_FORMAT_VERSION: u32 = 1;

/// One data source composed into the scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Data source identifier
    pub source: u32,
    /// Start of the covered time range
    pub start: DateTime<Utc>,
    /// End of the covered time range
    pub end: DateTime<Utc>,
    /// Sampling cadence in seconds
    pub cadence_seconds: i64,
    /// Stacking order among overlapping objects
    pub layer_order: usize,
}

/// Complete scene description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Description format version
    pub version: u32,
    /// Sources composed into the scene
    pub sources: Vec<SourceConfig>,
    /// Image resolution the scale lookup maps per source
    pub resolution: u32,
    /// Number of timeline steps scrubbed across the scene range
    pub playback_steps: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 2, 0).unwrap();
        Self {
            version: SCENE_FORMAT_VERSION,
            sources: vec![
                SourceConfig {
                    source: 11,
                    start,
                    end,
                    cadence_seconds: 10,
                    layer_order: 0,
                },
                SourceConfig {
                    source: 14,
                    start,
                    end,
                    cadence_seconds: 15,
                    layer_order: 1,
                },
            ],
            resolution: 2048,
            playback_steps: 24,
        }
    }
}

impl SceneConfig {
    /// Load a scene description from a RON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SceneConfig = ron::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        if config.version > SCENE_FORMAT_VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Scene version {} is newer than supported version {}",
                    config.version, SCENE_FORMAT_VERSION
                ),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SceneConfig::default();
        assert_eq!(config.version, SCENE_FORMAT_VERSION);
        assert_eq!(config.sources.len(), 2);
        assert!(config.playback_steps > 0);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = SceneConfig::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        let loaded: SceneConfig = ron::from_str(&ron_str).unwrap();
        assert_eq!(loaded.sources.len(), config.sources.len());
        assert_eq!(loaded.resolution, config.resolution);
    }
}
