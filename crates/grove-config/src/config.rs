//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_NAME: &str = "grove";
const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Level-of-detail classification.
    pub lod: LodSettings,
    /// Adaptive quality feedback.
    pub quality: QualitySettings,
    /// Headless host simulation.
    pub simulation: SimulationSettings,
    /// Debug/development settings.
    pub debug: DebugSettings,
}

/// LOD classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodSettings {
    /// Preset name: "normal" or "close-up".
    pub preset: String,
    /// Cull entities outside the view frustum.
    pub frustum_culling: bool,
}

/// Adaptive quality controller settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualitySettings {
    /// Sample frame times and rescale LOD distances.
    pub enabled: bool,
    /// Frame rate the session aims for.
    pub target_fps: f32,
    /// Average FPS below which distances shrink.
    pub min_fps: f32,
    /// Distances grow above `target_fps * surplus_ratio`.
    pub surplus_ratio: f32,
    pub shrink_factor: f32,
    pub growth_factor: f32,
    /// Lowest allowed `[high, medium, low, cull]` distances.
    pub floors: [f32; 4],
    /// Frame-time samples per evaluation.
    pub window: usize,
}

/// Synthetic per-entity frame cost in milliseconds, by tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CostModel {
    /// Fixed cost of a frame with nothing in it.
    pub base_ms: f32,
    pub high_ms: f32,
    pub medium_ms: f32,
    pub low_ms: f32,
}

/// Headless host settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    /// Number of wandering entities.
    pub entity_count: u32,
    /// Frames to run; 0 runs until interrupted.
    pub frames: u64,
    /// Radius of the walkable world around the origin.
    pub world_radius: f32,
    /// Camera orbit radius around the origin.
    pub camera_orbit_radius: f32,
    /// Camera orbit speed in radians per second.
    pub camera_orbit_speed: f32,
    /// Wander decisions per second.
    pub decision_hz: f64,
    /// Seconds between stats log lines.
    pub stats_interval_s: f64,
    /// Edge length of walkability cache cells.
    pub walkable_cell_size: f32,
    /// Seconds between close-up camera toggles; 0 disables.
    pub close_up_toggle_s: f64,
    /// Seconds between terrain reseeds; 0 disables.
    pub terrain_shift_s: f64,
    /// RNG seed for entity placement and terrain.
    pub seed: u64,
    /// Pace frames on the wall clock by sleeping for the synthetic cost,
    /// instead of advancing a simulated clock by it.
    pub realtime: bool,
    pub cost: CostModel,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugSettings {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a JSON log file next to the config in debug builds.
    pub file_logging: bool,
}

// --- Default implementations ---

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            preset: "normal".to_string(),
            frustum_culling: true,
        }
    }
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            target_fps: 60.0,
            min_fps: 30.0,
            surplus_ratio: 1.2,
            shrink_factor: 0.8,
            growth_factor: 1.05,
            floors: [2.0, 4.0, 8.0, 16.0],
            window: 60,
        }
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            base_ms: 4.0,
            high_ms: 0.12,
            medium_ms: 0.05,
            low_ms: 0.015,
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            entity_count: 400,
            frames: 1800,
            world_radius: 150.0,
            camera_orbit_radius: 40.0,
            camera_orbit_speed: 0.15,
            decision_hz: 10.0,
            stats_interval_s: 1.0,
            walkable_cell_size: 2.0,
            close_up_toggle_s: 12.0,
            terrain_shift_s: 0.0,
            seed: 7,
            realtime: false,
            cost: CostModel::default(),
        }
    }
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            file_logging: false,
        }
    }
}

/// Platform config directory for grove, e.g. `~/.config/grove` on Linux.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("preset: \"normal\""));
        assert!(ron_str.contains("entity_count: 400"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(lod: (preset: \"close-up\"))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.lod.preset, "close-up");
        assert!(config.lod.frustum_culling);
        assert_eq!(config.quality, QualitySettings::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.simulation.entity_count = 2000;
        config.quality.floors = [1.0, 3.0, 6.0, 12.0];

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.quality.enabled = false;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(!result.unwrap().quality.enabled);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
