//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// grove command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "grove", about = "Headless frame scheduling and LOD host")]
pub struct CliArgs {
    /// Number of wandering entities.
    #[arg(long)]
    pub entities: Option<u32>,

    /// Frames to run (0 = until interrupted).
    #[arg(long)]
    pub frames: Option<u64>,

    /// LOD preset: normal or close-up.
    #[arg(long)]
    pub preset: Option<String>,

    /// Target frame rate for adaptive quality.
    #[arg(long)]
    pub target_fps: Option<f32>,

    /// Disable adaptive quality.
    #[arg(long)]
    pub no_adaptive: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(n) = args.entities {
            self.simulation.entity_count = n;
        }
        if let Some(frames) = args.frames {
            self.simulation.frames = frames;
        }
        if let Some(ref preset) = args.preset {
            self.lod.preset = preset.clone();
        }
        if let Some(fps) = args.target_fps {
            self.quality.target_fps = fps;
        }
        if args.no_adaptive {
            self.quality.enabled = false;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            entities: Some(5000),
            preset: Some("close-up".to_string()),
            no_adaptive: true,
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.simulation.entity_count, 5000);
        assert_eq!(config.lod.preset, "close-up");
        assert!(!config.quality.enabled);
        // Non-overridden fields retain defaults
        assert_eq!(config.simulation.frames, 1800);
        assert_eq!(config.quality.target_fps, 60.0);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::parse_from([
            "grove",
            "--entities",
            "12",
            "--no-adaptive",
            "--target-fps",
            "144",
        ]);
        assert_eq!(args.entities, Some(12));
        assert!(args.no_adaptive);
        assert_eq!(args.target_fps, Some(144.0));
        assert!(args.config.is_none());
    }
}
