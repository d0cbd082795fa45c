//! Configuration for the grove frame pipeline.
//!
//! Settings persist to disk as RON, accept CLI overrides via clap, and
//! detect changes on reload. Every section defaults field by field, so old
//! files keep loading as new settings appear.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, CostModel, DebugSettings, LodSettings, QualitySettings, SimulationSettings,
    default_config_dir,
};
pub use error::ConfigError;
