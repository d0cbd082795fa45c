//! grove: headless frame scheduling and LOD host.
//!
//! Run with: `cargo run -p grove-app -- --entities 2000 --frames 3600`

use std::process::ExitCode;

use clap::Parser;
use grove_app::App;
use grove_config::{CliArgs, Config, default_config_dir};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone() {
        Some(dir) => dir,
        None => match default_config_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("grove: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    // Logging is not up yet, so load problems go to stderr.
    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("grove: {e}; using defaults");
            Config::default()
        }
    };
    config.apply_cli_overrides(&args);

    grove_log::init_logging(
        Some(&config_dir.join("logs")),
        cfg!(debug_assertions),
        Some(&config),
    );

    info!("grove starting (config dir {})", config_dir.display());

    let mut app = match App::new(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let summary = app.run();
    info!(
        "Ran {} frames in {:.1}s, {} quality adjustments, {} task failures, cull at {:.1}m",
        summary.frames,
        summary.elapsed,
        summary.adjustments,
        summary.task_failures,
        summary.distances.cull
    );
    if let Some(fps) = summary.average_fps {
        info!("Final rolling average: {fps:.1} fps");
    }

    ExitCode::SUCCESS
}
