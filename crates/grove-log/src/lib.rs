//! Structured logging for grove.
//!
//! The library crates log through the `log` facade; this crate installs a
//! `tracing` subscriber that picks those records up alongside native spans.
//! Console output carries uptime timestamps and module paths, and debug builds
//! can also write JSON lines to a file for later inspection.

use std::path::Path;

use grove_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
pub const DEFAULT_FILTER: &str = "info,grove_memo=warn";

/// File name of the JSON log written in debug builds.
pub const LOG_FILE: &str = "grove.log";

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.debug.log_level`, which wins over
/// [`DEFAULT_FILTER`]. When `debug_build` is set and `config` enables file
/// logging, JSON records also go to `log_dir/grove.log`.
///
/// A second call in one process leaves the first subscriber in place and
/// reports the failure on stderr.
///
/// ```no_run
/// use grove_config::Config;
/// use grove_log::init_logging;
///
/// let config = Config::default();
/// init_logging(None, cfg!(debug_assertions), Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    if let Err(e) = try_init_logging(log_dir, debug_build, config) {
        eprintln!("logging already initialized: {e}");
    }
}

/// Like [`init_logging`], but reports an already-installed subscriber as an error.
pub fn try_init_logging(
    log_dir: Option<&Path>,
    debug_build: bool,
    config: Option<&Config>,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    let file_logging = config.is_some_and(|c| c.debug.file_logging);
    if debug_build
        && file_logging
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        return subscriber.with(file_layer).try_init();
    }

    subscriber.try_init()
}

/// The filter directive chosen from config, falling back to [`DEFAULT_FILTER`].
pub fn filter_directive(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.trim().to_string()
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// An `EnvFilter` built from [`DEFAULT_FILTER`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        let filter_str = format!("{}", default_env_filter());
        assert!(filter_str.contains("grove_memo=warn"));
        assert!(filter_str.contains("info"));
    }

    #[test]
    fn test_filter_from_config() {
        let mut config = Config::default();
        config.debug.log_level = "debug,grove_lod=trace".to_string();
        assert_eq!(filter_directive(Some(&config)), "debug,grove_lod=trace");
    }

    #[test]
    fn test_blank_level_falls_back() {
        let mut config = Config::default();
        config.debug.log_level = "  ".to_string();
        assert_eq!(filter_directive(Some(&config)), DEFAULT_FILTER);
        assert_eq!(filter_directive(None), DEFAULT_FILTER);
    }

    #[test]
    fn test_env_filter_parsing() {
        let valid_filters = [
            "info",
            "debug,grove_frame=trace",
            "warn,grove_quality=debug,grove_lod=trace",
            "error",
        ];
        for filter_str in &valid_filters {
            assert!(
                EnvFilter::try_from(*filter_str).is_ok(),
                "Failed to parse filter: {}",
                filter_str
            );
        }
    }

    #[test]
    fn test_file_logger_init() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_dir = temp_dir.path().join("logs");
        let mut config = Config::default();
        config.debug.file_logging = true;

        // Only one test in this binary installs the global subscriber.
        try_init_logging(Some(&log_dir), true, Some(&config)).unwrap();
        tracing::info!("file logger ready");
        assert!(log_dir.join(LOG_FILE).exists());
    }
}
