//! Log setup
//!
//! Terraform captures a provider's stderr and shows it when `TF_LOG` is
//! set, so logs go there in plain fmt format.

use tracing_subscriber::filter::LevelFilter;

pub const LOG_ENV: &str = "TF_LOG";

/// Maps a `TF_LOG` value to a level. Unknown values fall back to `info`.
pub fn level_from_env(value: Option<&str>) -> LevelFilter {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("trace") => LevelFilter::TRACE,
        Some("debug") => LevelFilter::DEBUG,
        Some("warn") => LevelFilter::WARN,
        Some("error") => LevelFilter::ERROR,
        Some("off") => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init() {
    let level = level_from_env(std::env::var(LOG_ENV).ok().as_deref());

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .with_ansi(false)
        .try_init();
}
