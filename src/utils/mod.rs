// src/utils/mod.rs
use log::{info, LevelFilter};

pub mod timing;

/// Maps a `LOG_LEVEL` value to a filter, falling back to `Info` for anything unknown.
pub fn parse_level_filter(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

pub fn setup_logging(level: &str) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(parse_level_filter(level))
        .chain(std::io::stdout())
        .apply()?;
    info!("Logging initialized.");
    Ok(())
}
