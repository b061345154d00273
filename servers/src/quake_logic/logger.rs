use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::LevelFilter;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const LOG_PREFIX: &str = "server_quake";
/// Log files from earlier runs that survive startup.
const KEEP_PREVIOUS_RUNS: usize = 1;

/// Console plus a per-run file in `log_dir`, filtered at `log_level`.
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<()> {
    fs::create_dir_all(log_dir).with_context(|| format!("Cannot create log directory {}", log_dir.display()))?;
    prune_logs(log_dir, KEEP_PREVIOUS_RUNS)?;

    let log_path = log_dir.join(log_file_name(Local::now()));
    let log_file = fern::log_file(&log_path).with_context(|| format!("Cannot open {}", log_path.display()))?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level_filter(log_level))
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()?;

    log::info!("Logging at {} to {}", level_filter(log_level), log_path.display());
    Ok(())
}

fn log_file_name(started: DateTime<Local>) -> String {
    format!("{}_{}.log", LOG_PREFIX, started.format("%Y-%m-%d_%H-%M-%S"))
}

// Unknown names fall back to info rather than failing startup.
fn level_filter(log_level: &str) -> LevelFilter {
    log_level.parse().unwrap_or(LevelFilter::Info)
}

/// Deletes all but the `keep` most recently modified `.log` files in `log_dir`.
fn prune_logs(log_dir: &Path, keep: usize) -> Result<()> {
    let mut logs: Vec<(SystemTime, PathBuf)> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();

    logs.sort_unstable_by(|a, b| b.0.cmp(&a.0));

    for (_, stale) in logs.into_iter().skip(keep) {
        if let Err(e) = fs::remove_file(&stale) {
            eprintln!("Failed to delete old log file {}: {}", stale.display(), e);
        }
    }
    Ok(())
}
