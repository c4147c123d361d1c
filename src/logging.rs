use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;

/// Route log records to a file under the user's data dir. The terminal
/// belongs to the UI, so nothing ever goes to stdout/stderr while the
/// alternate screen is active.
pub fn init(verbose: bool) -> Result<()> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path()?)
        .context("open log file")?;

    fern::Dispatch::new()
        .level(level)
        .format(|out, message, record| {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            out.finish(format_args!(
                "[{}] [{}] [{}] {}",
                timestamp,
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(log_file)
        .apply()
        .context("install logger")?;
    Ok(())
}

fn log_path() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .context("could not determine data directory")?
        .join("lxrview");
    std::fs::create_dir_all(&dir).context("create log directory")?;
    Ok(dir.join("lxrview.log"))
}
