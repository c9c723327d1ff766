use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::Config;
use crate::error::Result;

/// Install the global subscriber: a colored console layer on stderr and a
/// plain-text layer appending to the log file, each with its own level.
///
/// Stdout stays free for the JSON output.
pub fn init(config: &Config) -> Result<()> {
    if let Some(parent) = config.log_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(config.console_log_level);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(config.file_log_level);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    Ok(())
}
