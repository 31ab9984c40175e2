//! Logging setup for the binary.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

fn filter_for(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Log to stderr. Used by the report commands.
pub fn init_stderr(verbose: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose))
        .with_target(verbose >= 2)
        .with_writer(std::io::stderr)
        .try_init();
    debug!("typecoach started with verbosity level: {}", verbose);
}

/// Log to a file so the terminal UI is left alone. Falls back to no logging
/// when the file cannot be opened.
pub fn init_file(verbose: u8, path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose))
        .with_target(verbose >= 2)
        .with_line_number(verbose >= 3)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    debug!("typecoach started with verbosity level: {}", verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}
