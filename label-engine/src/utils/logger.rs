//! Logging Infrastructure
//!
//! Logs go to stderr so stdout stays free for the CLI's JSON output, or to a
//! daily rolling file when a log directory is configured. `RUST_LOG` wins
//! over the configured level.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize the logger with optional file output
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.is_dir()
            && let Some(dir_str) = log_path.to_str()
        {
            let file_appender = tracing_appender::rolling::daily(dir_str, "label-engine.log");
            subscriber
                .with_ansi(false)
                .with_writer(file_appender)
                .init();
            return;
        }
        eprintln!("LOG_DIR {} is not a directory, logging to stderr", dir);
    }

    subscriber.with_writer(std::io::stderr).init();
}
