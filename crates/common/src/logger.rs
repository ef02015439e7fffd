use crate::error::TwinTreeError;
use std::path::Path;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log to stderr and to `<log_dir>/twintree.log`
///
/// `log_level` is an `EnvFilter` directive; `RUST_LOG` overrides it.
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<(), TwinTreeError> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            TwinTreeError::config(format!(
                "Failed to create log directory {}: {}",
                log_dir.display(),
                e
            ))
        })?;
    }

    let log_file_path = log_dir.join("twintree.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .map_err(|e| {
            TwinTreeError::config(format!(
                "Failed to open log file {}: {}",
                log_file_path.display(),
                e
            ))
        })?;

    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };

    // Console goes to stderr so JSON on stdout stays clean
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter());

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::FULL)
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| TwinTreeError::config(format!("Logging already initialized: {}", e)))?;

    tracing::info!("Logging initialized: level={}, log_file={}", log_level, log_file_path.display());

    Ok(())
}

/// Log to stderr only
pub fn setup_console_logging(log_level: &str) -> Result<(), TwinTreeError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| TwinTreeError::config(format!("Logging already initialized: {}", e)))?;

    tracing::debug!("Console logging initialized: level={}", log_level);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_rejects_unusable_dir() {
        // A plain file where the log directory should be
        let path = std::env::temp_dir().join(format!("twintree-log-{}", std::process::id()));
        std::fs::write(&path, b"").unwrap();

        let err = setup_logging(&path, "info").unwrap_err();
        assert_eq!(err.kind(), "config");

        std::fs::remove_file(&path).unwrap();
    }
}
