//! Process-wide logging setup.
//!
//! Constructing a resolver never touches global state; call [`init`] once at
//! program start to see its events.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogDestination};
use crate::result::{HealError, HealResult};

/// Environment variable that overrides the configured level
pub const LOG_ENV_VAR: &str = "RUST_LOG";

/// Install the global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from
/// [`LogConfig::level`]. File destinations are opened in append mode and
/// their parent directory is created.
///
/// # Errors
///
/// [`HealError::Config`] for an invalid filter or when a global subscriber
/// is already installed; [`HealError::Io`] when the log file cannot be opened.
pub fn init(config: &LogConfig) -> HealResult<()> {
    let filter = build_filter(&config.level, std::env::var(LOG_ENV_VAR).ok())?;
    let (writer, ansi) = match config.destination() {
        LogDestination::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogDestination::File(path) => (BoxMakeWriter::new(Mutex::new(open_log_file(&path)?)), false),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| HealError::config(format!("cannot install log subscriber: {e}")))
}

fn build_filter(level: &str, env_override: Option<String>) -> HealResult<EnvFilter> {
    let directive = env_override
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| level.to_string());
    EnvFilter::try_new(&directive)
        .map_err(|e| HealError::config(format!("invalid log filter '{directive}': {e}")))
}

fn open_log_file(path: &Path) -> HealResult<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filter_from_level() {
        assert!(build_filter("debug", None).is_ok());
        assert!(build_filter("autoheal=trace,warn", None).is_ok());
    }

    #[test]
    fn test_env_override_wins() {
        let err = build_filter("info", Some("[[bad".to_string())).unwrap_err();
        assert!(err.to_string().contains("[[bad"));
        assert!(build_filter("[[bad", Some("warn".to_string())).is_ok());
        assert!(build_filter("warn", Some("  ".to_string())).is_ok());
    }

    #[test]
    fn test_log_file_parent_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("auto_heal.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_second_init_is_rejected() {
        let config = LogConfig::new().with_level("warn");
        // The first call may find a subscriber already installed; the second
        // can never succeed.
        let _ = init(&config);
        assert!(matches!(init(&config), Err(HealError::Config { .. })));
    }
}
