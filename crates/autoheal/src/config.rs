//! Resolver configuration.
//!
//! Every field has a default, so an empty YAML document is a valid config:
//!
//! ```yaml
//! store_path: locator_store.json
//! metrics_path: metrics.json
//! default_timeout_ms: 10000
//! poll_interval_ms: 500
//! mode: rule_based        # or: fuzzy
//! log:
//!   level: info
//!   json: false
//!   file: logs/auto_heal.log   # omit to log to stderr
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::locator::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::result::{HealError, HealResult};
use crate::wait::WaitOptions;

/// Which healing pipeline runs after a failed resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealMode {
    /// Memory, attribute and syntactic rules
    #[default]
    RuleBased,
    /// Edit-distance scan of attribute values
    Fuzzy,
}

impl HealMode {
    /// Config spelling of the mode
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RuleBased => "rule_based",
            Self::Fuzzy => "fuzzy",
        }
    }
}

/// Where log events go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Standard error
    Stderr,
    /// Append to a file
    File(PathBuf),
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
    /// Log file; stderr when absent
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl LogConfig {
    /// Create default logging configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter level
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Enable or disable JSON output
    #[must_use]
    pub const fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Log to a file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Resolved destination
    #[must_use]
    pub fn destination(&self) -> LogDestination {
        self.file
            .clone()
            .map_or(LogDestination::Stderr, LogDestination::File)
    }
}

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealConfig {
    /// Locator memory file
    pub store_path: PathBuf,
    /// Metrics export file
    pub metrics_path: PathBuf,
    /// Per-attempt wait budget in milliseconds
    pub default_timeout_ms: u64,
    /// Pause between presence probes in milliseconds
    pub poll_interval_ms: u64,
    /// Healing pipeline
    pub mode: HealMode,
    /// Logging
    pub log: LogConfig,
}

impl Default for HealConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("locator_store.json"),
            metrics_path: PathBuf::from("metrics.json"),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            mode: HealMode::RuleBased,
            log: LogConfig::default(),
        }
    }
}

impl HealConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> HealResult<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(yaml)
                .map_err(|e| HealError::config(format!("invalid config: {e}")))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> HealResult<Self> {
        let yaml = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&yaml)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> HealResult<String> {
        serde_yaml_ng::to_string(self)
            .map_err(|e| HealError::config(format!("cannot serialize config: {e}")))
    }

    /// Reject settings the resolver cannot run with
    pub fn validate(&self) -> HealResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(HealError::config("poll_interval_ms must be greater than zero"));
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(HealError::config("store_path must not be empty"));
        }
        if self.metrics_path.as_os_str().is_empty() {
            return Err(HealError::config("metrics_path must not be empty"));
        }
        Ok(())
    }

    /// Set the locator memory file
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Set the metrics export file
    #[must_use]
    pub fn with_metrics_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metrics_path = path.into();
        self
    }

    /// Set the default per-attempt timeout
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the polling interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the healing mode
    #[must_use]
    pub const fn with_mode(mut self, mode: HealMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set logging options
    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Default per-attempt timeout
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Polling interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Wait options for one attempt; `None` uses the default timeout
    #[must_use]
    pub fn wait_options(&self, timeout: Option<Duration>) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(timeout.unwrap_or_else(|| self.default_timeout()))
            .with_poll_interval(self.poll_interval())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod default_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = HealConfig::default();
            assert_eq!(config.store_path, PathBuf::from("locator_store.json"));
            assert_eq!(config.metrics_path, PathBuf::from("metrics.json"));
            assert_eq!(config.default_timeout(), Duration::from_secs(10));
            assert_eq!(config.poll_interval(), Duration::from_millis(500));
            assert_eq!(config.mode, HealMode::RuleBased);
            assert_eq!(config.log.level, "info");
            assert_eq!(config.log.destination(), LogDestination::Stderr);
        }

        #[test]
        fn test_wait_options() {
            let config = HealConfig::new().with_poll_interval(Duration::from_millis(20));
            let options = config.wait_options(None);
            assert_eq!(options.timeout, Duration::from_secs(10));
            assert_eq!(options.poll_interval, Duration::from_millis(20));
            let options = config.wait_options(Some(Duration::from_secs(1)));
            assert_eq!(options.timeout, Duration::from_secs(1));
        }

        #[test]
        fn test_builders() {
            let config = HealConfig::new()
                .with_store_path("a.json")
                .with_metrics_path("m.json")
                .with_default_timeout(Duration::from_millis(250))
                .with_mode(HealMode::Fuzzy)
                .with_log(LogConfig::new().with_json(true).with_file("logs/x.log"));
            assert_eq!(config.default_timeout_ms, 250);
            assert_eq!(config.mode.as_str(), "fuzzy");
            assert!(config.log.json);
            assert_eq!(
                config.log.destination(),
                LogDestination::File(PathBuf::from("logs/x.log"))
            );
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_empty_document_is_default() {
            assert_eq!(HealConfig::from_yaml_str("").unwrap(), HealConfig::default());
        }

        #[test]
        fn test_partial_document() {
            let config = HealConfig::from_yaml_str(
                "mode: fuzzy\nstore_path: stores/lev.json\nlog:\n  level: debug\n",
            )
            .unwrap();
            assert_eq!(config.mode, HealMode::Fuzzy);
            assert_eq!(config.store_path, PathBuf::from("stores/lev.json"));
            assert_eq!(config.log.level, "debug");
            assert!(!config.log.json);
            assert_eq!(config.default_timeout_ms, 10_000);
        }

        #[test]
        fn test_unknown_mode_rejected() {
            let err = HealConfig::from_yaml_str("mode: neural\n").unwrap_err();
            assert!(matches!(err, HealError::Config { .. }));
        }

        #[test]
        fn test_zero_poll_interval_rejected() {
            assert!(HealConfig::from_yaml_str("poll_interval_ms: 0\n").is_err());
        }

        #[test]
        fn test_round_trip() {
            let config = HealConfig::new()
                .with_mode(HealMode::Fuzzy)
                .with_log(LogConfig::new().with_file("logs/heal.log"));
            let yaml = config.to_yaml().unwrap();
            assert_eq!(HealConfig::from_yaml_str(&yaml).unwrap(), config);
        }

        #[test]
        fn test_load_file() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("autoheal.yaml");
            fs::write(&path, "default_timeout_ms: 1500\n").unwrap();
            let config = HealConfig::load(&path).unwrap();
            assert_eq!(config.default_timeout(), Duration::from_millis(1500));
        }

        #[test]
        fn test_load_missing_file() {
            let dir = TempDir::new().unwrap();
            let err = HealConfig::load(dir.path().join("nope.yaml")).unwrap_err();
            assert!(matches!(err, HealError::Io(_)));
        }
    }
}
