//! Resolution counters.
//!
//! One [`ResolutionMetrics`] per resolver. Counters only ever go up; the
//! exported [`MetricsSnapshot`] is a plain copy written as JSON at shutdown.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::result::HealResult;

/// Immutable copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// `resolve` calls
    pub locators_tried: u64,
    /// Resolutions whose first locator failed
    pub locators_failed: u64,
    /// Healing pipeline invocations
    pub heals_attempted: u64,
    /// Heals that produced a usable element
    #[serde(alias = "heals_successful")]
    pub heals_succeeded: u64,
    /// Heals that ended without an element
    pub heals_failed: u64,
}

impl MetricsSnapshot {
    /// Fraction of attempted heals that succeeded, if any were attempted
    #[must_use]
    pub fn heal_success_rate(&self) -> Option<f64> {
        (self.heals_attempted > 0).then(|| self.heals_succeeded as f64 / self.heals_attempted as f64)
    }

    /// Write the snapshot as pretty JSON
    pub fn save_json(&self, path: &Path) -> HealResult<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, json)?;
        Ok(())
    }

    /// Read a snapshot written by [`save_json`](Self::save_json)
    pub fn load_json(path: &Path) -> HealResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Live counters for one resolver
#[derive(Debug, Default)]
pub struct ResolutionMetrics {
    counters: MetricsSnapshot,
}

impl ResolutionMetrics {
    /// Create zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolution started
    pub fn record_try(&mut self) {
        self.counters.locators_tried += 1;
    }

    /// The first locator of a resolution failed
    pub fn record_failure(&mut self) {
        self.counters.locators_failed += 1;
    }

    /// A healing pipeline was invoked
    pub fn record_heal_attempt(&mut self) {
        self.counters.heals_attempted += 1;
    }

    /// A heal ended with a usable element
    pub fn record_heal_success(&mut self) {
        self.counters.heals_succeeded += 1;
    }

    /// A heal ended without an element
    pub fn record_heal_failure(&mut self) {
        self.counters.heals_failed += 1;
    }

    /// Copy of the current counters
    #[must_use]
    pub const fn snapshot(&self) -> MetricsSnapshot {
        self.counters
    }
}
