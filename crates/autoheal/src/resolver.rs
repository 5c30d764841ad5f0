//! Self-healing element resolution.
//!
//! [`LocatorResolver`] turns a logical name plus a call-site locator into an
//! element handle:
//!
//! 1. A stored locator for the name takes precedence over the call site.
//! 2. The chosen locator gets one wait-until-present attempt.
//! 3. On failure the configured pipeline proposes replacements; a confirmed
//!    one is checked once more before it is handed back and remembered.
//!
//! # Example
//!
//! ```no_run
//! use autoheal::mock::{MockDriver, MockElement};
//! use autoheal::{HealConfig, Locator, LocatorResolver};
//!
//! let driver = MockDriver::new()
//!     .with_element(MockElement::new("button").with_attr("id", "login-btn-primary"));
//! let mut resolver = LocatorResolver::new(driver, HealConfig::default());
//! resolver.navigate("http://localhost:8000/login")?;
//! let _button = resolver.find("login_button", &Locator::css("#login-btn-primary"))?;
//! let metrics = resolver.finish()?;
//! assert_eq!(metrics.locators_failed, 0);
//! # Ok::<(), autoheal::HealError>(())
//! ```

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{HealConfig, HealMode};
use crate::diagnostics::{self, PageDiagnostics};
use crate::driver::Driver;
use crate::fuzzy::FuzzyPipeline;
use crate::locator::Locator;
use crate::metrics::{MetricsSnapshot, ResolutionMetrics};
use crate::pipeline::{HealOutcome, HealRequest, RuleBasedPipeline};
use crate::result::{HealError, HealResult};
use crate::store::{capture_attributes, LocatorRecord, LocatorStore};
use crate::wait::WaitOptions;

/// Resolves logical element names, healing broken locators on the way
#[derive(Debug)]
pub struct LocatorResolver<D: Driver> {
    driver: D,
    config: HealConfig,
    store: LocatorStore,
    metrics: ResolutionMetrics,
    diagnostics_pending: bool,
    last_diagnostics: Option<PageDiagnostics>,
}

impl<D: Driver> LocatorResolver<D> {
    /// Create a resolver, loading the locator memory named by `config`
    pub fn new(driver: D, config: HealConfig) -> Self {
        let store = LocatorStore::open(&config.store_path);
        info!(
            store = %store.path().display(),
            remembered = store.len(),
            mode = config.mode.as_str(),
            "Locator resolver ready"
        );
        Self {
            driver,
            config,
            store,
            metrics: ResolutionMetrics::new(),
            diagnostics_pending: false,
            last_diagnostics: None,
        }
    }

    /// Navigate the backend.
    ///
    /// Page diagnostics run before the next resolution.
    pub fn navigate(&mut self, url: &str) -> HealResult<()> {
        info!(url, "Navigating");
        self.driver.navigate(url)?;
        self.diagnostics_pending = true;
        Ok(())
    }

    /// Resolve with the configured default timeout
    pub fn find(&mut self, name: &str, locator: &Locator) -> HealResult<D::Element> {
        self.resolve(name, locator, self.config.default_timeout())
    }

    /// Resolve `name`, trying `locator` unless a stored one exists.
    ///
    /// `timeout` bounds each attempt separately, so a fully exhausted chain
    /// waits once per candidate plus once for the original.
    ///
    /// # Errors
    ///
    /// [`HealError::Unresolved`] when neither the original locator nor any
    /// healed candidate yields an element.
    pub fn resolve(
        &mut self,
        name: &str,
        locator: &Locator,
        timeout: Duration,
    ) -> HealResult<D::Element> {
        self.run_pending_diagnostics();
        self.metrics.record_try();

        let wait = self.config.wait_options(Some(timeout));
        let previous = self.store.get(name).cloned();
        let attempted = match &previous {
            Some(record) if record.locator != *locator => {
                info!(
                    name,
                    stored = %record.locator,
                    requested = %locator,
                    "Using stored locator instead of call-site locator"
                );
                record.locator.clone()
            }
            Some(record) => {
                debug!(name, locator = %record.locator, "Using stored locator");
                record.locator.clone()
            }
            None => {
                debug!(name, locator = %locator, "Using initial locator");
                locator.clone()
            }
        };

        match self.driver.wait_until_present(&attempted, &wait) {
            Ok(element) => {
                let record = LocatorRecord::carried_over(attempted, previous.as_ref())
                    .with_attributes(capture_attributes(&element));
                self.store.set(name, record);
                Ok(element)
            }
            Err(e) => {
                if e.is_heal_trigger() {
                    warn!(
                        name,
                        locator = %attempted,
                        kind = e.kind(),
                        error = %e,
                        "Primary locator failed"
                    );
                } else {
                    error!(
                        name,
                        locator = %attempted,
                        kind = e.kind(),
                        error = %e,
                        "Backend error on primary locator, healing anyway"
                    );
                }
                self.metrics.record_failure();
                self.heal(name, &attempted, previous.as_ref(), wait)
            }
        }
    }

    fn heal(
        &mut self,
        name: &str,
        failed: &Locator,
        previous: Option<&LocatorRecord>,
        wait: WaitOptions,
    ) -> HealResult<D::Element> {
        self.metrics.record_heal_attempt();
        let request = HealRequest::new(name, failed, previous, wait);
        let outcome = match self.config.mode {
            HealMode::RuleBased => RuleBasedPipeline::new().heal(&self.driver, &request),
            HealMode::Fuzzy => FuzzyPipeline::new().heal(&self.driver, &request),
        };

        let tried = outcome.tried();
        let candidate = match outcome {
            HealOutcome::Healed { candidate, .. } => candidate,
            exhausted @ HealOutcome::Exhausted { .. } => {
                let last = exhausted.last_attempted(failed);
                error!(name, locator = %failed, last = %last, tried, "Could not heal locator");
                self.metrics.record_heal_failure();
                return Err(HealError::unresolved(name, last, tried));
            }
        };
        info!(
            name,
            locator = %candidate.locator,
            reason = %candidate.reason,
            "Healed locator"
        );

        match self.driver.wait_until_present(&candidate.locator, &wait) {
            Ok(element) => {
                let record = LocatorRecord::healed(candidate.locator, candidate.reason)
                    .with_attributes(capture_attributes(&element));
                self.store.set(name, record);
                self.metrics.record_heal_success();
                Ok(element)
            }
            Err(e) => {
                error!(
                    name,
                    locator = %candidate.locator,
                    error = %e,
                    "Healed element disappeared before use"
                );
                self.metrics.record_heal_failure();
                Err(HealError::unresolved(name, candidate.locator, tried))
            }
        }
    }

    fn run_pending_diagnostics(&mut self) {
        if std::mem::take(&mut self.diagnostics_pending) {
            self.last_diagnostics = Some(diagnostics::inspect(&self.driver));
        }
    }

    /// Findings of the most recent page check
    #[must_use]
    pub const fn last_diagnostics(&self) -> Option<&PageDiagnostics> {
        self.last_diagnostics.as_ref()
    }

    /// Current counters
    #[must_use]
    pub const fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Locator memory
    #[must_use]
    pub const fn store(&self) -> &LocatorStore {
        &self.store
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &HealConfig {
        &self.config
    }

    /// Backend
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Backend, for operations the resolver does not cover
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Export metrics, shut the backend down and return the final counters.
    ///
    /// A failed metrics write is logged; only a failing `quit` is an error.
    pub fn finish(mut self) -> HealResult<MetricsSnapshot> {
        let snapshot = self.metrics.snapshot();
        match snapshot.save_json(&self.config.metrics_path) {
            Ok(()) => info!(
                path = %self.config.metrics_path.display(),
                tried = snapshot.locators_tried,
                healed = snapshot.heals_succeeded,
                "Metrics written"
            ),
            Err(e) => warn!(
                path = %self.config.metrics_path.display(),
                error = %e,
                "Failed to save metrics"
            ),
        }
        self.driver.quit()?;
        Ok(snapshot)
    }
}
