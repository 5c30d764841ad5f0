//! Autoheal: self-healing element locators for UI automation
//!
//! Scripts name the elements they touch (`"login_button"`) and give a
//! locator for each. When that locator stops matching, autoheal re-locates
//! the element through an ordered, explainable chain of fallbacks and
//! remembers what worked, both for the rest of the run and for later runs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      LocatorResolver                          │
//! │                                                              │
//! │  resolve(name, locator)                                      │
//! │      │                                                       │
//! │      ▼                                                       │
//! │  ┌──────────────┐  stored?   ┌───────────────┐               │
//! │  │ LocatorStore │──────────► │ wait_until_   │── found ──► ✔ │
//! │  │ (JSON file)  │            │ present       │               │
//! │  └──────────────┘            └───────┬───────┘               │
//! │         ▲                            │ failed                │
//! │         │                            ▼                       │
//! │         │               ┌─────────────────────────┐          │
//! │         │               │ RuleBasedPipeline       │          │
//! │         └── healed ──── │   memory → attributes   │          │
//! │                         │   → syntactic rewrite   │          │
//! │                         │ FuzzyPipeline           │          │
//! │                         │   edit-distance scan    │          │
//! │                         └─────────────────────────┘          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The browser is reached only through the [`Driver`] and [`Element`]
//! traits. [`mock::MockDriver`] implements them in memory.
//!
//! # Example
//!
//! ```
//! use autoheal::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> HealResult<()> {
//! let dir = tempfile::tempdir()?;
//! let config = HealConfig::new()
//!     .with_store_path(dir.path().join("locator_store.json"))
//!     .with_metrics_path(dir.path().join("metrics.json"))
//!     .with_default_timeout(Duration::ZERO);
//!
//! let page = MockDriver::new().with_element(
//!     MockElement::new("button").with_attr("id", "logout").with_text("  Sign Out "),
//! );
//! let mut resolver = LocatorResolver::new(page, config);
//!
//! // Exact text no longer matches because of the padding; the pipeline
//! // relaxes the predicate and the resolver remembers the result.
//! let button = resolver.find("logout_link", &Locator::xpath("//button[text()='Sign Out']"))?;
//! button.click()?;
//! assert!(resolver.store().get("logout_link").unwrap().healed);
//! assert_eq!(resolver.finish()?.heals_succeeded, 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[allow(clippy::missing_errors_doc)]
pub mod config;
pub mod diagnostics;
pub mod distance;
pub mod driver;
pub mod fuzzy;
#[allow(clippy::missing_errors_doc)]
pub mod metrics;
pub mod mock;
pub mod pipeline;
#[allow(clippy::missing_errors_doc)]
pub mod resolver;
pub mod result;
#[allow(clippy::missing_errors_doc)]
pub mod store;
#[allow(clippy::missing_errors_doc)]
pub mod telemetry;

mod locator;
mod wait;

pub use config::{HealConfig, HealMode, LogConfig, LogDestination};
pub use driver::{ConsoleEntry, Driver, Element};
pub use fuzzy::FuzzyPipeline;
pub use locator::{default_timeout, Locator, Strategy, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
pub use metrics::{MetricsSnapshot, ResolutionMetrics};
pub use pipeline::{Candidate, HealOutcome, HealRequest, RuleBasedPipeline};
pub use resolver::LocatorResolver;
pub use result::{DriverError, DriverResult, HealError, HealResult};
pub use store::{LocatorRecord, LocatorStore};
pub use wait::{WaitOptions, Waiter};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::config::{HealConfig, HealMode, LogConfig};
    pub use super::driver::{ConsoleEntry, Driver, Element};
    pub use super::fuzzy::FuzzyPipeline;
    pub use super::locator::{Locator, Strategy};
    pub use super::metrics::MetricsSnapshot;
    pub use super::mock::{MockDriver, MockElement};
    pub use super::pipeline::{Candidate, HealOutcome, RuleBasedPipeline};
    pub use super::resolver::LocatorResolver;
    pub use super::result::{DriverError, HealError, HealResult};
    pub use super::store::{LocatorRecord, LocatorStore};
    pub use super::wait::WaitOptions;
}
