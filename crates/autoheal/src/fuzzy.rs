//! Edit-distance healing.
//!
//! Instead of rewriting the failed locator, scan every element that carries
//! the locator's attribute and pick the value closest to the failed one.
//! Only strategies that name a single DOM attribute (`id`, `name`, `class`)
//! can be healed this way.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::distance::distance;
use crate::driver::{Driver, Element};
use crate::locator::Locator;
use crate::pipeline::{performance_flag, Candidate, HealOutcome, HealRequest};

/// Smallest distance threshold, whatever the value length
pub const MIN_DISTANCE_LIMIT: f64 = 2.0;

/// Share of the failed value's length that may differ
pub const DISTANCE_RATIO: f64 = 0.7;

/// Largest distance still accepted for a failed value of `len` characters
#[must_use]
pub fn distance_limit(len: usize) -> f64 {
    MIN_DISTANCE_LIMIT.max(len as f64 * DISTANCE_RATIO)
}

/// Closest attribute value found by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    /// Attribute value
    pub value: String,
    /// Edit distance to the failed value
    pub distance: usize,
}

/// Pick the closest of `values` to `target`.
///
/// Ties keep the earliest value. Empty values are ignored.
#[must_use]
pub fn closest<I, S>(target: &str, values: I) -> Option<FuzzyMatch>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best: Option<FuzzyMatch> = None;
    for value in values {
        let value = value.as_ref();
        if value.is_empty() {
            continue;
        }
        let d = distance(target, value);
        if best.as_ref().map_or(true, |b| d < b.distance) {
            best = Some(FuzzyMatch {
                value: value.to_string(),
                distance: d,
            });
        }
    }
    best
}

/// Levenshtein healing over a full-document attribute scan
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyPipeline;

impl FuzzyPipeline {
    /// Method name used in `[Performance]` markers
    pub const METHOD: &'static str = "Levenshtein";

    /// Create the pipeline
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Scan, rank and verify.
    ///
    /// Backend errors during the scan or the verification end the attempt
    /// with [`HealOutcome::Exhausted`]; they are never propagated.
    pub fn heal<D: Driver>(&self, driver: &D, request: &HealRequest<'_>) -> HealOutcome {
        let start = Instant::now();
        let (outcome, scanned) = self.run(driver, request);
        info!(
            name = request.name,
            "[Performance] Method={}, Time={:.4}s, Scanned={}, Success={}",
            Self::METHOD,
            start.elapsed().as_secs_f64(),
            scanned,
            performance_flag(outcome.is_healed())
        );
        outcome
    }

    fn run<D: Driver>(&self, driver: &D, request: &HealRequest<'_>) -> (HealOutcome, usize) {
        let failed = request.failed;
        let exhausted = HealOutcome::Exhausted {
            tried: 0,
            last: None,
        };

        let Some(attribute) = failed.strategy.dom_attribute() else {
            info!(
                name = request.name,
                strategy = %failed.strategy,
                "Edit-distance healing does not apply to this strategy"
            );
            return (exhausted, 0);
        };

        let scan = Locator::css(format!("[{attribute}]"));
        let elements = match driver.find_all(&scan) {
            Ok(elements) => elements,
            Err(e) => {
                warn!(name = request.name, error = %e, "Attribute scan failed");
                return (exhausted, 0);
            }
        };
        let scanned = elements.len();

        let values = elements.iter().filter_map(|el| match el.attribute(attribute) {
            Ok(value) => value,
            Err(e) => {
                debug!(name = request.name, error = %e, "Skipping unreadable element");
                None
            }
        });
        let Some(best) = closest(&failed.value, values) else {
            info!(name = request.name, attribute, "No element carries the attribute");
            return (exhausted, scanned);
        };

        let limit = distance_limit(failed.value.chars().count());
        if best.distance as f64 > limit {
            info!(
                name = request.name,
                best = %best.value,
                dist = best.distance,
                limit,
                "Closest match too weak"
            );
            return (exhausted, scanned);
        }
        if best.value == failed.value {
            debug!(name = request.name, "Closest match is the failed value itself");
            return (exhausted, scanned);
        }

        info!(
            name = request.name,
            best = %best.value,
            dist = best.distance,
            "Found edit-distance match"
        );
        let candidate = Candidate::new(
            failed.with_value(best.value),
            format!("Levenshtein (dist={})", best.distance),
        );
        match driver.wait_until_present(&candidate.locator, &request.wait) {
            Ok(_) => (HealOutcome::Healed { candidate, tried: 1 }, scanned),
            Err(e) => {
                warn!(
                    name = request.name,
                    locator = %candidate.locator,
                    error = %e,
                    "Edit-distance candidate did not verify"
                );
                let last = Some(candidate.locator);
                (HealOutcome::Exhausted { tried: 1, last }, scanned)
            }
        }
    }
}
