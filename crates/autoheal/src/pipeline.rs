//! Rule-based healing pipeline.
//!
//! Candidates are produced lazily in strict priority order:
//!
//! 1. memory reuse - the stored locator, when it differs from the failed one
//! 2. attribute fallback - `id`, `name`, first `class` token, then text,
//!    from the attribute snapshot of the last success
//! 3. syntactic rewrite - a different spelling of the failed locator
//!
//! [`RuleBasedPipeline::heal`] walks that sequence and stops at the first
//! candidate the backend confirms within the caller's timeout.

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::iter;
use std::time::Instant;
use tracing::{debug, info};

use crate::driver::Driver;
use crate::locator::{Locator, Strategy};
use crate::store::{AttributeSnapshot, LocatorRecord};
use crate::wait::WaitOptions;

/// Reason attached to a reused stored locator
pub const MEMORY_REUSE_REASON: &str = "reusing previous successful locator";

/// Captured text must be longer than this to be used as a text fallback
pub const MIN_TEXT_FALLBACK_CHARS: usize = 3;

/// `text()='literal'` (or double-quoted) predicate in an XPath
const TEXT_EQUALS_PATTERN: &str = r#"text\(\)\s*=\s*(?:'([^']*)'|"([^"]*)")"#;

/// `.class` token in a CSS selector
const CSS_CLASS_PATTERN: &str = r"\.(-?[_a-zA-Z][_a-zA-Z0-9-]*)";

/// `[...]` attribute block in a CSS selector
const CSS_ATTRIBUTE_BLOCK_PATTERN: &str = r"\[[^\]]*\]";

/// A locator worth retrying, with the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Locator to try
    pub locator: Locator,
    /// Human-readable provenance
    pub reason: String,
}

impl Candidate {
    /// Create a candidate
    #[must_use]
    pub fn new(locator: Locator, reason: impl Into<String>) -> Self {
        Self {
            locator,
            reason: reason.into(),
        }
    }
}

/// Input to one healing attempt
#[derive(Debug, Clone, Copy)]
pub struct HealRequest<'a> {
    /// Logical element name
    pub name: &'a str,
    /// Locator whose wait just failed
    pub failed: &'a Locator,
    /// Stored record for `name`, if any
    pub record: Option<&'a LocatorRecord>,
    /// Budget for each candidate verification
    pub wait: WaitOptions,
}

impl<'a> HealRequest<'a> {
    /// Create a request
    #[must_use]
    pub const fn new(
        name: &'a str,
        failed: &'a Locator,
        record: Option<&'a LocatorRecord>,
        wait: WaitOptions,
    ) -> Self {
        Self {
            name,
            failed,
            record,
            wait,
        }
    }
}

/// Terminal result of one healing attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealOutcome {
    /// A candidate was confirmed present
    Healed {
        /// The confirmed candidate
        candidate: Candidate,
        /// Candidates verified, including the winner
        tried: usize,
    },
    /// Every candidate failed verification (or none were produced)
    Exhausted {
        /// Candidates verified
        tried: usize,
        /// Last candidate verified, if any
        last: Option<Locator>,
    },
}

impl HealOutcome {
    /// Whether a candidate was confirmed
    #[must_use]
    pub const fn is_healed(&self) -> bool {
        matches!(self, Self::Healed { .. })
    }

    /// Number of candidates verified
    #[must_use]
    pub const fn tried(&self) -> usize {
        match self {
            Self::Healed { tried, .. } | Self::Exhausted { tried, .. } => *tried,
        }
    }

    /// The confirmed candidate, if any
    #[must_use]
    pub fn into_candidate(self) -> Option<Candidate> {
        match self {
            Self::Healed { candidate, .. } => Some(candidate),
            Self::Exhausted { .. } => None,
        }
    }

    /// Last locator the pipeline queried, falling back to `failed`
    #[must_use]
    pub fn last_attempted(&self, failed: &Locator) -> Locator {
        match self {
            Self::Healed { candidate, .. } => candidate.locator.clone(),
            Self::Exhausted { last, .. } => last.clone().unwrap_or_else(|| failed.clone()),
        }
    }
}

/// Ordered candidates for a failed locator.
///
/// Each stage is only computed once the previous one is used up. The failed
/// locator itself and repeats of an earlier candidate are never proposed.
pub fn propose<'a>(request: &HealRequest<'a>) -> impl Iterator<Item = Candidate> + 'a {
    let failed = request.failed;
    let record = request.record;

    let memory = record
        .filter(|r| r.locator != *failed)
        .map(|r| Candidate::new(r.locator.clone(), MEMORY_REUSE_REASON));
    let attributes = iter::once_with(move || {
        record
            .and_then(|r| r.attributes.as_ref())
            .map(|attrs| attribute_candidates(failed, attrs))
            .unwrap_or_default()
    })
    .flatten();
    let rewrites = iter::once_with(move || rewrite_candidates(failed)).flatten();

    let mut seen = HashSet::new();
    memory
        .into_iter()
        .chain(attributes)
        .chain(rewrites)
        .filter(move |c| c.locator != *failed && seen.insert(c.locator.clone()))
}

/// Candidates from the attribute snapshot of the last success
fn attribute_candidates(failed: &Locator, attrs: &AttributeSnapshot) -> Vec<Candidate> {
    let non_empty = |key: &str| {
        attrs
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };
    let mut out = Vec::new();

    if let Some(id) = non_empty("id") {
        let candidate = Locator::id(id);
        if candidate != *failed {
            out.push(Candidate::new(candidate, "Attribute fallback: id"));
        }
    }
    if let Some(name) = non_empty("name") {
        out.push(Candidate::new(Locator::name(name), "Attribute fallback: name"));
    }
    if let Some(class) = non_empty("class").and_then(|c| c.split_whitespace().next()) {
        out.push(Candidate::new(
            Locator::class_name(class),
            "Attribute fallback: class",
        ));
    }
    if let Some(text) = non_empty("text") {
        if text.chars().count() > MIN_TEXT_FALLBACK_CHARS {
            out.push(Candidate::new(
                Locator::xpath(format!("//*[contains(text(), {})]", xpath_literal(text))),
                "Attribute fallback: text",
            ));
        }
    }

    out
}

/// Alternative spellings derived from the failed locator alone
fn rewrite_candidates(failed: &Locator) -> Vec<Candidate> {
    let v = failed.value.as_str();
    match failed.strategy {
        Strategy::Id => vec![
            Candidate::new(Locator::css(format!("#{v}")), "ID->CSS by #id"),
            Candidate::new(
                Locator::xpath(format!("//*[@id={}]", xpath_literal(v))),
                "ID->XPath by @id",
            ),
        ],
        Strategy::ClassName => vec![
            Candidate::new(Locator::css(format!(".{v}")), "Class->CSS by .class"),
            Candidate::new(
                Locator::xpath(format!("//*[@class={}]", xpath_literal(v))),
                "Class->XPath by @class",
            ),
        ],
        Strategy::Name => vec![
            Candidate::new(
                Locator::css(format!("[name={}]", css_string(v))),
                "Name->CSS by [name]",
            ),
            Candidate::new(
                Locator::xpath(format!("//*[@name={}]", xpath_literal(v))),
                "Name->XPath by @name",
            ),
        ],
        Strategy::CssSelector => single_css_class(v)
            .map(|class| {
                Candidate::new(
                    Locator::xpath(format!("//*[contains(@class,{})]", xpath_literal(&class))),
                    "CSS class->XPath contains(@class)",
                )
            })
            .into_iter()
            .collect(),
        Strategy::XPath => relax_text_predicate(v)
            .map(|xpath| Candidate::new(Locator::xpath(xpath), "XPath text()->contains(text())"))
            .into_iter()
            .collect(),
    }
}

/// The only class token of a selector that has no id token
fn single_css_class(selector: &str) -> Option<String> {
    let blocks = Regex::new(CSS_ATTRIBUTE_BLOCK_PATTERN).ok()?;
    let classes = Regex::new(CSS_CLASS_PATTERN).ok()?;
    let bare = blocks.replace_all(selector, "");
    if bare.contains('#') {
        return None;
    }

    let mut tokens = classes.captures_iter(&bare).map(|c| c[1].to_string());
    match (tokens.next(), tokens.next()) {
        (Some(class), None) => Some(class),
        _ => None,
    }
}

/// Rewrite every `text()='literal'` predicate to a whitespace-tolerant
/// containment test. `None` when the XPath has no such predicate.
fn relax_text_predicate(xpath: &str) -> Option<String> {
    let re = Regex::new(TEXT_EQUALS_PATTERN).ok()?;
    if !re.is_match(xpath) {
        return None;
    }
    let relaxed = re.replace_all(xpath, |caps: &Captures<'_>| {
        let literal = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        format!("contains(normalize-space(text()), {})", xpath_literal(literal))
    });
    Some(relaxed.into_owned())
}

/// Quote `s` as an XPath 1.0 string literal
fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{s}'")
    } else if !s.contains('"') {
        format!("\"{s}\"")
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Quote `s` as a CSS string
fn css_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Rule-based healing: memory, attributes, then syntactic rewrites
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedPipeline;

impl RuleBasedPipeline {
    /// Method name used in `[Performance]` markers
    pub const METHOD: &'static str = "Standard";

    /// Create the pipeline
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Try candidates until the backend confirms one.
    ///
    /// Each candidate gets the full wait budget of the request. Backend errors
    /// count as a failed candidate and the walk continues.
    pub fn heal<D: Driver>(&self, driver: &D, request: &HealRequest<'_>) -> HealOutcome {
        let start = Instant::now();
        let mut tried = 0;
        let mut healed = None;
        let mut last = None;

        for candidate in propose(request) {
            tried += 1;
            info!(
                name = request.name,
                locator = %candidate.locator,
                reason = %candidate.reason,
                "Healing attempt"
            );
            match driver.wait_until_present(&candidate.locator, &request.wait) {
                Ok(_) => {
                    healed = Some(candidate);
                    break;
                }
                Err(e) => {
                    debug!(
                        name = request.name,
                        locator = %candidate.locator,
                        error = %e,
                        "Candidate rejected"
                    );
                    last = Some(candidate.locator);
                }
            }
        }

        let outcome = match healed {
            Some(candidate) => HealOutcome::Healed { candidate, tried },
            None => HealOutcome::Exhausted { tried, last },
        };
        info!(
            name = request.name,
            "[Performance] Method={}, Time={:.4}s, Attempts={}, Success={}",
            Self::METHOD,
            start.elapsed().as_secs_f64(),
            tried,
            performance_flag(outcome.is_healed())
        );
        outcome
    }
}

/// `True`/`False` as written in `[Performance]` markers
pub(crate) const fn performance_flag(success: bool) -> &'static str {
    if success {
        "True"
    } else {
        "False"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, MockElement};
    use std::time::Duration;

    fn instant() -> WaitOptions {
        WaitOptions::new().with_timeout(Duration::ZERO)
    }

    fn proposals(failed: &Locator, record: Option<&LocatorRecord>) -> Vec<Candidate> {
        propose(&HealRequest::new("el", failed, record, instant())).collect()
    }

    fn locators(failed: &Locator, record: Option<&LocatorRecord>) -> Vec<Locator> {
        proposals(failed, record).into_iter().map(|c| c.locator).collect()
    }

    fn snapshot(pairs: &[(&str, &str)]) -> AttributeSnapshot {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    mod rewrite_tests {
        use super::*;

        #[test]
        fn test_id_css_before_xpath() {
            assert_eq!(
                locators(&Locator::id("foo"), None),
                vec![Locator::css("#foo"), Locator::xpath("//*[@id='foo']")]
            );
        }

        #[test]
        fn test_class_name_rewrites() {
            assert_eq!(
                locators(&Locator::class_name("btn"), None),
                vec![Locator::css(".btn"), Locator::xpath("//*[@class='btn']")]
            );
        }

        #[test]
        fn test_name_rewrites() {
            assert_eq!(
                locators(&Locator::name("email"), None),
                vec![
                    Locator::css("[name='email']"),
                    Locator::xpath("//*[@name='email']")
                ]
            );
        }

        #[test]
        fn test_css_single_class() {
            assert_eq!(
                locators(&Locator::css("button.btn-primary"), None),
                vec![Locator::xpath("//*[contains(@class,'btn-primary')]")]
            );
        }

        #[test]
        fn test_css_with_id_or_many_classes_yields_nothing() {
            assert!(locators(&Locator::css("#form .submit"), None).is_empty());
            assert!(locators(&Locator::css(".a.b"), None).is_empty());
            assert!(locators(&Locator::css("div > span"), None).is_empty());
        }

        #[test]
        fn test_css_dots_inside_attribute_blocks_ignored() {
            assert_eq!(
                locators(&Locator::css("a.nav[href='/x.html']"), None),
                vec![Locator::xpath("//*[contains(@class,'nav')]")]
            );
        }

        #[test]
        fn test_xpath_text_predicate_relaxed() {
            assert_eq!(
                locators(&Locator::xpath("//a[text()='Sign Out']"), None),
                vec![Locator::xpath(
                    "//a[contains(normalize-space(text()), 'Sign Out')]"
                )]
            );
        }

        #[test]
        fn test_xpath_double_quoted_predicate() {
            assert_eq!(
                locators(&Locator::xpath(r#"//button[text() = "Go"]"#), None),
                vec![Locator::xpath(
                    "//button[contains(normalize-space(text()), 'Go')]"
                )]
            );
        }

        #[test]
        fn test_xpath_without_text_predicate_yields_nothing() {
            assert!(locators(&Locator::xpath("//div[@id='x']"), None).is_empty());
        }

        #[test]
        fn test_reasons() {
            let reasons: Vec<String> = proposals(&Locator::id("foo"), None)
                .into_iter()
                .map(|c| c.reason)
                .collect();
            assert_eq!(reasons, vec!["ID->CSS by #id", "ID->XPath by @id"]);
        }
    }

    mod priority_tests {
        use super::*;

        #[test]
        fn test_memory_first() {
            let record = LocatorRecord::observed(Locator::css("#login"));
            let candidates = proposals(&Locator::id("login-btn"), Some(&record));
            assert_eq!(candidates[0].locator, Locator::css("#login"));
            assert_eq!(candidates[0].reason, MEMORY_REUSE_REASON);
        }

        #[test]
        fn test_memory_skipped_when_same_as_failed() {
            let record = LocatorRecord::observed(Locator::id("foo"));
            assert_eq!(
                locators(&Locator::id("foo"), Some(&record)),
                vec![Locator::css("#foo"), Locator::xpath("//*[@id='foo']")]
            );
        }

        #[test]
        fn test_attribute_id_precedes_rewrites() {
            let record = LocatorRecord::observed(Locator::id("wrong-id"))
                .with_attributes(Some(snapshot(&[("id", "real-id")])));
            let found = locators(&Locator::id("wrong-id"), Some(&record));
            assert_eq!(found[0], Locator::id("real-id"));
            assert_eq!(found[1], Locator::css("#wrong-id"));
        }

        #[test]
        fn test_full_attribute_order() {
            let record = LocatorRecord::observed(Locator::id("stale"))
                .with_attributes(Some(snapshot(&[
                    ("id", "real"),
                    ("name", "login"),
                    ("class", "btn btn-primary"),
                    ("text", "Login"),
                    ("tag", "button"),
                ])));
            let found = locators(&Locator::id("broken"), Some(&record));
            assert_eq!(
                found,
                vec![
                    Locator::id("stale"),
                    Locator::id("real"),
                    Locator::name("login"),
                    Locator::class_name("btn"),
                    Locator::xpath("//*[contains(text(), 'Login')]"),
                    Locator::css("#broken"),
                    Locator::xpath("//*[@id='broken']"),
                ]
            );
        }

        #[test]
        fn test_short_text_not_used() {
            let record = LocatorRecord::observed(Locator::id("x"))
                .with_attributes(Some(snapshot(&[("text", "Go!")])));
            assert!(!locators(&Locator::id("y"), Some(&record))
                .iter()
                .any(|l| l.value.contains("text()")));
        }

        #[test]
        fn test_attribute_id_equal_to_failed_skipped() {
            let record = LocatorRecord::observed(Locator::id("same"))
                .with_attributes(Some(snapshot(&[("id", "same")])));
            let found = locators(&Locator::id("same"), Some(&record));
            assert_eq!(found[0], Locator::css("#same"));
        }

        #[test]
        fn test_duplicates_removed() {
            let record = LocatorRecord::observed(Locator::css("#foo"));
            assert_eq!(
                locators(&Locator::id("foo"), Some(&record)),
                vec![Locator::css("#foo"), Locator::xpath("//*[@id='foo']")]
            );
        }

        #[test]
        fn test_lazy_stages() {
            let record = LocatorRecord::observed(Locator::css("#first"));
            let failed = Locator::id("foo");
            let request = HealRequest::new("el", &failed, Some(&record), instant());
            let first = propose(&request).next().unwrap();
            assert_eq!(first.locator, Locator::css("#first"));
        }
    }

    mod literal_tests {
        use super::*;

        #[test]
        fn test_xpath_literal_quoting() {
            assert_eq!(xpath_literal("plain"), "'plain'");
            assert_eq!(xpath_literal("it's"), "\"it's\"");
            assert_eq!(
                xpath_literal(r#"it's "x""#),
                r#"concat('it', "'", 's "x"')"#
            );
        }

        #[test]
        fn test_css_string_escapes_quotes() {
            assert_eq!(css_string("a'b"), r"'a\'b'");
        }
    }

    mod heal_tests {
        use super::*;

        #[test]
        fn test_first_confirmed_candidate_wins() {
            let driver = MockDriver::new().with_element(MockElement::new("button").with_attr("id", "foo"));
            let failed = Locator::id("foo-old");
            let record = LocatorRecord::observed(Locator::id("foo"));
            let outcome = RuleBasedPipeline::new().heal(
                &driver,
                &HealRequest::new("btn", &failed, Some(&record), instant()),
            );
            assert_eq!(outcome.tried(), 1);
            let candidate = outcome.into_candidate().unwrap();
            assert_eq!(candidate.locator, Locator::id("foo"));
            assert_eq!(candidate.reason, MEMORY_REUSE_REASON);
        }

        #[test]
        fn test_falls_through_to_xpath() {
            let driver = MockDriver::new().with_element(MockElement::new("a").with_text("Sign Out "));
            let failed = Locator::xpath("//a[text()='Sign Out']");
            let outcome = RuleBasedPipeline::new()
                .heal(&driver, &HealRequest::new("logout", &failed, None, instant()));
            assert!(outcome.is_healed());
            assert_eq!(
                outcome.into_candidate().unwrap().reason,
                "XPath text()->contains(text())"
            );
        }

        #[test]
        fn test_exhausted_counts_all_candidates() {
            let driver = MockDriver::new();
            let failed = Locator::id("ghost");
            let outcome = RuleBasedPipeline::new()
                .heal(&driver, &HealRequest::new("ghost", &failed, None, instant()));
            assert_eq!(
                outcome,
                HealOutcome::Exhausted {
                    tried: 2,
                    last: Some(Locator::xpath("//*[@id='ghost']")),
                }
            );
            assert_eq!(
                outcome.last_attempted(&failed),
                Locator::xpath("//*[@id='ghost']")
            );
        }

        #[test]
        fn test_no_candidates() {
            let driver = MockDriver::new();
            let failed = Locator::css("div > span");
            let outcome = RuleBasedPipeline::new()
                .heal(&driver, &HealRequest::new("x", &failed, None, instant()));
            assert_eq!(outcome, HealOutcome::Exhausted { tried: 0, last: None });
            assert_eq!(outcome.last_attempted(&failed), failed);
        }
    }
}
