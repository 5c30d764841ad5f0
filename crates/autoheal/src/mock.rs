//! In-memory driver for tests.
//!
//! [`MockDriver`] holds a flat document of [`MockElement`]s and evaluates
//! locators against it. It understands the locator shapes the healing
//! pipelines produce:
//!
//! - CSS compounds: `tag`, `#id`, `.class`, `[attr]`, `[attr='v']` and any
//!   concatenation of those (`button.btn-primary`, `input[name='email']`)
//! - XPath `//tag` or `//*` with predicates `@attr`, `@attr='v'`,
//!   `contains(@attr,'v')`, `text()='v'`, `contains(text(),'v')` and
//!   `contains(normalize-space(text()),'v')`, joined by `and` or `][`
//!
//! Anything else is reported as a backend error.
//!
//! # Example
//!
//! ```
//! use autoheal::mock::{MockDriver, MockElement};
//! use autoheal::{Driver, Locator};
//!
//! let driver = MockDriver::new()
//!     .with_element(MockElement::new("button").with_attr("id", "go").with_text("Go"));
//! assert!(driver.find_element(&Locator::css("button#go")).unwrap().is_some());
//! assert!(driver.find_element(&Locator::xpath("//*[text()='Go']")).unwrap().is_some());
//! ```

use regex::{Captures, Regex};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use crate::driver::{ConsoleEntry, Driver, Element};
use crate::locator::{Locator, Strategy};
use crate::result::{DriverError, DriverResult};

/// Shared call log
type CallLog = Rc<RefCell<Vec<String>>>;

/// Element in a [`MockDriver`] document
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    unreadable_attributes: bool,
    log: CallLog,
}

impl MockElement {
    /// Create an element with the given tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Make every attribute read fail
    #[must_use]
    pub const fn with_unreadable_attributes(mut self) -> Self {
        self.unreadable_attributes = true;
        self
    }

    /// Raw attribute value, ignoring the unreadable flag
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn record(&self, call: String) {
        self.log.borrow_mut().push(call);
    }
}

impl Element for MockElement {
    fn attribute(&self, name: &str) -> DriverResult<Option<String>> {
        if self.unreadable_attributes {
            return Err(DriverError::backend(format!(
                "attribute '{name}' is not readable"
            )));
        }
        Ok(self.attributes.get(name).cloned())
    }

    fn tag_name(&self) -> DriverResult<String> {
        Ok(self.tag.clone())
    }

    fn text(&self) -> DriverResult<String> {
        Ok(self.text.clone())
    }

    fn click(&self) -> DriverResult<()> {
        self.record(format!("click:{}", self.tag));
        Ok(())
    }

    fn send_keys(&self, text: &str) -> DriverResult<()> {
        self.record(format!("send_keys:{}:{text}", self.tag));
        Ok(())
    }
}

/// Mock driver for unit and scenario tests
#[derive(Debug, Default)]
pub struct MockDriver {
    elements: Vec<MockElement>,
    current_url: String,
    page_source: String,
    console: Option<RefCell<Vec<ConsoleEntry>>>,
    sightings: RefCell<HashMap<Locator, usize>>,
    broken_queries: HashSet<Locator>,
    quit: bool,
    log: CallLog,
}

impl MockDriver {
    /// Create an empty mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element (builder form)
    #[must_use]
    pub fn with_element(mut self, element: MockElement) -> Self {
        self.add_element(element);
        self
    }

    /// Append an element to the document
    pub fn add_element(&mut self, element: MockElement) {
        self.elements.push(element);
    }

    /// Set the page source
    #[must_use]
    pub fn with_page_source(mut self, html: impl Into<String>) -> Self {
        self.page_source = html.into();
        self
    }

    /// Enable console logging with the given pending entries
    #[must_use]
    pub fn with_console(mut self, entries: Vec<ConsoleEntry>) -> Self {
        self.console = Some(RefCell::new(entries));
        self
    }

    /// Let `locator` match at most `count` more times, then find nothing
    #[must_use]
    pub fn with_sighting_limit(self, locator: Locator, count: usize) -> Self {
        self.sightings.borrow_mut().insert(locator, count);
        self
    }

    /// Make every query for `locator` fail with a backend error
    #[must_use]
    pub fn with_broken_query(mut self, locator: Locator) -> Self {
        self.broken_queries.insert(locator);
        self
    }

    /// URL of the last navigation
    #[must_use]
    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    /// Whether `quit` was called
    #[must_use]
    pub const fn is_quit(&self) -> bool {
        self.quit
    }

    /// Every recorded call, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Whether `method` was called at least once
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.calls_to(method) > 0
    }

    /// Number of recorded calls to `method`
    #[must_use]
    pub fn calls_to(&self, method: &str) -> usize {
        let prefix = format!("{method}:");
        self.log
            .borrow()
            .iter()
            .filter(|call| *call == method || call.starts_with(&prefix))
            .count()
    }

    /// Number of queries (`find_element` or `find_all`) issued for `locator`
    #[must_use]
    pub fn queries_for(&self, locator: &Locator) -> usize {
        let element = format!("find_element:{locator}");
        let all = format!("find_all:{locator}");
        self.log
            .borrow()
            .iter()
            .filter(|call| **call == element || **call == all)
            .count()
    }

    fn record(&self, call: String) {
        self.log.borrow_mut().push(call);
    }

    fn matching(&self, locator: &Locator) -> DriverResult<Vec<MockElement>> {
        if self.broken_queries.contains(locator) {
            return Err(DriverError::backend(format!("query failed for {locator}")));
        }

        let query = Query::parse(locator)?;
        let found: Vec<MockElement> = self
            .elements
            .iter()
            .filter(|el| query.matches(el))
            .map(|el| MockElement {
                log: Rc::clone(&self.log),
                ..el.clone()
            })
            .collect();

        if found.is_empty() {
            return Ok(found);
        }
        let mut sightings = self.sightings.borrow_mut();
        match sightings.get_mut(locator) {
            Some(0) => Ok(Vec::new()),
            Some(remaining) => {
                *remaining -= 1;
                Ok(found)
            }
            None => Ok(found),
        }
    }
}

impl Driver for MockDriver {
    type Element = MockElement;

    fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.record(format!("navigate:{url}"));
        self.current_url = url.to_string();
        Ok(())
    }

    fn find_element(&self, locator: &Locator) -> DriverResult<Option<MockElement>> {
        self.record(format!("find_element:{locator}"));
        Ok(self.matching(locator)?.into_iter().next())
    }

    fn find_all(&self, locator: &Locator) -> DriverResult<Vec<MockElement>> {
        self.record(format!("find_all:{locator}"));
        self.matching(locator)
    }

    fn page_source(&self) -> DriverResult<String> {
        self.record("page_source".to_string());
        Ok(self.page_source.clone())
    }

    fn console_log(&self) -> DriverResult<Vec<ConsoleEntry>> {
        self.record("console_log".to_string());
        self.console
            .as_ref()
            .map(|entries| entries.borrow_mut().drain(..).collect())
            .ok_or_else(|| DriverError::unsupported("console_log"))
    }

    fn quit(&mut self) -> DriverResult<()> {
        self.record("quit".to_string());
        self.quit = true;
        Ok(())
    }
}

/// One condition an element must satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Tag(String),
    HasAttr(String),
    AttrEquals(String, String),
    AttrContains(String, String),
    HasClass(String),
    TextEquals(String),
    TextContains(String),
    NormalizedTextContains(String),
}

impl Condition {
    fn matches(&self, el: &MockElement) -> bool {
        match self {
            Self::Tag(tag) => el.tag.eq_ignore_ascii_case(tag),
            Self::HasAttr(name) => el.attr(name).is_some(),
            Self::AttrEquals(name, value) => el.attr(name) == Some(value.as_str()),
            Self::AttrContains(name, value) => {
                el.attr(name).is_some_and(|v| v.contains(value.as_str()))
            }
            Self::HasClass(class) => el.has_class(class),
            Self::TextEquals(value) => el.text == *value,
            Self::TextContains(value) => el.text.contains(value.as_str()),
            Self::NormalizedTextContains(value) => {
                let normalized = el.text.split_whitespace().collect::<Vec<_>>().join(" ");
                normalized.contains(value.as_str())
            }
        }
    }
}

/// Parsed locator: all conditions must hold
#[derive(Debug, Clone, PartialEq, Eq)]
struct Query {
    conditions: Vec<Condition>,
}

impl Query {
    fn parse(locator: &Locator) -> DriverResult<Self> {
        let value = locator.value.as_str();
        let conditions = match locator.strategy {
            Strategy::Id => Some(vec![Condition::AttrEquals("id".into(), value.into())]),
            Strategy::Name => Some(vec![Condition::AttrEquals("name".into(), value.into())]),
            Strategy::ClassName => Some(vec![Condition::HasClass(value.into())]),
            Strategy::CssSelector => parse_css(value),
            Strategy::XPath => parse_xpath(value),
        };
        conditions
            .map(|conditions| Self { conditions })
            .ok_or_else(|| DriverError::backend(format!("mock cannot evaluate {locator}")))
    }

    fn matches(&self, el: &MockElement) -> bool {
        self.conditions.iter().all(|c| c.matches(el))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Parse a compound CSS selector (no combinators)
fn parse_css(selector: &str) -> Option<Vec<Condition>> {
    let selector = selector.trim();
    let mut conditions = Vec::new();
    let mut rest = selector;

    let tag_len = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
    if tag_len > 0 {
        conditions.push(Condition::Tag(rest[..tag_len].to_string()));
        rest = &rest[tag_len..];
    } else if let Some(stripped) = rest.strip_prefix('*') {
        rest = stripped;
    }

    while let Some(first) = rest.chars().next() {
        match first {
            '#' | '.' => {
                let body = &rest[1..];
                let len = body.find(|c: char| !is_ident_char(c)).unwrap_or(body.len());
                if len == 0 {
                    return None;
                }
                let ident = body[..len].to_string();
                conditions.push(if first == '#' {
                    Condition::AttrEquals("id".into(), ident)
                } else {
                    Condition::HasClass(ident)
                });
                rest = &body[len..];
            }
            '[' => {
                let close = rest.find(']')?;
                conditions.push(parse_css_attribute(&rest[1..close])?);
                rest = &rest[close + 1..];
            }
            _ => return None,
        }
    }

    (!conditions.is_empty()).then_some(conditions)
}

/// `attr`, `attr=v`, `attr='v'` or `attr="v"`
fn parse_css_attribute(body: &str) -> Option<Condition> {
    match body.split_once('=') {
        None => {
            let name = body.trim();
            (!name.is_empty() && name.chars().all(is_ident_char))
                .then(|| Condition::HasAttr(name.to_string()))
        }
        Some((name, value)) => {
            let name = name.trim();
            let value = value.trim();
            let unquoted = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .unwrap_or(value)
                .replace("\\'", "'")
                .replace("\\\\", "\\");
            (!name.is_empty() && name.chars().all(is_ident_char))
                .then(|| Condition::AttrEquals(name.to_string(), unquoted))
        }
    }
}

/// XPath 1.0 string literal, including `concat(...)` of literals
const LITERAL: &str = r#"'[^']*'|"[^"]*"|concat\((?:\s*(?:'[^']*'|"[^"]*")\s*,?)+\)"#;

/// Parse `//tag[...]` with the supported predicate forms
fn parse_xpath(xpath: &str) -> Option<Vec<Condition>> {
    let outer = Regex::new(r"^//(\*|[A-Za-z][\w-]*)(?:\[(.*)\])?$").ok()?;
    let caps = outer.captures(xpath.trim())?;

    let mut conditions = Vec::new();
    match &caps[1] {
        "*" => {}
        tag => conditions.push(Condition::Tag(tag.to_string())),
    }
    if let Some(body) = caps.get(2) {
        conditions.extend(parse_predicates(body.as_str())?);
    }
    Some(conditions)
}

/// Predicate shapes understood inside `[...]`
#[derive(Debug, Clone, Copy)]
enum PredicateForm {
    AttrEquals,
    TextEquals,
    AttrContains,
    TextContains,
    NormalizedTextContains,
    HasAttr,
}

impl PredicateForm {
    /// Tried in this order; `@attr=` must precede bare `@attr`
    const ALL: [Self; 6] = [
        Self::AttrEquals,
        Self::TextEquals,
        Self::AttrContains,
        Self::TextContains,
        Self::NormalizedTextContains,
        Self::HasAttr,
    ];

    fn pattern(self) -> String {
        match self {
            Self::AttrEquals => format!(r"^@([\w-]+)\s*=\s*({LITERAL})"),
            Self::TextEquals => format!(r"^text\(\)\s*=\s*({LITERAL})"),
            Self::AttrContains => format!(r"^contains\(\s*@([\w-]+)\s*,\s*({LITERAL})\s*\)"),
            Self::TextContains => format!(r"^contains\(\s*text\(\)\s*,\s*({LITERAL})\s*\)"),
            Self::NormalizedTextContains => format!(
                r"^contains\(\s*normalize-space\(\s*(?:text\(\)|\.)?\s*\)\s*,\s*({LITERAL})\s*\)"
            ),
            Self::HasAttr => r"^@([\w-]+)".to_string(),
        }
    }

    fn build(self, caps: &Captures<'_>) -> Option<Condition> {
        Some(match self {
            Self::AttrEquals => Condition::AttrEquals(caps[1].to_string(), decode_literal(&caps[2])?),
            Self::TextEquals => Condition::TextEquals(decode_literal(&caps[1])?),
            Self::AttrContains => {
                Condition::AttrContains(caps[1].to_string(), decode_literal(&caps[2])?)
            }
            Self::TextContains => Condition::TextContains(decode_literal(&caps[1])?),
            Self::NormalizedTextContains => {
                Condition::NormalizedTextContains(decode_literal(&caps[1])?)
            }
            Self::HasAttr => Condition::HasAttr(caps[1].to_string()),
        })
    }
}

fn parse_predicates(body: &str) -> Option<Vec<Condition>> {
    let forms = PredicateForm::ALL
        .into_iter()
        .map(|form| Regex::new(&form.pattern()).ok().map(|re| (form, re)))
        .collect::<Option<Vec<_>>>()?;
    let separator = Regex::new(r"^\s*(?:and\s+|\]\s*\[)\s*").ok()?;

    let mut conditions = Vec::new();
    let mut rest = body.trim_start();
    loop {
        let (consumed, condition) = forms.iter().find_map(|(form, re)| {
            let caps = re.captures(rest)?;
            Some((caps.get(0)?.end(), form.build(&caps)?))
        })?;
        conditions.push(condition);
        rest = rest[consumed..].trim_start();
        if rest.is_empty() {
            return Some(conditions);
        }
        let sep = separator.find(rest)?;
        rest = &rest[sep.end()..];
    }
}

/// Value of an XPath string literal
fn decode_literal(literal: &str) -> Option<String> {
    let literal = literal.trim();
    if let Some(args) = literal
        .strip_prefix("concat(")
        .and_then(|l| l.strip_suffix(')'))
    {
        let part = Regex::new(r#"'([^']*)'|"([^"]*)""#).ok()?;
        return Some(
            part.captures_iter(args)
                .filter_map(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str())
                .collect(),
        );
    }
    literal
        .strip_prefix('\'')
        .and_then(|l| l.strip_suffix('\''))
        .or_else(|| literal.strip_prefix('"').and_then(|l| l.strip_suffix('"')))
        .map(str::to_string)
}
