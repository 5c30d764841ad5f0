//! Locator value types.
//!
//! A [`Locator`] is a `(strategy, value)` pair in WebDriver terms. It is an
//! immutable value: two locators are equal when both strategy and value are.
//! The strategy set is closed, so every per-strategy decision in the crate is
//! an exhaustive `match` on [`Strategy`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::result::HealError;

/// Default timeout for a single wait-until-present attempt (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval while waiting for an element (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Element selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strategy {
    /// Match on the `id` attribute
    #[serde(rename = "id")]
    Id,
    /// CSS selector
    #[serde(rename = "css selector")]
    CssSelector,
    /// XPath expression
    #[serde(rename = "xpath")]
    XPath,
    /// Match a single class name
    #[serde(rename = "class name")]
    ClassName,
    /// Match on the `name` attribute
    #[serde(rename = "name")]
    Name,
}

impl Strategy {
    /// All strategies
    pub const ALL: [Self; 5] = [
        Self::Id,
        Self::CssSelector,
        Self::XPath,
        Self::ClassName,
        Self::Name,
    ];

    /// WebDriver name of the strategy (`"css selector"`, `"xpath"`, ...)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CssSelector => "css selector",
            Self::XPath => "xpath",
            Self::ClassName => "class name",
            Self::Name => "name",
        }
    }

    /// DOM attribute that this strategy matches on directly, if any
    #[must_use]
    pub const fn dom_attribute(self) -> Option<&'static str> {
        match self {
            Self::Id => Some("id"),
            Self::Name => Some("name"),
            Self::ClassName => Some("class"),
            Self::CssSelector | Self::XPath => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = HealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| HealError::config(format!("unknown locator strategy '{s}'")))
    }
}

/// A `(strategy, value)` pair identifying how to select an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Selection strategy
    #[serde(rename = "by")]
    pub strategy: Strategy,
    /// Strategy-specific selector text
    pub value: String,
}

impl Locator {
    /// Create a locator
    #[must_use]
    pub fn new(strategy: Strategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    /// Locate by `id` attribute
    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self::new(Strategy::Id, value)
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(value: impl Into<String>) -> Self {
        Self::new(Strategy::CssSelector, value)
    }

    /// Locate by XPath expression
    #[must_use]
    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, value)
    }

    /// Locate by a single class name
    #[must_use]
    pub fn class_name(value: impl Into<String>) -> Self {
        Self::new(Strategy::ClassName, value)
    }

    /// Locate by `name` attribute
    #[must_use]
    pub fn name(value: impl Into<String>) -> Self {
        Self::new(Strategy::Name, value)
    }

    /// Same strategy, different value
    #[must_use]
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self::new(self.strategy, value)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy, self.value)
    }
}

/// Default per-attempt timeout as a [`Duration`]
#[must_use]
pub const fn default_timeout() -> Duration {
    Duration::from_millis(DEFAULT_TIMEOUT_MS)
}
