//! Backend capability traits.
//!
//! The resolver only ever talks to the browser through [`Driver`] and
//! [`Element`]. Anything a test script needs beyond these (screenshots,
//! cookies, window management) belongs to the caller's own driver handle,
//! reachable through [`LocatorResolver::driver_mut`].
//!
//! # Implementations
//!
//! - [`MockDriver`](crate::mock::MockDriver) - in-memory document for tests
//! - WebDriver / CDP adapters live in the calling project
//!
//! [`LocatorResolver::driver_mut`]: crate::resolver::LocatorResolver::driver_mut

use serde::{Deserialize, Serialize};

use crate::locator::Locator;
use crate::result::{DriverError, DriverResult};
use crate::wait::{WaitOptions, Waiter};

/// A located element
pub trait Element {
    /// Read an attribute; `Ok(None)` when the element does not carry it
    fn attribute(&self, name: &str) -> DriverResult<Option<String>>;

    /// Lower-case tag name
    fn tag_name(&self) -> DriverResult<String>;

    /// Visible text content
    fn text(&self) -> DriverResult<String>;

    /// Click the element
    fn click(&self) -> DriverResult<()>;

    /// Type text into the element
    fn send_keys(&self, text: &str) -> DriverResult<()>;
}

/// Browser console entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    /// Level as reported by the backend (`"SEVERE"`, `"WARNING"`, ...)
    pub level: String,
    /// Message text
    pub message: String,
}

impl ConsoleEntry {
    /// Create a console entry
    #[must_use]
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            message: message.into(),
        }
    }

    /// Whether the level denotes an error
    #[must_use]
    pub fn is_error(&self) -> bool {
        let level = self.level.to_ascii_uppercase();
        level.contains("ERROR") || level.contains("SEVERE")
    }
}

/// Narrow browser-automation capability consumed by the resolver
pub trait Driver {
    /// Element handle type
    type Element: Element;

    /// Navigate to a URL
    fn navigate(&mut self, url: &str) -> DriverResult<()>;

    /// Query once for the first element matching `locator`, without waiting
    fn find_element(&self, locator: &Locator) -> DriverResult<Option<Self::Element>>;

    /// Query all elements matching `locator`, in document order
    fn find_all(&self, locator: &Locator) -> DriverResult<Vec<Self::Element>>;

    /// Full page source
    fn page_source(&self) -> DriverResult<String>;

    /// Browser console entries since the last call.
    ///
    /// Optional capability; the default reports it as unsupported.
    fn console_log(&self) -> DriverResult<Vec<ConsoleEntry>> {
        Err(DriverError::unsupported("console_log"))
    }

    /// Block until an element matching `locator` is present.
    ///
    /// The default polls [`find_element`](Self::find_element) with
    /// [`Waiter`]; backends with a native wait can override it.
    fn wait_until_present(
        &self,
        locator: &Locator,
        options: &WaitOptions,
    ) -> DriverResult<Self::Element> {
        Waiter::new(*options).until_present(locator, || self.find_element(locator))
    }

    /// Shut the backend down
    fn quit(&mut self) -> DriverResult<()> {
        Ok(())
    }
}
