//! Post-navigation page checks.
//!
//! Purely advisory: findings are logged as warnings and returned, never
//! turned into errors.

use tracing::{debug, warn};

use crate::driver::{ConsoleEntry, Driver};
use crate::result::DriverError;

/// Case-insensitive markers of a server error page, in reporting priority
pub const ERROR_PAGE_INDICATORS: [&str; 3] = [
    "404 not found",
    "500 internal server error",
    "service unavailable",
];

/// First error-page marker present in `html`
#[must_use]
pub fn detect_error_page(html: &str) -> Option<&'static str> {
    let html = html.to_lowercase();
    ERROR_PAGE_INDICATORS
        .into_iter()
        .find(|indicator| html.contains(indicator))
}

/// Messages of the error-level console entries
#[must_use]
pub fn console_errors(entries: &[ConsoleEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| entry.is_error())
        .map(|entry| entry.message.clone())
        .collect()
}

/// What a page check found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDiagnostics {
    /// Matched error-page marker
    pub error_page: Option<&'static str>,
    /// Error-level console messages
    pub js_errors: Vec<String>,
}

impl PageDiagnostics {
    /// Nothing suspicious found
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.error_page.is_none() && self.js_errors.is_empty()
    }
}

/// Scan the current page source and console.
///
/// Backend failures skip the affected check.
pub fn inspect<D: Driver>(driver: &D) -> PageDiagnostics {
    let mut found = PageDiagnostics::default();

    match driver.page_source() {
        Ok(html) => {
            found.error_page = detect_error_page(&html);
            if let Some(indicator) = found.error_page {
                warn!(indicator, "HTTP-like error page detected");
            }
        }
        Err(e) => warn!(error = %e, "Page source unavailable, skipping error-page check"),
    }

    match driver.console_log() {
        Ok(entries) => {
            found.js_errors = console_errors(&entries);
            for message in &found.js_errors {
                warn!(message = %message, "JS error");
            }
        }
        Err(DriverError::Unsupported { .. }) => {
            debug!("Console log not supported by driver");
        }
        Err(e) => warn!(error = %e, "Console log unavailable"),
    }

    found
}
