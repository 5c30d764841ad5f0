//! Result and error types for autoheal.
//!
//! Two layers: [`DriverError`] is what a backend reports for a single
//! operation, [`HealError`] is what the resolver reports to its caller.

use thiserror::Error;

use crate::locator::Locator;

/// Result type for autoheal operations
pub type HealResult<T> = Result<T, HealError>;

/// Result type for backend operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors surfaced by autoheal
#[derive(Debug, Error)]
pub enum HealError {
    /// Neither the original locator nor any healed candidate resolved
    #[error("Could not resolve '{name}' (last tried {locator}, {candidates} candidate(s) exhausted)")]
    Unresolved {
        /// Logical element name
        name: String,
        /// Last locator that was attempted
        locator: Locator,
        /// Number of healing candidates tried
        candidates: usize,
    },

    /// Backend failure outside of element resolution (navigation, shutdown)
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HealError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unresolved error
    #[must_use]
    pub fn unresolved(name: impl Into<String>, locator: Locator, candidates: usize) -> Self {
        Self::Unresolved {
            name: name.into(),
            locator,
            candidates,
        }
    }

    /// Check if this error is a resolution failure
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved { .. })
    }
}

/// Errors reported by a [`Driver`](crate::driver::Driver) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No element matched the locator
    #[error("No element matches {locator}")]
    NotFound {
        /// Locator that failed
        locator: Locator,
    },

    /// Element was located but detached before it could be used
    #[error("Stale element reference for {locator}")]
    StaleReference {
        /// Locator whose element went stale
        locator: Locator,
    },

    /// Element did not appear within the wait budget
    #[error("Timed out after {ms}ms waiting for {locator}")]
    Timeout {
        /// Locator that was awaited
        locator: Locator,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Backend does not implement this capability
    #[error("Operation not supported by driver: {operation}")]
    Unsupported {
        /// Operation name
        operation: String,
    },

    /// Any other backend failure
    #[error("Backend failure: {message}")]
    Backend {
        /// Error message
        message: String,
    },
}

impl DriverError {
    /// Create an unsupported-operation error
    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a generic backend error
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Errors that mean "the element is not there (any more)".
    ///
    /// Any other error still starts a healing attempt, but is logged as a
    /// backend fault rather than a missing element.
    #[must_use]
    pub const fn is_heal_trigger(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::StaleReference { .. } | Self::Timeout { .. }
        )
    }

    /// Short class name used in log lines
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::StaleReference { .. } => "StaleReference",
            Self::Timeout { .. } => "Timeout",
            Self::Unsupported { .. } => "Unsupported",
            Self::Backend { .. } => "Backend",
        }
    }
}
