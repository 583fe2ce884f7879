//! Errors reported by the harness itself.

use std::time::Duration;
use thiserror::Error;

/// Errors from harness registration and lookup.
///
/// Failures of the handlers under test are never reported through this type;
/// they are captured in the invocation record and returned to the caller as
/// the handler produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// A handler is already registered under this identifier
    #[error("Handler identifier '{0}' is already registered")]
    DuplicateIdentifier(String),

    /// The handler cannot be wrapped for interception
    #[error("Handler '{identifier}' cannot be intercepted: {reason}")]
    NotInterceptable {
        /// The identifier the handler was to be registered under
        identifier: String,
        /// Why the handler refused to be wrapped
        reason: String,
    },

    /// No handler is registered under this identifier
    #[error("No handler registered under '{0}'")]
    NotFound(String),

    /// No invocation arrived within the wait window
    #[error("No invocation of '{identifier}' within {timeout:?}")]
    TimedOut {
        /// The identifier that was waited on
        identifier: String,
        /// How long the wait lasted
        timeout: Duration,
    },
}

impl HarnessError {
    /// Returns `true` for the timed-out outcome of a bounded wait.
    ///
    /// Useful to tell "nothing arrived yet" apart from misconfiguration.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
