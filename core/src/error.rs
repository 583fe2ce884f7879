//! Errors raised by handler bodies.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised by a handler body.
///
/// The harness records the error and hands the very same error back to the
/// caller, so the type is cheap to clone: the message is owned and the
/// optional underlying cause is shared.
///
/// Two handler errors compare equal when their messages are equal.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl HandlerError {
    /// Create an error with the given message and no underlying cause.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error with a message and an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Wrap an arbitrary error, using its `Display` output as the message.
    #[must_use]
    pub fn from_error(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::with_source(source.to_string(), source)
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl PartialEq for HandlerError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl Eq for HandlerError {}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
