//! Captured handler invocations.

use crate::error::HandlerError;
use crate::handler::Args;
use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use std::time::Duration;

/// One completed handler call.
///
/// A record always carries exactly one outcome: the value the handler
/// returned, or the error it failed with. Records are immutable once built.
///
/// The sequence number is assigned when the call completes and increases
/// monotonically per handler identifier, starting at zero.
///
/// # Example
///
/// ```
/// use handler_harness_core::{args, InvocationRecord, Value};
/// use std::time::Duration;
///
/// let record = InvocationRecord::new(
///     "orders",
///     0,
///     args!["x"],
///     Ok(Value::from("X")),
///     Duration::from_millis(3),
/// );
///
/// assert_eq!(record.identifier(), "orders");
/// assert_eq!(record.result(), Some(&Value::from("X")));
/// assert!(record.error().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRecord {
    identifier: String,
    sequence: u64,
    arguments: Args,
    outcome: Result<Value, HandlerError>,
    completed_at: DateTime<Utc>,
    elapsed: Duration,
}

impl InvocationRecord {
    /// Build a record for a call that completed now.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        sequence: u64,
        arguments: Args,
        outcome: Result<Value, HandlerError>,
        elapsed: Duration,
    ) -> Self {
        Self::with_completion_time(identifier, sequence, arguments, outcome, elapsed, Utc::now())
    }

    /// Build a record with an explicit completion timestamp.
    #[must_use]
    pub fn with_completion_time(
        identifier: impl Into<String>,
        sequence: u64,
        arguments: Args,
        outcome: Result<Value, HandlerError>,
        elapsed: Duration,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            sequence,
            arguments,
            outcome,
            completed_at,
            elapsed,
        }
    }

    /// Identifier of the handler that was called.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Position of this call in completion order for its identifier.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Arguments as they were when the call started.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Argument at `index`, if present.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    /// Value returned by the call, absent if it failed.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    /// Error the call failed with, absent if it returned.
    #[must_use]
    pub fn error(&self) -> Option<&HandlerError> {
        self.outcome.as_ref().err()
    }

    /// The outcome as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the captured handler error if the call failed.
    pub const fn outcome(&self) -> Result<&Value, &HandlerError> {
        self.outcome.as_ref()
    }

    /// Returns `true` if the call returned normally.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Returns `true` if the call failed.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        self.outcome.is_err()
    }

    /// When the call completed.
    #[must_use]
    pub const fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// How long the call took.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

// Errors are flattened to their message; the shared cause is not serializable.
impl Serialize for InvocationRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("InvocationRecord", 7)?;
        state.serialize_field("identifier", &self.identifier)?;
        state.serialize_field("sequence", &self.sequence)?;
        state.serialize_field("arguments", &self.arguments)?;
        state.serialize_field("result", &self.result())?;
        state.serialize_field("error", &self.error().map(HandlerError::message))?;
        state.serialize_field("completed_at", &self.completed_at)?;
        state.serialize_field("elapsed", &self.elapsed)?;
        state.end()
    }
}
