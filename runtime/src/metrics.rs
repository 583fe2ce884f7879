//! Metric names recorded by the harness.
//!
//! Counters are emitted through the [`metrics`] facade and are no-ops until a
//! recorder is installed, so tests pay nothing for them by default. A test
//! suite that wants to inspect them installs its own recorder and calls
//! [`describe_metrics`] once.

use metrics::describe_counter;

// Re-export metrics macros for use in other modules
pub use metrics::counter;

/// Invocations captured by wrapped handlers, labelled by `identifier`.
pub const INVOCATIONS_CAPTURED: &str = "handler_harness_invocations_captured_total";

/// Captured invocations whose real body failed or panicked, labelled by `identifier`.
pub const HANDLER_ERRORS: &str = "handler_harness_handler_errors_total";

/// Bounded waits that elapsed without a record, labelled by `identifier`.
///
/// Zero-timeout polls that find nothing are not counted.
pub const AWAIT_TIMEOUTS: &str = "handler_harness_await_timeouts_total";

/// Register descriptions for every harness metric.
pub fn describe_metrics() {
    describe_counter!(
        INVOCATIONS_CAPTURED,
        "Total number of handler invocations captured by the harness"
    );
    describe_counter!(
        HANDLER_ERRORS,
        "Total number of captured invocations that ended in an error"
    );
    describe_counter!(
        AWAIT_TIMEOUTS,
        "Total number of waits for an invocation that timed out"
    );
}
