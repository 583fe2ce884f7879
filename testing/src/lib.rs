//! # Handler Harness Testing
//!
//! Fixtures and helpers for tests written against the handler harness.
//!
//! This crate provides:
//! - Sample handlers with well-known behavior ([`fixtures`])
//! - A simulated event source delivering calls on worker tasks
//! - A Given-When-Then helper for single-invocation scenarios ([`InvocationTest`])
//! - Tracing setup for test output
//!
//! ## Example
//!
//! ```
//! use handler_harness_core::{args, Value};
//! use handler_harness_testing::{InvocationTest, UppercaseHandler};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! InvocationTest::new("foo")
//!     .given_handler(Arc::new(UppercaseHandler::new()))
//!     .when_invoked(args!["x"])
//!     .then_result(|result| assert_eq!(result, &Ok(Value::from("X"))))
//!     .then_record(|record| assert_eq!(record.arguments(), &[Value::from("x")]))
//!     .run()
//!     .await;
//! # });
//! ```

pub mod fixtures;

use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG` and falls back to `warn`. Output goes through the test
/// writer so it is captured per test. Safe to call from every test.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Another test may already have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use fixtures::{SealedHandler, UppercaseHandler, deliver, deliver_all};
pub use invocation_test::InvocationTest;
