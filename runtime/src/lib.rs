//! # Handler Harness Runtime
//!
//! Capture and synchronization for asynchronously invoked message handlers.
//!
//! A test registers the handlers it wants to observe with a [`Harness`]. The
//! harness wraps each one in a [`SpyHandler`] that the event source calls in
//! place of the real handler. Every completed call lands as an
//! [`InvocationRecord`](handler_harness_core::InvocationRecord) in the
//! [`InvocationStore`] of its identifier, where the test can wait for it with
//! a bounded timeout.
//!
//! # Architecture
//!
//! ```text
//! event source ──► SpyHandler ──► (Answer) ──► real handler
//!                      │
//!                      ▼
//!               InvocationStore ◄── Harness::await_next(id, timeout) ◄── test
//! ```
//!
//! # Waiting
//!
//! Only two operations ever wait, and both take an explicit timeout:
//!
//! - [`InvocationStore::await_next`] / [`Harness::await_next`]
//! - [`CountingAnswer::wait`]
//!
//! Running out of time is an ordinary outcome (`None` / `false`), never a hang.
//!
//! # Example
//!
//! ```
//! use handler_harness_core::{args, handler_fn, Handler, HandlerError, Value};
//! use handler_harness_runtime::Harness;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let harness = Harness::new();
//! let spy = harness
//!     .register("listener", Arc::new(handler_fn(|_args| async {
//!         Err(HandlerError::new("boom"))
//!     })))
//!     .unwrap();
//!
//! // The error reaches the caller unchanged ...
//! assert_eq!(spy.invoke(args!["ex"]).await, Err(HandlerError::new("boom")));
//!
//! // ... and is captured as well
//! let record = harness.next_invocation("listener", Duration::ZERO).await.unwrap();
//! assert_eq!(record.error().map(HandlerError::message), Some("boom"));
//! assert!(record.result().is_none());
//! # });
//! ```

pub mod answer;
pub mod config;
pub mod error;
pub mod harness;
pub mod metrics;
pub mod spy;
pub mod store;

pub use answer::{Answer, CountingAnswer, RealCall, TransformAnswer};
pub use config::{HarnessConfig, HarnessConfigBuilder};
pub use error::{HarnessError, Result};
pub use harness::Harness;
pub use spy::{CallThrough, SpyHandler};
pub use store::InvocationStore;
