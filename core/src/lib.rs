//! # Handler Harness Core
//!
//! Core traits and types for observing asynchronously invoked message handlers.
//!
//! A message handler is anything that can be invoked with an ordered list of
//! argument values and produces either a value or an error. The harness wraps
//! such handlers so that every completed call is captured as an
//! [`InvocationRecord`] the test thread can wait for.
//!
//! ## Core Concepts
//!
//! - **Handler**: The capability trait `invoke(args) -> Result<Value, HandlerError>`
//! - **Interception**: Whether a handler can be wrapped by the harness
//! - **Invocation record**: Arguments and outcome of one completed call
//!
//! ## Example
//!
//! ```
//! use handler_harness_core::{args, handler_fn, Handler, HandlerError, Value};
//!
//! # tokio_test::block_on(async {
//! let upper = handler_fn(|args: Vec<Value>| async move {
//!     match args.first().and_then(Value::as_str) {
//!         Some(text) => Ok(Value::from(text.to_uppercase())),
//!         None => Err(HandlerError::new("missing argument")),
//!     }
//! });
//!
//! let result = upper.invoke(args!["x"]).await;
//! assert_eq!(result, Ok(Value::from("X")));
//! # });
//! ```

pub mod error;
pub mod handler;
pub mod invocation;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::HandlerError;
pub use handler::{Args, FnHandler, Handler, HandlerFuture, Interception, handler_fn};
pub use invocation::InvocationRecord;
pub use serde_json::Value;

/// Build an argument list from anything convertible into a [`Value`].
///
/// ```
/// use handler_harness_core::{args, Value};
///
/// let list = args!["order-1", 3, true];
/// assert_eq!(list, vec![Value::from("order-1"), Value::from(3), Value::from(true)]);
/// assert!(args![].is_empty());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($arg)),+]
    };
}
