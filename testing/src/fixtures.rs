//! Sample handlers and a simulated event source.

use handler_harness_core::{Args, Handler, HandlerError, HandlerFuture, Interception, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Argument that makes [`UppercaseHandler`] fail.
pub const FAILING_INPUT: &str = "ex";

/// Message of the error [`UppercaseHandler`] fails with.
pub const FAILURE_MESSAGE: &str = "boom";

/// Handler that upper-cases its first argument.
///
/// - `"x"` returns `"X"`
/// - [`FAILING_INPUT`] fails with [`FAILURE_MESSAGE`]
/// - a missing or non-string argument returns `Value::Null`
///
/// Counts how often its body actually ran, so tests can tell whether a call
/// went through to the real handler.
#[derive(Debug, Default)]
pub struct UppercaseHandler {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl UppercaseHandler {
    /// Create a handler that answers immediately.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Create a handler that sleeps for `delay` before answering.
    #[must_use]
    pub const fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    /// How many times the body has run.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Handler for UppercaseHandler {
    fn invoke(&self, args: Args) -> HandlerFuture<'_> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match args.first().and_then(Value::as_str) {
                Some(FAILING_INPUT) => Err(HandlerError::new(FAILURE_MESSAGE)),
                Some(text) => Ok(Value::from(text.to_uppercase())),
                None => Ok(Value::Null),
            }
        })
    }
}

/// Handler that refuses to be wrapped.
#[derive(Debug, Clone, Default)]
pub struct SealedHandler;

impl Handler for SealedHandler {
    fn invoke(&self, _args: Args) -> HandlerFuture<'_> {
        Box::pin(async { Ok(Value::Null) })
    }

    fn interception(&self) -> Interception {
        Interception::sealed("handler is sealed")
    }
}

/// Deliver one message to `handler` on a worker task, like a transport would.
pub fn deliver(handler: Arc<dyn Handler>, args: Args) -> JoinHandle<Result<Value, HandlerError>> {
    tokio::spawn(async move { handler.invoke(args).await })
}

/// Deliver every message concurrently, each on its own worker task.
pub fn deliver_all(
    handler: &Arc<dyn Handler>,
    messages: impl IntoIterator<Item = Args>,
) -> Vec<JoinHandle<Result<Value, HandlerError>>> {
    messages
        .into_iter()
        .map(|args| deliver(Arc::clone(handler), args))
        .collect()
}
