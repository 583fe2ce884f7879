//! Answer strategies installed on wrapped handlers.
//!
//! An [`Answer`] runs in place of the real handler body. It receives a
//! [`RealCall`] that can still reach the real body, so an answer may call
//! through, skip the body entirely, or post-process its result.
//!
//! Two answers ship with the harness and can also be used on their own:
//!
//! - [`CountingAnswer`]: calls through and counts down a release gate
//! - [`TransformAnswer`]: rewrites the value returned to the caller
//!
//! # Example
//!
//! ```
//! use handler_harness_core::{args, handler_fn, Value};
//! use handler_harness_runtime::answer::CountingAnswer;
//! use handler_harness_runtime::Harness;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let harness = Harness::new();
//! let spy = harness
//!     .register("audit", Arc::new(handler_fn(|_args| async { Ok(Value::Null) })))
//!     .unwrap();
//!
//! let gate = Arc::new(CountingAnswer::new(2));
//! spy.set_answer(gate.clone());
//!
//! use handler_harness_core::Handler;
//! spy.invoke(args!["a"]).await.unwrap();
//! spy.invoke(args!["b"]).await.unwrap();
//!
//! assert!(gate.wait(Duration::ZERO).await);
//! # });
//! ```

use handler_harness_core::{Args, Handler, HandlerError, HandlerFuture, Value};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// The intercepted call handed to an [`Answer`].
///
/// Gives access to the arguments and, through [`RealCall::call_real`], to the
/// real handler body.
pub struct RealCall<'a> {
    identifier: &'a str,
    arguments: &'a Args,
    delegate: &'a dyn Handler,
}

impl<'a> RealCall<'a> {
    /// Create a call for the given handler and arguments.
    #[must_use]
    pub const fn new(identifier: &'a str, arguments: &'a Args, delegate: &'a dyn Handler) -> Self {
        Self {
            identifier,
            arguments,
            delegate,
        }
    }

    /// Identifier of the handler being called.
    #[must_use]
    pub const fn identifier(&self) -> &str {
        self.identifier
    }

    /// Arguments of the call.
    #[must_use]
    pub const fn arguments(&self) -> &Args {
        self.arguments
    }

    /// Run the real handler body with a copy of the arguments.
    ///
    /// # Errors
    ///
    /// Returns whatever error the real handler fails with.
    pub async fn call_real(&self) -> Result<Value, HandlerError> {
        self.delegate.invoke(self.arguments.clone()).await
    }
}

impl std::fmt::Debug for RealCall<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealCall")
            .field("identifier", &self.identifier)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

/// Policy that runs in place of a real handler body.
pub trait Answer: Send + Sync {
    /// Produce the outcome of an intercepted call.
    ///
    /// # Errors
    ///
    /// Returns the error the caller of the wrapped handler should see.
    fn answer<'a>(&'a self, call: RealCall<'a>) -> HandlerFuture<'a>;
}

/// Calls through to the real handler and counts down a release gate.
///
/// The gate opens once the configured number of calls have completed and
/// stays open: every waiter is released, and later waits return at once.
/// Calls beyond the configured count still run the real body but no longer
/// change the gate.
///
/// A call counts whether the real body returned or failed; failures are kept
/// and can be inspected with [`CountingAnswer::errors`].
#[derive(Debug)]
pub struct CountingAnswer {
    remaining: watch::Sender<usize>,
    errors: Mutex<Vec<HandlerError>>,
}

impl CountingAnswer {
    /// Create a gate that opens after `count` calls.
    ///
    /// A count of zero creates a gate that is already open.
    #[must_use]
    pub fn new(count: usize) -> Self {
        let (remaining, _) = watch::channel(count);
        Self {
            remaining,
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Count one completed call.
    pub fn count_down(&self) {
        self.remaining.send_if_modified(|remaining| {
            if *remaining == 0 {
                return false;
            }
            *remaining -= 1;
            if *remaining == 0 {
                tracing::debug!("Countdown reached zero, releasing waiters");
            }
            true
        });
    }

    /// Calls still needed before the gate opens.
    #[must_use]
    pub fn remaining(&self) -> usize {
        *self.remaining.borrow()
    }

    /// Returns `true` once the gate has opened.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.remaining() == 0
    }

    /// Wait up to `timeout` for the gate to open.
    ///
    /// Returns `true` if the gate is open, `false` if the window elapsed
    /// first. An open gate is reported immediately, even for a zero timeout.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut receiver = self.remaining.subscribe();
        if *receiver.borrow_and_update() == 0 {
            return true;
        }
        if timeout.is_zero() {
            return false;
        }

        let released = matches!(
            tokio::time::timeout(timeout, receiver.wait_for(|remaining| *remaining == 0)).await,
            Ok(Ok(_))
        );
        if !released {
            tracing::debug!(remaining = self.remaining(), ?timeout, "Timed out waiting for countdown");
        }
        released
    }

    /// Errors raised by the real handler during counted calls.
    #[must_use]
    pub fn errors(&self) -> Vec<HandlerError> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Answer for CountingAnswer {
    fn answer<'a>(&'a self, call: RealCall<'a>) -> HandlerFuture<'a> {
        Box::pin(async move {
            let outcome = call.call_real().await;
            if let Err(error) = &outcome {
                self.errors
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(error.clone());
            }
            self.count_down();
            outcome
        })
    }
}

/// Function rewriting the value returned to the caller.
///
/// Receives the call arguments and the real result (absent when the answer
/// does not call through).
type TransformFn = dyn Fn(&Args, Option<Value>) -> Value + Send + Sync;

/// Replaces the returned value with the output of a function.
///
/// With call-through enabled the real body runs first and its value is passed
/// to the function; if the real body fails, the error is returned unchanged
/// and the function is not called. With call-through disabled the real body
/// never runs and the function sees no prior result.
pub struct TransformAnswer {
    call_through: bool,
    transform: Box<TransformFn>,
}

impl TransformAnswer {
    /// Create a transforming answer.
    pub fn new<F>(call_through: bool, transform: F) -> Self
    where
        F: Fn(&Args, Option<Value>) -> Value + Send + Sync + 'static,
    {
        Self {
            call_through,
            transform: Box::new(transform),
        }
    }

    /// Transform the real result.
    pub fn calling_real<F>(transform: F) -> Self
    where
        F: Fn(&Args, Option<Value>) -> Value + Send + Sync + 'static,
    {
        Self::new(true, transform)
    }

    /// Compute the result from the arguments alone, skipping the real body.
    pub fn without_real<F>(transform: F) -> Self
    where
        F: Fn(&Args) -> Value + Send + Sync + 'static,
    {
        Self::new(false, move |args, _| transform(args))
    }

    /// Whether the real body runs before the transform.
    #[must_use]
    pub const fn calls_through(&self) -> bool {
        self.call_through
    }
}

impl std::fmt::Debug for TransformAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformAnswer")
            .field("call_through", &self.call_through)
            .finish_non_exhaustive()
    }
}

impl Answer for TransformAnswer {
    fn answer<'a>(&'a self, call: RealCall<'a>) -> HandlerFuture<'a> {
        Box::pin(async move {
            let prior = if self.call_through {
                Some(call.call_real().await?)
            } else {
                None
            };
            Ok::<_, HandlerError>((self.transform)(call.arguments(), prior))
        })
    }
}
