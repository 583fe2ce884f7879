//! Interception of handler calls.
//!
//! [`SpyHandler`] decorates a real [`Handler`] and implements the same trait,
//! so the event source calls it exactly as it would call the real handler.
//! Every completed call is captured as an [`InvocationRecord`] and pushed to
//! the [`InvocationStore`] of the handler's identifier.
//!
//! # Call flow
//!
//! ```text
//! caller ──► SpyHandler::invoke(args)
//!              │  snapshot args
//!              ▼
//!            answer installed? ──yes──► Answer::answer(RealCall)
//!              │ no                         │ (may call the real body)
//!              ▼                            │
//!            CallThrough::Real ──► real body│
//!              │                            │
//!              ▼                            ▼
//!            capture outcome ──► InvocationStore::push(record)
//!              │
//!              ▼
//!            same outcome returned to the caller
//! ```

use crate::answer::{Answer, RealCall};
use crate::error::HarnessError;
use crate::metrics::{HANDLER_ERRORS, INVOCATIONS_CAPTURED, counter};
use crate::store::InvocationStore;
use futures::FutureExt;
use handler_harness_core::{
    Args, Handler, HandlerError, HandlerFuture, Interception, InvocationRecord, Value,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// Whether a wrapped handler runs its real body when no answer is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallThrough {
    /// Run the real body.
    #[default]
    Real,
    /// Skip the real body and return `Value::Null`.
    Stubbed,
}

/// A handler whose calls are captured.
///
/// Obtained from [`Harness::register`](crate::Harness::register) or
/// [`SpyHandler::wrap`]. Tests use it to install answers and to invoke the
/// handler directly.
pub struct SpyHandler {
    identifier: String,
    delegate: Arc<dyn Handler>,
    call_through: CallThrough,
    answer: RwLock<Option<Arc<dyn Answer>>>,
    store: Arc<InvocationStore>,
    invocations: AtomicU64,
}

impl SpyHandler {
    /// Wrap `delegate` so that its calls are captured into `store`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NotInterceptable`] if the handler refuses to be
    /// wrapped, which includes handlers that are already spies.
    pub fn wrap(
        identifier: impl Into<String>,
        delegate: Arc<dyn Handler>,
        call_through: CallThrough,
        store: Arc<InvocationStore>,
    ) -> Result<Self, HarnessError> {
        let identifier = identifier.into();
        if let Interception::Sealed { reason } = delegate.interception() {
            return Err(HarnessError::NotInterceptable { identifier, reason });
        }

        Ok(Self {
            identifier,
            delegate,
            call_through,
            answer: RwLock::new(None),
            store,
            invocations: AtomicU64::new(0),
        })
    }

    /// Identifier this handler was registered under.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The real, unwrapped handler.
    #[must_use]
    pub fn delegate(&self) -> Arc<dyn Handler> {
        Arc::clone(&self.delegate)
    }

    /// Call-through policy used when no answer is installed.
    #[must_use]
    pub const fn call_through(&self) -> CallThrough {
        self.call_through
    }

    /// Store receiving this handler's records.
    #[must_use]
    pub fn store(&self) -> Arc<InvocationStore> {
        Arc::clone(&self.store)
    }

    /// Install an answer that runs in place of the real body.
    ///
    /// Replaces any previously installed answer. Calls already in flight keep
    /// the answer they started with.
    pub fn set_answer(&self, answer: Arc<dyn Answer>) {
        *self.answer.write().unwrap_or_else(PoisonError::into_inner) = Some(answer);
    }

    /// Remove the installed answer, restoring the call-through policy.
    pub fn clear_answer(&self) {
        *self.answer.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Number of calls that have completed so far.
    #[must_use]
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::Acquire)
    }

    fn current_answer(&self) -> Option<Arc<dyn Answer>> {
        self.answer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn intercept(&self, args: Args) -> Result<Value, HandlerError> {
        let started = Instant::now();
        // Owned copy: the real body consumes `args` and may rebuild it freely
        let snapshot = args.clone();

        let outcome = AssertUnwindSafe(self.dispatch(args)).catch_unwind().await;
        match outcome {
            Ok(result) => {
                self.capture(snapshot, result.clone(), started);
                result
            }
            Err(payload) => {
                let error = HandlerError::new(panic_message(payload.as_ref()));
                self.capture(snapshot, Err(error), started);
                std::panic::resume_unwind(payload)
            }
        }
    }

    async fn dispatch(&self, args: Args) -> Result<Value, HandlerError> {
        if let Some(answer) = self.current_answer() {
            tracing::trace!(identifier = %self.identifier, "Delegating call to installed answer");
            return answer
                .answer(RealCall::new(&self.identifier, &args, self.delegate.as_ref()))
                .await;
        }

        match self.call_through {
            CallThrough::Real => self.delegate.invoke(args).await,
            CallThrough::Stubbed => Ok(Value::Null),
        }
    }

    fn capture(&self, arguments: Args, outcome: Result<Value, HandlerError>, started: Instant) {
        let failed = outcome.is_err();
        let elapsed = started.elapsed();

        counter!(INVOCATIONS_CAPTURED, "identifier" => self.identifier.clone()).increment(1);
        if failed {
            counter!(HANDLER_ERRORS, "identifier" => self.identifier.clone()).increment(1);
        }
        // Counted before the push so a woken consumer never sees a stale count
        self.invocations.fetch_add(1, Ordering::AcqRel);

        let sequence = self.store.push_with(|sequence| {
            InvocationRecord::new(self.identifier.clone(), sequence, arguments, outcome, elapsed)
        });
        tracing::debug!(
            identifier = %self.identifier,
            sequence,
            failed,
            ?elapsed,
            "Captured invocation"
        );
    }
}

impl Handler for SpyHandler {
    fn invoke(&self, args: Args) -> HandlerFuture<'_> {
        Box::pin(self.intercept(args))
    }

    fn interception(&self) -> Interception {
        Interception::sealed(format!(
            "handler is already intercepted as '{}'",
            self.identifier
        ))
    }
}

impl std::fmt::Debug for SpyHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpyHandler")
            .field("identifier", &self.identifier)
            .field("call_through", &self.call_through)
            .field("invocations", &self.invocation_count())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
