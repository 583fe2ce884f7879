//! The handler capability trait.
//!
//! Every handler the harness can observe implements [`Handler`]. The harness
//! itself intercepts calls by wrapping one `Handler` in another that exposes
//! the exact same contract, so callers cannot tell a wrapped handler from the
//! real one.

use crate::error::HandlerError;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Ordered argument values of one handler call.
pub type Args = Vec<Value>;

/// Boxed future returned by [`Handler::invoke`].
///
/// Boxing keeps [`Handler`] object-safe so handlers of different concrete
/// types can live side by side behind `Arc<dyn Handler>`.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send + 'a>>;

/// Whether a handler can be wrapped for interception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Calls can be observed by wrapping the handler.
    Supported,
    /// The handler refuses to be wrapped.
    Sealed {
        /// Why the handler cannot be wrapped
        reason: String,
    },
}

impl Interception {
    /// Create a sealed marker with the given reason.
    #[must_use]
    pub fn sealed(reason: impl Into<String>) -> Self {
        Self::Sealed {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the handler can be wrapped.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::Supported)
    }
}

/// A message handler invoked by an external event source.
///
/// # Thread Safety
///
/// Handlers are `Send + Sync`: the event source may invoke the same handler
/// from several worker threads at once.
///
/// # Example
///
/// ```
/// use handler_harness_core::{Args, Handler, HandlerFuture, Value};
///
/// struct Echo;
///
/// impl Handler for Echo {
///     fn invoke(&self, args: Args) -> HandlerFuture<'_> {
///         Box::pin(async move { Ok(args.into_iter().next().unwrap_or(Value::Null)) })
///     }
/// }
/// ```
pub trait Handler: Send + Sync {
    /// Handle one message.
    ///
    /// # Errors
    ///
    /// Returns the handler's own failure; the harness never adds errors of
    /// its own to this path.
    fn invoke(&self, args: Args) -> HandlerFuture<'_>;

    /// Report whether this handler can be wrapped.
    ///
    /// Defaults to [`Interception::Supported`]. Handlers whose calls must not
    /// be redirected override this to refuse registration up front.
    fn interception(&self) -> Interception {
        Interception::Supported
    }
}

/// Handler backed by an async closure.
///
/// Created with [`handler_fn`].
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    fn invoke(&self, args: Args) -> HandlerFuture<'_> {
        Box::pin((self.f)(args))
    }
}

/// Turn an async closure into a [`Handler`].
pub const fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    FnHandler { f }
}
