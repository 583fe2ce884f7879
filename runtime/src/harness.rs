//! Registry of wrapped handlers.
//!
//! The [`Harness`] is created by a test (or a test fixture), receives the
//! handlers an external collaborator decides to observe, and hands out the
//! wrapped instances and their captured invocations by identifier.
//!
//! Each harness owns its registry; nothing is shared between harness values,
//! so tests running side by side never see each other's invocations.

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::metrics::{AWAIT_TIMEOUTS, counter};
use crate::spy::{CallThrough, SpyHandler};
use crate::store::InvocationStore;
use handler_harness_core::{Handler, InvocationRecord};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;

#[derive(Clone)]
struct Registration {
    spy: Arc<SpyHandler>,
    store: Arc<InvocationStore>,
}

/// Registry mapping handler identifiers to wrapped handlers and their records.
///
/// # Example
///
/// ```
/// use handler_harness_core::{args, handler_fn, Handler, Value};
/// use handler_harness_runtime::Harness;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let harness = Harness::new();
/// let spy = harness
///     .register("foo", Arc::new(handler_fn(|args: Vec<Value>| async move {
///         Ok(Value::from(args[0].as_str().unwrap_or_default().to_uppercase()))
///     })))
///     .unwrap();
///
/// // Normally the event source makes this call on a worker thread
/// spy.invoke(args!["x"]).await.unwrap();
///
/// let record = harness.await_next("foo", Duration::ZERO).await.unwrap().unwrap();
/// assert_eq!(record.arguments(), &[Value::from("x")]);
/// assert_eq!(record.result(), Some(&Value::from("X")));
/// # });
/// ```
pub struct Harness {
    config: HarnessConfig,
    registry: RwLock<HashMap<String, Registration>>,
}

impl Harness {
    /// Create a harness with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HarnessConfig::default())
    }

    /// Create a harness with the given configuration.
    #[must_use]
    pub fn with_config(config: HarnessConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(HashMap::new()),
        }
    }

    /// The harness configuration.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Wrap `handler` and register it under `identifier`.
    ///
    /// Uses the configured call-through policy.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::DuplicateIdentifier`] if `identifier` is taken
    /// - [`HarnessError::NotInterceptable`] if the handler cannot be wrapped
    pub fn register(
        &self,
        identifier: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Result<Arc<SpyHandler>> {
        self.register_with(identifier, handler, self.config.call_through)
    }

    /// Wrap `handler` with an explicit call-through policy and register it.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::DuplicateIdentifier`] if `identifier` is taken
    /// - [`HarnessError::NotInterceptable`] if the handler cannot be wrapped
    #[tracing::instrument(skip(self, identifier, handler), fields(identifier))]
    pub fn register_with(
        &self,
        identifier: impl Into<String>,
        handler: Arc<dyn Handler>,
        call_through: CallThrough,
    ) -> Result<Arc<SpyHandler>> {
        let identifier = identifier.into();
        tracing::Span::current().record("identifier", identifier.as_str());

        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if registry.contains_key(&identifier) {
            tracing::warn!("Rejected duplicate handler identifier");
            return Err(HarnessError::DuplicateIdentifier(identifier));
        }

        let store = Arc::new(InvocationStore::new(identifier.clone()));
        let spy = match SpyHandler::wrap(identifier.clone(), handler, call_through, Arc::clone(&store)) {
            Ok(spy) => Arc::new(spy),
            Err(error) => {
                tracing::warn!(%error, "Handler cannot be intercepted");
                return Err(error);
            }
        };

        registry.insert(
            identifier,
            Registration {
                spy: Arc::clone(&spy),
                store,
            },
        );
        tracing::info!(?call_through, "Registered handler");
        Ok(spy)
    }

    /// The wrapped handler registered under `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NotFound`] for an unknown identifier.
    pub fn get_wrapped(&self, identifier: &str) -> Result<Arc<SpyHandler>> {
        self.lookup(identifier).map(|registration| registration.spy)
    }

    /// The original, unwrapped handler registered under `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NotFound`] for an unknown identifier.
    pub fn get_delegate(&self, identifier: &str) -> Result<Arc<dyn Handler>> {
        self.lookup(identifier)
            .map(|registration| registration.spy.delegate())
    }

    /// The invocation store of `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NotFound`] for an unknown identifier.
    pub fn invocation_store(&self, identifier: &str) -> Result<Arc<InvocationStore>> {
        self.lookup(identifier)
            .map(|registration| registration.store)
    }

    /// Wait up to `timeout` for the next invocation of `identifier`.
    ///
    /// Returns `Ok(None)` if nothing arrived within the window. A zero
    /// timeout checks the queue once without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NotFound`] for an unknown identifier.
    #[tracing::instrument(skip(self))]
    pub async fn await_next(
        &self,
        identifier: &str,
        timeout: Duration,
    ) -> Result<Option<InvocationRecord>> {
        // Registry lock is released before waiting
        let store = self.invocation_store(identifier)?;

        let record = store.await_next(timeout).await;
        // A zero timeout is a poll, not a wait that ran out
        if record.is_none() && !timeout.is_zero() {
            counter!(AWAIT_TIMEOUTS, "identifier" => identifier.to_string()).increment(1);
        }
        Ok(record)
    }

    /// Wait for the next invocation of `identifier` using the configured default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NotFound`] for an unknown identifier.
    pub async fn await_next_default(&self, identifier: &str) -> Result<Option<InvocationRecord>> {
        self.await_next(identifier, self.config.default_timeout)
            .await
    }

    /// Wait for the next invocation, treating a timeout as an error.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::NotFound`] for an unknown identifier
    /// - [`HarnessError::TimedOut`] if nothing arrived within `timeout`
    pub async fn next_invocation(
        &self,
        identifier: &str,
        timeout: Duration,
    ) -> Result<InvocationRecord> {
        self.await_next(identifier, timeout)
            .await?
            .ok_or_else(|| HarnessError::TimedOut {
                identifier: identifier.to_string(),
                timeout,
            })
    }

    /// Returns `true` if a handler is registered under `identifier`.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.read().contains_key(identifier)
    }

    /// Registered identifiers, sorted.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = self.read().keys().cloned().collect();
        identifiers.sort_unstable();
        identifiers
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Discard every captured invocation that has not been consumed.
    ///
    /// Registrations stay in place; useful between scenarios sharing one harness.
    pub fn clear_invocations(&self) {
        let registry = self.read();
        for registration in registry.values() {
            registration.store.clear();
        }
        tracing::debug!(handlers = registry.len(), "Cleared captured invocations");
    }

    fn lookup(&self, identifier: &str) -> Result<Registration> {
        self.read()
            .get(identifier)
            .cloned()
            .ok_or_else(|| HarnessError::NotFound(identifier.to_string()))
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Registration>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("config", &self.config)
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let registry = self
            .registry
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        let unconsumed: usize = registry.values().map(|registration| registration.store.len()).sum();
        if unconsumed > 0 {
            tracing::debug!(unconsumed, "Harness dropped with unconsumed invocations");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use handler_harness_core::{Args, HandlerFuture, Interception, Value, args, handler_fn};
    use ::metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct TimeoutRecorder {
        timeouts: Arc<AtomicU64>,
    }

    impl Recorder for TimeoutRecorder {
        fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

        fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

        fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

        fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
            if key.name() == AWAIT_TIMEOUTS {
                Counter::from_arc(Arc::clone(&self.timeouts))
            } else {
                Counter::noop()
            }
        }

        fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    struct Sealed;

    impl Handler for Sealed {
        fn invoke(&self, _args: Args) -> HandlerFuture<'_> {
            Box::pin(async { Ok(Value::Null) })
        }

        fn interception(&self) -> Interception {
            Interception::sealed("final")
        }
    }

    fn echo() -> Arc<dyn Handler> {
        Arc::new(handler_fn(|args: Args| async move {
            Ok(args.into_iter().next().unwrap_or(Value::Null))
        }))
    }

    #[test]
    fn test_duplicate_identifier_is_rejected() {
        let harness = Harness::new();
        harness.register("foo", echo()).unwrap();

        let error = harness.register("foo", echo()).unwrap_err();
        assert_eq!(error, HarnessError::DuplicateIdentifier("foo".to_string()));
        assert_eq!(harness.len(), 1);
    }

    #[test]
    fn test_sealed_handler_is_rejected() {
        let harness = Harness::new();

        let error = harness.register("sealed", Arc::new(Sealed)).unwrap_err();
        assert_eq!(
            error,
            HarnessError::NotInterceptable {
                identifier: "sealed".to_string(),
                reason: "final".to_string(),
            }
        );
        assert!(!harness.contains("sealed"));
        assert!(harness.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_not_found() {
        let harness = Harness::new();

        assert!(matches!(harness.get_wrapped("nope"), Err(HarnessError::NotFound(_))));
        assert!(matches!(harness.get_delegate("nope"), Err(HarnessError::NotFound(_))));
        let error = harness.await_next("nope", Duration::ZERO).await.unwrap_err();
        assert_eq!(error, HarnessError::NotFound("nope".to_string()));
        assert!(!error.is_timeout());
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_from_not_found() {
        let harness = Harness::new();
        harness.register("foo", echo()).unwrap();

        assert_eq!(harness.await_next("foo", Duration::from_millis(10)).await, Ok(None));
        let error = harness.next_invocation("foo", Duration::ZERO).await.unwrap_err();
        assert!(error.is_timeout());
    }

    #[test]
    fn test_only_elapsed_waits_count_as_timeouts() {
        let recorder = TimeoutRecorder::default();
        let harness = Harness::new();
        harness.register("foo", echo()).unwrap();

        ::metrics::with_local_recorder(&recorder, || {
            tokio_test::block_on(async {
                assert_eq!(harness.await_next("foo", Duration::ZERO).await, Ok(None));
            });
        });
        assert_eq!(recorder.timeouts.load(Ordering::SeqCst), 0);

        ::metrics::with_local_recorder(&recorder, || {
            tokio_test::block_on(async {
                assert_eq!(harness.await_next("foo", Duration::from_millis(10)).await, Ok(None));
            });
        });
        assert_eq!(recorder.timeouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_wrapped_returns_registered_spy() {
        let harness = Harness::new();
        let spy = harness.register("foo", echo()).unwrap();

        let wrapped = harness.get_wrapped("foo").unwrap();
        assert!(Arc::ptr_eq(&spy, &wrapped));

        wrapped.invoke(args!["hello"]).await.unwrap();
        let record = harness.next_invocation("foo", Duration::ZERO).await.unwrap();
        assert_eq!(record.result(), Some(&Value::from("hello")));
    }

    #[tokio::test]
    async fn test_configured_call_through_applies_to_register() {
        let harness = Harness::with_config(
            HarnessConfig::builder()
                .call_through(CallThrough::Stubbed)
                .build(),
        );
        let spy = harness.register("foo", echo()).unwrap();

        assert_eq!(spy.call_through(), CallThrough::Stubbed);
        assert_eq!(spy.invoke(args!["hello"]).await, Ok(Value::Null));
    }

    #[tokio::test]
    async fn test_clear_invocations_keeps_registrations() {
        let harness = Harness::new();
        let spy = harness.register("foo", echo()).unwrap();
        spy.invoke(args!["a"]).await.unwrap();

        harness.clear_invocations();
        assert!(harness.contains("foo"));
        assert_eq!(harness.await_next("foo", Duration::ZERO).await, Ok(None));
        assert_eq!(harness.identifiers(), vec!["foo".to_string()]);
    }
}
