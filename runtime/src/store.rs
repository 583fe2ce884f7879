//! Per-handler queue of captured invocations.
//!
//! Producers (wrapped handlers running on worker threads) push records without
//! ever blocking; the consumer (the test) waits for the next record with an
//! explicit timeout.
//!
//! # Example
//!
//! ```
//! use handler_harness_core::{InvocationRecord, Value};
//! use handler_harness_runtime::store::InvocationStore;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let store = InvocationStore::new("orders");
//! store.push(InvocationRecord::new("orders", 0, vec![], Ok(Value::Null), Duration::ZERO));
//!
//! // Present records are returned even with a zero timeout
//! assert!(store.await_next(Duration::ZERO).await.is_some());
//! assert!(store.await_next(Duration::from_millis(10)).await.is_none());
//! # });
//! ```

use handler_harness_core::InvocationRecord;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// FIFO of [`InvocationRecord`]s for one handler identifier.
///
/// Records come out in the order they were pushed, which is the order the
/// underlying calls completed. Each record is handed to exactly one consumer.
///
/// Sequence numbers handed out by [`InvocationStore::push_with`] are taken
/// under the queue lock, so they increase in exactly the order records come
/// out.
///
/// The queue lock is only ever held for a push or a pop, never across an
/// `.await`.
#[derive(Debug)]
pub struct InvocationStore {
    identifier: String,
    queue: Mutex<Queue>,
    available: Notify,
}

#[derive(Debug, Default)]
struct Queue {
    records: VecDeque<InvocationRecord>,
    next_sequence: u64,
}

impl InvocationStore {
    /// Create an empty store for the given handler identifier.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            queue: Mutex::new(Queue::default()),
            available: Notify::new(),
        }
    }

    /// Identifier this store collects invocations for.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Sequence number the next [`push_with`](Self::push_with) will hand out.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.lock().next_sequence
    }

    /// Append a record built around the next sequence number and wake one
    /// waiting consumer.
    ///
    /// `build` runs under the queue lock and should do nothing but construct
    /// the record. Returns the sequence number handed to `build`.
    pub fn push_with<F>(&self, build: F) -> u64
    where
        F: FnOnce(u64) -> InvocationRecord,
    {
        let (sequence, depth) = {
            let mut queue = self.lock();
            let sequence = queue.next_sequence;
            queue.next_sequence += 1;
            queue.records.push_back(build(sequence));
            (sequence, queue.records.len())
        };
        tracing::trace!(identifier = %self.identifier, sequence, depth, "Invocation queued");
        self.available.notify_one();
        sequence
    }

    /// Append an already built record and wake one waiting consumer.
    ///
    /// The record keeps the sequence number it was built with; numbering of
    /// [`push_with`](Self::push_with) is unaffected. Never blocks beyond the
    /// queue lock and never fails.
    pub fn push(&self, record: InvocationRecord) {
        let depth = {
            let mut queue = self.lock();
            queue.records.push_back(record);
            queue.records.len()
        };
        tracing::trace!(identifier = %self.identifier, depth, "Invocation queued");
        self.available.notify_one();
    }

    /// Pop the oldest record without waiting.
    #[must_use]
    pub fn try_next(&self) -> Option<InvocationRecord> {
        let (record, more) = {
            let mut queue = self.lock();
            let record = queue.records.pop_front();
            (record, !queue.records.is_empty())
        };
        // Pass the wakeup on so a second consumer does not sleep on a non-empty queue
        if record.is_some() && more {
            self.available.notify_one();
        }
        record
    }

    /// Wait up to `timeout` for the next record.
    ///
    /// A record that is already queued is returned immediately, even when
    /// `timeout` is zero. Returns `None` if nothing arrived within the window;
    /// the store is left untouched in that case, so a record pushed later is
    /// still available to the next call.
    pub async fn await_next(&self, timeout: Duration) -> Option<InvocationRecord> {
        if let Some(record) = self.try_next() {
            return Some(record);
        }
        if timeout.is_zero() {
            return None;
        }

        if let Ok(record) = tokio::time::timeout(timeout, self.wait_for_record()).await {
            Some(record)
        } else {
            tracing::debug!(identifier = %self.identifier, ?timeout, "Timed out waiting for invocation");
            None
        }
    }

    /// Wait without bound for the next record.
    async fn wait_for_record(&self) -> InvocationRecord {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register interest before checking so a concurrent push cannot slip between
            notified.as_mut().enable();

            if let Some(record) = self.try_next() {
                return record;
            }
            notified.await;
        }
    }

    /// Number of records waiting to be consumed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Returns `true` if no records are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Remove and return every waiting record, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<InvocationRecord> {
        self.lock().records.drain(..).collect()
    }

    /// Discard every waiting record.
    ///
    /// Sequence numbering continues where it left off.
    pub fn clear(&self) {
        self.lock().records.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        // A panicking consumer cannot leave the deque half-updated
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use handler_harness_core::Value;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn push_value(store: &InvocationStore, value: i64) -> u64 {
        store.push_with(|sequence| {
            InvocationRecord::new(
                store.identifier(),
                sequence,
                vec![Value::from(value)],
                Ok(Value::from(value)),
                Duration::ZERO,
            )
        })
    }

    #[tokio::test]
    async fn test_zero_timeout_polls_once() {
        let store = InvocationStore::new("foo");
        assert!(store.await_next(Duration::ZERO).await.is_none());

        push_value(&store, 1);
        let next = store.await_next(Duration::ZERO).await.unwrap();
        assert_eq!(next.arg(0), Some(&Value::from(1)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_leaves_late_record_available() {
        let store = InvocationStore::new("foo");
        assert!(store.await_next(Duration::from_millis(20)).await.is_none());

        push_value(&store, 7);
        assert_eq!(store.len(), 1);
        let next = store.await_next(Duration::ZERO).await.unwrap();
        assert_eq!(next.sequence(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_waiter_is_woken_by_push() {
        let store = Arc::new(InvocationStore::new("foo"));

        let producer = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            push_value(&producer, 42);
        });

        let next = store.await_next(Duration::from_secs(5)).await.unwrap();
        assert_eq!(next.result(), Some(&Value::from(42)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumers_partition_records() {
        const RECORDS: i64 = 200;
        let store = Arc::new(InvocationStore::new("foo"));

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Some(record) = store.await_next(Duration::from_millis(200)).await {
                        seen.push(record.sequence());
                    }
                    seen
                })
            })
            .collect();

        for value in 0..RECORDS {
            push_value(&store, value);
            if value % 16 == 0 {
                tokio::task::yield_now().await;
            }
        }

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        all.sort_unstable();

        let expected: Vec<u64> = (0..u64::try_from(RECORDS).unwrap()).collect();
        assert_eq!(all, expected, "every record delivered exactly once");
    }

    #[test]
    fn test_drain_and_clear() {
        let store = InvocationStore::new("foo");
        for value in 0..3 {
            push_value(&store, value);
        }

        let drained = store.drain();
        assert_eq!(drained.len(), 3);
        assert!(store.is_empty());

        assert_eq!(push_value(&store, 3), 3);
        store.clear();
        assert!(store.try_next().is_none());
        // Numbering is not reset by clearing
        assert_eq!(store.next_sequence(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_racing_producers_keep_sequence_in_queue_order() {
        let store = Arc::new(InvocationStore::new("foo"));

        let producers: Vec<_> = (0..8)
            .map(|producer| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for value in 0..100 {
                        push_value(&store, producer * 1000 + value);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }

        let sequences: Vec<u64> = store.drain().iter().map(InvocationRecord::sequence).collect();
        assert_eq!(sequences.len(), 800);
        assert!(
            sequences.windows(2).all(|pair| pair[0] < pair[1]),
            "sequence numbers must increase in queue order"
        );
    }

    proptest! {
        #[test]
        fn prop_records_come_out_in_push_order(values in prop::collection::vec(any::<i64>(), 0..64)) {
            let store = InvocationStore::new("prop");
            for value in &values {
                push_value(&store, *value);
            }

            let mut popped = Vec::new();
            while let Some(record) = store.try_next() {
                prop_assert_eq!(record.identifier(), "prop");
                popped.push(record.result().and_then(Value::as_i64).unwrap());
            }
            prop_assert_eq!(popped, values);
        }
    }
}
