//! Property tests for concurrent delivery through the harness

#![allow(clippy::unwrap_used, clippy::expect_used)] // Tests can unwrap

use handler_harness_core::{Handler, Value, args};
use handler_harness_runtime::Harness;
use handler_harness_testing::{UppercaseHandler, deliver_all};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Deliver `messages` concurrently and return (captured arguments, captured sequences).
fn deliver_batch(messages: &[String]) -> (Vec<String>, Vec<u64>) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("runtime builds");

    runtime.block_on(async {
        let harness = Harness::new();
        let handler: Arc<dyn Handler> = harness
            .register("batch", Arc::new(UppercaseHandler::new()))
            .unwrap();

        let batch = messages.iter().map(|message| args![message.as_str()]);
        for delivery in deliver_all(&handler, batch) {
            delivery.await.unwrap().unwrap();
        }

        let mut arguments = Vec::new();
        let mut sequences = Vec::new();
        while let Some(record) = harness.await_next("batch", Duration::ZERO).await.unwrap() {
            arguments.push(record.arg(0).and_then(Value::as_str).unwrap().to_string());
            sequences.push(record.sequence());
        }
        (arguments, sequences)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_concurrent_batch_is_captured_exactly_once(messages in prop::collection::vec("[a-z]{1,8}", 0..24)) {
        let (mut captured, sequences) = deliver_batch(&messages);

        // Every message captured once, whatever order the workers finished in
        let mut expected = messages.clone();
        expected.sort();
        captured.sort();
        prop_assert_eq!(captured, expected);

        // Sequence numbers follow queue order with no gaps
        let numbered: Vec<u64> = (0..sequences.len() as u64).collect();
        prop_assert_eq!(sequences, numbered);
    }
}
