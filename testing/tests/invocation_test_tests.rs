//! Tests for the invocation testing utilities

#![allow(clippy::unwrap_used)] // Tests can unwrap

use handler_harness_core::{HandlerError, Value, args};
use handler_harness_runtime::{CallThrough, CountingAnswer};
use handler_harness_testing::fixtures::{FAILING_INPUT, FAILURE_MESSAGE};
use handler_harness_testing::{InvocationTest, UppercaseHandler, init_test_tracing};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_stubbed_call_through_skips_body() {
    init_test_tracing();
    let handler = Arc::new(UppercaseHandler::new());

    InvocationTest::new("stubbed")
        .given_handler(handler.clone())
        .with_call_through(CallThrough::Stubbed)
        .when_invoked(args!["x"])
        .then_result(|result| assert_eq!(result, &Ok(Value::Null)))
        .then_record(|record| {
            assert_eq!(record.result(), Some(&Value::Null));
            assert_eq!(record.arg(0), Some(&Value::from("x")));
        })
        .run()
        .await;

    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn test_counting_answer_through_invocation_test() {
    init_test_tracing();
    let gate = Arc::new(CountingAnswer::new(1));

    InvocationTest::new("counted")
        .given_handler(Arc::new(UppercaseHandler::new()))
        .with_answer(gate.clone())
        .when_invoked(args![FAILING_INPUT])
        .then_result(|result| assert_eq!(result, &Err(HandlerError::new(FAILURE_MESSAGE))))
        .run()
        .await;

    // Failed calls still count down
    assert!(gate.wait(Duration::ZERO).await);
    assert_eq!(gate.errors(), vec![HandlerError::new(FAILURE_MESSAGE)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_handler_within_window() {
    InvocationTest::new("slow")
        .given_handler(Arc::new(UppercaseHandler::with_delay(Duration::from_millis(30))))
        .within(Duration::from_secs(5))
        .when_invoked(args!["slow"])
        .then_record(|record| {
            assert_eq!(record.result(), Some(&Value::from("SLOW")));
            assert!(record.elapsed() >= Duration::from_millis(30));
        })
        .run()
        .await;
}

#[tokio::test]
#[should_panic(expected = "Handler must be set")]
async fn test_missing_handler_panics() {
    InvocationTest::new("none").when_invoked(args![]).run().await;
}
