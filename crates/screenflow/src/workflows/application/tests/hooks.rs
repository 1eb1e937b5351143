use std::sync::Arc;
use std::time::Duration;

use crate::workflows::application::domain::{ReviewDecision, ReviewToken, SubjectId};
use crate::workflows::application::hooks::{HookChannel, HookError, ReviewEvent};

fn token(subject: u64) -> ReviewToken {
    ReviewToken::for_subject(SubjectId(subject))
}

fn approval() -> ReviewEvent {
    ReviewEvent {
        decision: ReviewDecision::Approved,
        reason: Some("income verified".to_string()),
    }
}

#[test]
fn tokens_are_derived_from_the_subject() {
    assert_eq!(token(42).as_str(), "app-42");
}

#[tokio::test]
async fn delivery_before_wait_is_retained() {
    let channel = HookChannel::new();
    let token = token(1);

    channel.deliver(&token, approval()).expect("delivery retained");

    let event = channel.wait(&token).await.expect("retained event consumed");
    assert_eq!(event.decision, ReviewDecision::Approved);
    assert_eq!(event.reason.as_deref(), Some("income verified"));
}

#[tokio::test]
async fn wait_before_delivery_is_woken() {
    let channel = Arc::new(HookChannel::new());
    let token = token(2);

    let waiter = {
        let channel = channel.clone();
        let token = token.clone();
        tokio::spawn(async move { channel.wait(&token).await })
    };

    // Let the waiter park before the event arrives.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(channel.is_waiting(&token));

    channel.deliver(&token, approval()).expect("delivered to waiter");

    let event = waiter
        .await
        .expect("waiter task joins")
        .expect("waiter receives event");
    assert_eq!(event.decision, ReviewDecision::Approved);
    assert!(!channel.is_waiting(&token));
}

#[tokio::test]
async fn second_retained_delivery_is_refused() {
    let channel = HookChannel::new();
    let token = token(3);

    channel.deliver(&token, approval()).expect("first retained");

    match channel.deliver(
        &token,
        ReviewEvent {
            decision: ReviewDecision::Rejected,
            reason: None,
        },
    ) {
        Err(HookError::AlreadyQueued { token }) => assert_eq!(token, "app-3"),
        other => panic!("expected queued-event refusal, got {other:?}"),
    }

    // The original event is untouched.
    let event = channel.wait(&token).await.expect("first event survives");
    assert_eq!(event.decision, ReviewDecision::Approved);
}

#[tokio::test]
async fn concurrent_second_waiter_is_refused() {
    let channel = Arc::new(HookChannel::<ReviewEvent>::new());
    let token = token(4);

    let first = {
        let channel = channel.clone();
        let token = token.clone();
        tokio::spawn(async move { channel.wait(&token).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    match channel.wait(&token).await {
        Err(HookError::AlreadyWaiting { token }) => assert_eq!(token, "app-4"),
        other => panic!("expected second-waiter refusal, got {other:?}"),
    }

    // First waiter is still parked and still serviceable.
    channel.deliver(&token, approval()).expect("delivered");
    first
        .await
        .expect("waiter task joins")
        .expect("first waiter wins the event");
}

#[tokio::test]
async fn cancel_wakes_the_waiter_with_an_error() {
    let channel = Arc::new(HookChannel::<ReviewEvent>::new());
    let token = token(5);

    let waiter = {
        let channel = channel.clone();
        let token = token.clone();
        tokio::spawn(async move { channel.wait(&token).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(channel.cancel(&token), "a parked slot existed");

    match waiter.await.expect("waiter task joins") {
        Err(HookError::Cancelled { token }) => assert_eq!(token, "app-5"),
        other => panic!("expected cancellation error, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_discards_a_retained_event() {
    let channel = HookChannel::new();
    let token = token(6);

    channel.deliver(&token, approval()).expect("retained");
    assert!(channel.cancel(&token));
    assert!(!channel.cancel(&token), "slot already discarded");

    // A fresh delivery after the discard behaves like the first.
    channel
        .deliver(
            &token,
            ReviewEvent {
                decision: ReviewDecision::Rejected,
                reason: None,
            },
        )
        .expect("channel reusable after cancel");
    let event = channel.wait(&token).await.expect("new event consumed");
    assert_eq!(event.decision, ReviewDecision::Rejected);
}

#[tokio::test]
async fn tokens_do_not_cross_subjects() {
    let channel = Arc::new(HookChannel::new());
    let first = token(7);
    let second = token(8);

    channel.deliver(&first, approval()).expect("retained for first");

    let waiter = {
        let channel = channel.clone();
        let second = second.clone();
        tokio::spawn(async move { channel.wait(&second).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The retained event for another token must not satisfy this wait.
    assert!(channel.is_waiting(&second));

    channel
        .deliver(
            &second,
            ReviewEvent {
                decision: ReviewDecision::Rejected,
                reason: None,
            },
        )
        .expect("delivered to second");
    let event = waiter.await.expect("join").expect("event for second");
    assert_eq!(event.decision, ReviewDecision::Rejected);

    let event = channel.wait(&first).await.expect("event for first intact");
    assert_eq!(event.decision, ReviewDecision::Approved);
}
