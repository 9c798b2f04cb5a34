//! Custom assertion helpers.

use fp_protocol::events::CanonicalEvent;
use fp_protocol::ipc::SessionEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Receive session events until the completion of `session_id`.
///
/// Panics if it does not arrive within `limit`.
#[allow(dead_code)]
pub async fn collect_until_completed(
    rx: &mut mpsc::Receiver<SessionEvent>,
    session_id: Uuid,
    limit: Duration,
) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .expect("Timed out waiting for completion")
            .expect("Event channel closed");
        let done = matches!(&event, SessionEvent::Completed { session_id: id, .. } if *id == session_id);
        events.push(event);
        if done {
            return events;
        }
    }
}

/// Concatenated output of `session_id`, in emission order.
#[allow(dead_code)]
pub fn output_of(events: &[SessionEvent], session_id: Uuid) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Output {
                session_id: id,
                content,
                ..
            } if *id == session_id => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

/// Assert an event is an error whose message contains `needle`.
#[allow(dead_code)]
pub fn assert_error_contains(event: &CanonicalEvent, needle: &str) {
    match event {
        CanonicalEvent::Error { message } => assert!(
            message.contains(needle),
            "Expected error containing '{needle}', got '{message}'"
        ),
        other => panic!("Expected error event, got {other:?}"),
    }
}
