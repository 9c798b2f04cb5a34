//! In-process mock provider for testing.

use crate::agents::base::{EventStream, Provider, QueryOptions};
use crate::agents::provider_kind::ProviderKind;
use async_trait::async_trait;
use fp_protocol::events::CanonicalEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_stream::StreamExt;

/// Replays a fixed list of events for every query.
#[derive(Clone)]
pub struct MockProvider {
    available: bool,
    events: Vec<CanonicalEvent>,
    aborted: Arc<AtomicBool>,
}

impl MockProvider {
    pub fn new(available: bool, events: Vec<CanonicalEvent>) -> Self {
        Self {
            available,
            events,
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn success() -> Self {
        Self::new(
            true,
            vec![
                CanonicalEvent::SessionStart {
                    session_id: "mock-session".to_string(),
                },
                CanonicalEvent::assistant_thinking("Mock agent thinking"),
                CanonicalEvent::assistant_text("Mock response"),
                CanonicalEvent::Complete {
                    session_id: Some("mock-session".to_string()),
                },
            ],
        )
    }

    pub fn unavailable() -> Self {
        Self::new(false, vec![])
    }

    pub fn failing() -> Self {
        Self::new(
            true,
            vec![
                CanonicalEvent::assistant_thinking("Starting..."),
                CanonicalEvent::error("Mock failure"),
            ],
        )
    }

    /// Pick a scripted behavior from a `mock-*` model id.
    pub fn for_model(model: &str) -> Self {
        match model.to_lowercase().as_str() {
            "mock-failing" => Self::failing(),
            "mock-unavailable" => Self::unavailable(),
            _ => Self::success(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    async fn check_availability(&self) -> bool {
        self.available
    }

    fn execute_query(&self, _options: QueryOptions) -> EventStream {
        if !self.available {
            return Box::pin(tokio_stream::once(CanonicalEvent::error(
                "Mock provider not available",
            )));
        }

        self.aborted.store(false, Ordering::SeqCst);
        let aborted = Arc::clone(&self.aborted);
        let stream = tokio_stream::iter(self.events.clone())
            .take_while(move |_| !aborted.load(Ordering::SeqCst));
        Box::pin(stream)
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}
