//! Base Provider trait and supporting types.

use crate::agents::provider_kind::ProviderKind;
use async_trait::async_trait;
use fp_protocol::events::CanonicalEvent;
use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

/// Stream of canonical events produced by one query.
///
/// Items are never `Result`s: every failure is delivered as a
/// [`CanonicalEvent::Error`] so consumers drive state without error handling.
pub type EventStream = Pin<Box<dyn Stream<Item = CanonicalEvent> + Send>>;

/// Everything a provider needs to run one query.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// The user instruction (prompt).
    pub prompt: String,

    /// Model identifier, passed through to the backend unchanged.
    pub model: String,

    /// Optional system prompt.
    pub system_prompt: Option<String>,

    /// Working directory of the agent.
    pub working_dir: PathBuf,

    /// Explicit environment overrides. These win over any credential source.
    pub env: HashMap<String, String>,
}

impl QueryOptions {
    /// Create options for the given prompt and model.
    ///
    /// Defaults:
    /// - system_prompt: none
    /// - working_dir: current directory
    /// - env: empty
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system_prompt: None,
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: HashMap::new(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Add one environment override.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{backend} CLI not found. Install it or set {override_var} to its path")]
    NotInstalled {
        backend: String,
        override_var: String,
    },
    #[error("{0} executor already has a running process")]
    AlreadyRunning(String),
    #[error("Failed to spawn {backend}: {message}")]
    Spawn { backend: String, message: String },
    #[error("{backend} exited with code {code}")]
    ExitCode { backend: String, code: i32 },
    #[error("{backend} was terminated by a signal")]
    Signaled { backend: String },
    #[error(
        "{backend} exited successfully but produced no output; \
         check that its credentials are configured"
    )]
    NoOutput { backend: String },
}

impl From<ProviderError> for CanonicalEvent {
    fn from(err: ProviderError) -> Self {
        CanonicalEvent::error(err.to_string())
    }
}

/// A backend able to answer queries with a stream of canonical events.
///
/// Implementations are either in-process or wrap a CLI subprocess through
/// [`AgentProcessExecutor`](crate::agents::executor::AgentProcessExecutor).
/// Each instance runs at most one query at a time.
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether the backend is installed and usable.
    async fn check_availability(&self) -> bool;

    /// Run a query. The returned stream is lazy and not resumable.
    fn execute_query(&self, options: QueryOptions) -> EventStream;

    /// Cancel the running query, if any. Events already yielded stay valid;
    /// nothing follows.
    fn abort(&self);
}

/// A stream yielding exactly one event.
pub(crate) fn single_event(event: CanonicalEvent) -> EventStream {
    Box::pin(tokio_stream::once(event))
}
