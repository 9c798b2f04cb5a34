//! Provider registry: maps a model id to a provider instance.
//!
//! The registry is a plain lookup table of `(pattern, kind)` routes. The
//! first matching route picks the [`ProviderKind`]; a `match` on the kind
//! constructs the provider.

use crate::agents::adapters::claude_adapter::CLAUDE_BACKEND;
use crate::agents::adapters::codex_adapter::CODEX_BACKEND;
use crate::agents::adapters::{ClaudeProvider, CodexProvider, MockProvider};
use crate::agents::base::{EventStream, Provider, QueryOptions};
use crate::agents::executor::{AgentProcessExecutor, BackendSpec, DEFAULT_LIVENESS};
use crate::agents::provider_kind::{route, ModelPattern, ProviderKind, DEFAULT_ROUTES};
use crate::agents::resolver::{CredentialSource, EnvCredentials, ExecutableResolver, PathResolver};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Downstream collaborators shared by every CLI provider.
#[derive(Clone)]
pub struct ProviderContext {
    pub resolver: Arc<dyn ExecutableResolver>,
    pub credentials: Arc<dyn CredentialSource>,
    pub liveness: Duration,
}

impl Default for ProviderContext {
    fn default() -> Self {
        Self {
            resolver: Arc::new(PathResolver),
            credentials: Arc::new(EnvCredentials),
            liveness: DEFAULT_LIVENESS,
        }
    }
}

impl ProviderContext {
    fn executor(&self, backend: BackendSpec) -> AgentProcessExecutor {
        AgentProcessExecutor::new(
            backend,
            Arc::clone(&self.resolver),
            Arc::clone(&self.credentials),
        )
        .with_liveness(self.liveness)
    }
}

/// Resolves model ids to providers.
///
/// CLI providers are created once per kind and reused, so every query for a
/// backend goes through the same executor and its single-live-child rule.
pub struct ProviderRegistry {
    routes: Vec<(ModelPattern, ProviderKind)>,
    context: ProviderContext,
    providers: Mutex<HashMap<ProviderKind, Arc<dyn Provider>>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(ProviderContext::default())
    }
}

impl ProviderRegistry {
    pub fn new(context: ProviderContext) -> Self {
        Self {
            routes: DEFAULT_ROUTES.to_vec(),
            context,
            providers: Mutex::new(HashMap::new()),
        }
    }

    /// Add a route checked before all existing ones.
    pub fn with_route(mut self, pattern: ModelPattern, kind: ProviderKind) -> Self {
        self.routes.insert(0, (pattern, kind));
        self
    }

    /// Register a provider instance for a kind, replacing the built-in one.
    pub fn with_provider(self, kind: ProviderKind, provider: Arc<dyn Provider>) -> Self {
        self.cache().insert(kind, provider);
        self
    }

    /// Which kind of provider serves `model`.
    pub fn kind_for(&self, model: &str) -> ProviderKind {
        route(&self.routes, model)
    }

    /// Get the provider serving `model`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fp_core::agents::{ProviderKind, ProviderRegistry};
    ///
    /// let registry = ProviderRegistry::default();
    /// assert_eq!(registry.create("gpt-5-codex").kind(), ProviderKind::Codex);
    /// assert_eq!(registry.create("claude-opus-4-1").kind(), ProviderKind::Claude);
    /// ```
    pub fn create(&self, model: &str) -> Arc<dyn Provider> {
        let kind = self.kind_for(model);

        let mut cache = self.cache();
        if let Some(provider) = cache.get(&kind) {
            return Arc::clone(provider);
        }

        let provider: Arc<dyn Provider> = match kind {
            // Mock behavior depends on the model id itself, so it is not cached.
            ProviderKind::Mock => return Arc::new(MockProvider::for_model(model)),
            ProviderKind::Claude => Arc::new(ClaudeProvider::with_executor(
                self.context.executor(CLAUDE_BACKEND),
            )),
            ProviderKind::Codex => Arc::new(CodexProvider::with_executor(
                self.context.executor(CODEX_BACKEND),
            )),
        };
        tracing::debug!(kind = kind.name(), "created provider");
        cache.insert(kind, Arc::clone(&provider));
        provider
    }

    /// Route the query by its model id and run it.
    pub fn execute_query(&self, options: QueryOptions) -> EventStream {
        let provider = self.create(&options.model);
        tracing::info!(
            model = %options.model,
            provider = provider.kind().name(),
            "executing query"
        );
        provider.execute_query(options)
    }

    /// Kinds whose backend is currently usable.
    pub async fn available_providers(&self) -> Vec<ProviderKind> {
        let mut available = Vec::new();
        for (kind, model) in [
            (ProviderKind::Claude, "claude"),
            (ProviderKind::Codex, "gpt-5-codex"),
            (ProviderKind::Mock, "mock"),
        ] {
            let cached = self.cache().get(&kind).cloned();
            let provider = match cached {
                Some(p) => p,
                None => self.create(model),
            };
            if provider.check_availability().await {
                available.push(kind);
            }
        }
        available
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<ProviderKind, Arc<dyn Provider>>> {
        self.providers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
