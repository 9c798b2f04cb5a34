//! Provider kinds and the model-id routing table.

/// The closed set of backends a model id can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Claude Code CLI (`claude -p --output-format stream-json`).
    Claude,
    /// OpenAI Codex CLI (`codex exec --json`).
    Codex,
    /// In-process scripted provider, no subprocess.
    Mock,
}

/// How a route matches a model id. Matching is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPattern {
    Exact(&'static str),
    Prefix(&'static str),
    Contains(&'static str),
}

impl ModelPattern {
    pub fn matches(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        match self {
            Self::Exact(s) => model == *s,
            Self::Prefix(s) => model.starts_with(s),
            Self::Contains(s) => model.contains(s),
        }
    }
}

/// Default routes, checked in order. First match wins.
pub const DEFAULT_ROUTES: &[(ModelPattern, ProviderKind)] = &[
    (ModelPattern::Exact("mock"), ProviderKind::Mock),
    (ModelPattern::Prefix("mock-"), ProviderKind::Mock),
    (ModelPattern::Prefix("claude"), ProviderKind::Claude),
    (ModelPattern::Exact("opus"), ProviderKind::Claude),
    (ModelPattern::Exact("sonnet"), ProviderKind::Claude),
    (ModelPattern::Exact("haiku"), ProviderKind::Claude),
    (ModelPattern::Contains("codex"), ProviderKind::Codex),
    (ModelPattern::Prefix("gpt-"), ProviderKind::Codex),
    (ModelPattern::Prefix("o1"), ProviderKind::Codex),
    (ModelPattern::Prefix("o3"), ProviderKind::Codex),
    (ModelPattern::Prefix("o4"), ProviderKind::Codex),
];

/// Kind used when no route matches.
pub const DEFAULT_PROVIDER: ProviderKind = ProviderKind::Claude;

impl ProviderKind {
    /// Infer the provider kind from a model id using [`DEFAULT_ROUTES`].
    ///
    /// # Examples
    ///
    /// ```
    /// use fp_core::agents::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::from_model_id("claude-sonnet-4-5"), ProviderKind::Claude);
    /// assert_eq!(ProviderKind::from_model_id("gpt-5-codex"), ProviderKind::Codex);
    /// assert_eq!(ProviderKind::from_model_id("mock"), ProviderKind::Mock);
    /// assert_eq!(ProviderKind::from_model_id("some-new-model"), ProviderKind::Claude);
    /// ```
    pub fn from_model_id(model: &str) -> Self {
        route(DEFAULT_ROUTES, model)
    }

    /// Get a human-readable name for the provider kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Claude => "Claude",
            Self::Codex => "Codex",
            Self::Mock => "Mock",
        }
    }

    /// Whether queries run in a child process.
    pub fn is_cli(&self) -> bool {
        !matches!(self, Self::Mock)
    }
}

pub(crate) fn route(routes: &[(ModelPattern, ProviderKind)], model: &str) -> ProviderKind {
    routes
        .iter()
        .find(|(pattern, _)| pattern.matches(model))
        .map(|(_, kind)| *kind)
        .unwrap_or(DEFAULT_PROVIDER)
}
