//! Provider abstraction and agent process execution.
//!
//! This module provides the [`Provider`] trait, the CLI-backed providers
//! built on [`AgentProcessExecutor`], and the [`ProviderRegistry`] that maps
//! model ids to providers.

pub mod adapters;
pub mod base;
pub mod executor;
pub mod provider_kind;
pub mod registry;
pub mod resolver;

pub use adapters::{ClaudeProvider, CodexProvider, MockProvider};
pub use base::{EventStream, Provider, ProviderError, QueryOptions};
pub use executor::{AgentProcessExecutor, BackendSpec, CliInvocation};
pub use provider_kind::{ModelPattern, ProviderKind};
pub use registry::{ProviderContext, ProviderRegistry};
pub use resolver::{
    CredentialSource, EnvCredentials, ExecutableResolver, FixedResolver, PathResolver,
    StaticCredentials,
};
