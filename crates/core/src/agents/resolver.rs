//! Downstream collaborators of the CLI executor: locating backend
//! executables and sourcing credentials.

use crate::agents::executor::BackendSpec;
use std::collections::HashMap;
use std::path::PathBuf;

/// Finds the executable for a backend. Returns `None` when not installed.
pub trait ExecutableResolver: Send + Sync {
    fn resolve(&self, backend: &BackendSpec) -> Option<PathBuf>;
}

/// Resolves executables from `PATH`.
///
/// Checks in the following order:
/// 1. The backend's override environment variable (e.g. `CODEX_CMD`)
/// 2. Each of the backend's executable names in `PATH`
#[derive(Debug, Default, Clone, Copy)]
pub struct PathResolver;

impl ExecutableResolver for PathResolver {
    fn resolve(&self, backend: &BackendSpec) -> Option<PathBuf> {
        if let Ok(cmd) = std::env::var(backend.path_override_var) {
            if let Ok(path) = which::which(&cmd) {
                return Some(path);
            }
            tracing::warn!(
                var = backend.path_override_var,
                value = %cmd,
                "override does not point at an executable, falling back to PATH"
            );
        }

        backend
            .executables
            .iter()
            .find_map(|name| which::which(name).ok())
    }
}

/// Always resolves to the same path (or to nothing).
#[derive(Debug, Clone, Default)]
pub struct FixedResolver(pub Option<PathBuf>);

impl FixedResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(Some(path.into()))
    }

    pub fn missing() -> Self {
        Self(None)
    }
}

impl ExecutableResolver for FixedResolver {
    fn resolve(&self, _backend: &BackendSpec) -> Option<PathBuf> {
        self.0.clone()
    }
}

/// Source of credential values for backend processes.
pub trait CredentialSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads credentials from the ambient process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

/// A fixed map of credentials, e.g. keys stored in application settings.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials(pub HashMap<String, String>);

impl StaticCredentials {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// Merge explicit overrides with credentials for the given variables.
///
/// Overrides always win; a credential is only filled in when the caller did
/// not set that variable explicitly.
pub fn merge_environment(
    overrides: &HashMap<String, String>,
    credential_vars: &[&str],
    credentials: &dyn CredentialSource,
) -> HashMap<String, String> {
    let mut env = overrides.clone();
    for var in credential_vars {
        if env.contains_key(*var) {
            continue;
        }
        if let Some(value) = credentials.get(var) {
            env.insert((*var).to_string(), value);
        }
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_environment_overrides_win() {
        let overrides = HashMap::from([("OPENAI_API_KEY".to_string(), "explicit".to_string())]);
        let creds = StaticCredentials::default()
            .with("OPENAI_API_KEY", "stored")
            .with("CODEX_API_KEY", "stored-codex");

        let env = merge_environment(&overrides, &["OPENAI_API_KEY", "CODEX_API_KEY"], &creds);

        assert_eq!(env.get("OPENAI_API_KEY").map(String::as_str), Some("explicit"));
        assert_eq!(env.get("CODEX_API_KEY").map(String::as_str), Some("stored-codex"));
    }

    #[test]
    fn test_merge_environment_ignores_unlisted_credentials() {
        let creds = StaticCredentials::default().with("UNRELATED", "x");
        let env = merge_environment(&HashMap::new(), &["OPENAI_API_KEY"], &creds);
        assert!(env.is_empty());
    }

    #[test]
    fn test_fixed_resolver() {
        let backend = crate::agents::adapters::codex_adapter::CODEX_BACKEND;
        assert_eq!(
            FixedResolver::new("/opt/codex").resolve(&backend),
            Some(PathBuf::from("/opt/codex"))
        );
        assert_eq!(FixedResolver::missing().resolve(&backend), None);
    }

    #[test]
    fn test_env_credentials_skip_empty_values() {
        // PATH is set in every test environment; an unset key yields None.
        assert!(EnvCredentials.get("PATH").is_some());
        assert!(EnvCredentials
            .get("FP_CORE_TEST_SURELY_UNSET_VARIABLE")
            .is_none());
    }
}
