//! Configuration file loader for the `.feature-pilot/` directory.
//!
//! This module loads and saves:
//! - `config.toml`: global settings
//! - `pipeline.yaml`: custom pipeline steps

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use crate::pipeline::steps::{renormalize, validate};
use fp_protocol::config_models::GlobalConfig;
use fp_protocol::pipeline_models::PipelineConfig;
use std::path::Path;
use std::path::PathBuf;

/// Name of the project configuration directory.
pub const CONFIG_DIR: &str = ".feature-pilot";

const GLOBAL_CONFIG_FILE: &str = "config.toml";
const PIPELINE_FILE: &str = "pipeline.yaml";

/// Loads all configuration from the `.feature-pilot/` directory.
///
/// Missing files (or a missing directory) yield defaults rather than an
/// error. Pipeline steps are validated and their `order` renormalized.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid TOML or YAML syntax
/// - Pipeline step ids are empty or duplicated
///
/// # Example
///
/// ```rust,no_run
/// use fp_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Scrollback limit: {}", config.global.sessions.scrollback_bytes);
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let dir = root.join(CONFIG_DIR);

    if !dir.exists() {
        tracing::debug!(path = %dir.display(), "no config directory, using defaults");
        return Ok(AppConfig::default());
    }

    let global = load_global_config(&dir)?;
    let pipeline = load_pipeline(&dir)?;

    Ok(AppConfig { global, pipeline })
}

/// Loads global configuration from `config.toml`.
fn load_global_config(dir: &Path) -> ConfigResult<GlobalConfig> {
    let config_path = dir.join(GLOBAL_CONFIG_FILE);

    if !config_path.exists() {
        return Ok(GlobalConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let config: GlobalConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path,
            source,
        })?;

    Ok(config)
}

/// Loads the pipeline definition from `pipeline.yaml`.
fn load_pipeline(dir: &Path) -> ConfigResult<PipelineConfig> {
    let path = dir.join(PIPELINE_FILE);

    if !path.exists() {
        return Ok(PipelineConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::FileRead {
        path: path.clone(),
        source,
    })?;

    // An empty file is an empty pipeline.
    if content.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }

    let mut pipeline: PipelineConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
            path: path.clone(),
            source,
        })?;

    validate(&pipeline).map_err(|e| ConfigError::InvalidConfig {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    renormalize(&mut pipeline.steps);

    Ok(pipeline)
}

/// Writes the pipeline definition to `.feature-pilot/pipeline.yaml`,
/// creating the directory if needed. Returns the written path.
pub async fn save_pipeline(root: &Path, pipeline: &PipelineConfig) -> ConfigResult<PathBuf> {
    let dir = root.join(CONFIG_DIR);
    let path = dir.join(PIPELINE_FILE);

    validate(pipeline).map_err(|e| ConfigError::InvalidConfig {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let mut normalized = pipeline.clone();
    renormalize(&mut normalized.steps);

    let yaml = serde_yaml::to_string(&normalized).map_err(|source| ConfigError::YamlSerialize {
        path: path.clone(),
        source,
    })?;

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::FileWrite {
        path: dir.clone(),
        source,
    })?;
    std::fs::write(&path, yaml).map_err(|source| ConfigError::FileWrite {
        path: path.clone(),
        source,
    })?;

    tracing::info!(path = %path.display(), steps = normalized.steps.len(), "saved pipeline");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_config_acceptance() {
        let dir = tempdir().expect("Failed to create temp dir");
        let root = dir.path();
        let fp_dir = root.join(CONFIG_DIR);
        fs::create_dir_all(&fp_dir).expect("Failed to create config dir");

        let config_toml = r#"
[sessions]
scrollback_bytes = 1024
throttle_ms = 50

[agents]
skip_tests = true
"#;
        fs::write(fp_dir.join("config.toml"), config_toml).expect("Failed to write config.toml");

        let pipeline_yaml = r#"version: 1
steps:
  - id: docs
    name: Documentation
    order: 7
    color: green
  - id: review
    name: Code review
    order: 2
    color: purple
    instructions: Review the diff.
"#;
        fs::write(fp_dir.join("pipeline.yaml"), pipeline_yaml).expect("Failed to write pipeline");

        let config = load_config(root).await.expect("Failed to load config");

        assert_eq!(config.global.sessions.scrollback_bytes, 1024);
        assert_eq!(config.global.sessions.throttle_ms, 50);
        assert_eq!(config.global.sessions.batch_bytes, 8192);
        assert!(config.skip_tests());

        let ids: Vec<&str> = config.pipeline.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["review", "docs"]);
        assert_eq!(config.pipeline.steps[0].order, 0);
        assert_eq!(config.pipeline.steps[1].order, 1);
        assert_eq!(config.pipeline.steps[0].instructions, "Review the diff.");
    }

    #[tokio::test]
    async fn test_load_config_empty_directory() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config = load_config(dir.path())
            .await
            .expect("Should handle missing .feature-pilot");
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn test_load_config_partial() {
        let dir = tempdir().expect("Failed to create temp dir");
        let fp_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&fp_dir).expect("Failed to create config dir");
        fs::write(fp_dir.join("config.toml"), "[agents]\nliveness_secs = 5\n")
            .expect("Failed to write config.toml");

        let config = load_config(dir.path()).await.expect("Should handle partial config");
        assert_eq!(config.liveness().as_secs(), 5);
        assert!(config.pipeline.steps.is_empty());
    }

    #[tokio::test]
    async fn test_load_config_invalid_toml() {
        let dir = tempdir().expect("Failed to create temp dir");
        let fp_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&fp_dir).expect("Failed to create config dir");
        fs::write(fp_dir.join("config.toml"), "sessions = [invalid toml")
            .expect("Failed to write config.toml");

        match load_config(dir.path()).await {
            Err(ConfigError::TomlParse { path, .. }) => assert!(path.ends_with("config.toml")),
            other => panic!("Expected TomlParse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_config_invalid_yaml() {
        let dir = tempdir().expect("Failed to create temp dir");
        let fp_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&fp_dir).expect("Failed to create config dir");
        fs::write(fp_dir.join("pipeline.yaml"), "steps:\n  - id: [broken")
            .expect("Failed to write pipeline");

        match load_config(dir.path()).await {
            Err(ConfigError::YamlParse { path, .. }) => assert!(path.ends_with("pipeline.yaml")),
            other => panic!("Expected YamlParse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_config_duplicate_step_ids() {
        let dir = tempdir().expect("Failed to create temp dir");
        let fp_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&fp_dir).expect("Failed to create config dir");
        let yaml = "steps:\n  - {id: a, name: A, order: 0}\n  - {id: a, name: B, order: 1}\n";
        fs::write(fp_dir.join("pipeline.yaml"), yaml).expect("Failed to write pipeline");

        match load_config(dir.path()).await {
            Err(ConfigError::InvalidConfig { reason, .. }) => assert!(reason.contains("Duplicate")),
            other => panic!("Expected InvalidConfig error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_then_load_pipeline() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut pipeline = PipelineConfig::default();
        crate::pipeline::add_step(
            &mut pipeline,
            crate::pipeline::StepDraft {
                name: "Review".to_string(),
                ..Default::default()
            },
            None,
        )
        .unwrap();

        let path = save_pipeline(dir.path(), &pipeline).await.unwrap();
        assert!(path.ends_with("pipeline.yaml"));

        let loaded = load_config(dir.path()).await.unwrap();
        assert_eq!(loaded.pipeline, pipeline);
    }
}
