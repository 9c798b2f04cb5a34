//! Configuration models that aggregate all settings.

use crate::session::SessionConfig;
use fp_protocol::config_models::GlobalConfig;
use fp_protocol::pipeline_models::PipelineConfig;
use std::time::Duration;

/// Unified project configuration loaded from the `.feature-pilot/` directory.
///
/// - `config.toml`: global settings
/// - `pipeline.yaml`: custom pipeline steps
///
/// # Example
///
/// ```rust,no_run
/// use fp_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} pipeline steps", config.pipeline.steps.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    /// Global settings from `config.toml`.
    pub global: GlobalConfig,

    /// Pipeline steps from `pipeline.yaml`.
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::from(&self.global.sessions)
    }

    /// Quiet period before a silent agent is reported.
    pub fn liveness(&self) -> Duration {
        Duration::from_secs(self.global.agents.liveness_secs)
    }

    pub fn skip_tests(&self) -> bool {
        self.global.agents.skip_tests
    }
}
