//! Global configuration models for `.feature-pilot/config.toml`.
//!
//! This module defines the structure of the project-wide configuration file
//! that tunes process supervision and agent execution.

use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Represents global settings from `.feature-pilot/config.toml`.
///
/// Every field has a default, so an empty or missing file is valid.
///
/// # Example
///
/// ```toml
/// # .feature-pilot/config.toml
/// [sessions]
/// scrollback_bytes = 65536
/// throttle_ms = 50
///
/// [agents]
/// liveness_secs = 60
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct GlobalConfig {
    #[serde(default)]
    pub sessions: SessionSettings,

    #[serde(default)]
    pub agents: AgentSettings,
}

/// Tuning for supervised process sessions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(default)]
pub struct SessionSettings {
    /// Ceiling of the replayable scrollback per session, in bytes.
    pub scrollback_bytes: usize,

    /// Minimum interval between two output notifications, in milliseconds.
    pub throttle_ms: u64,

    /// Maximum size of one output notification, in bytes.
    pub batch_bytes: usize,

    /// How long finished sessions are kept for replay, in seconds.
    pub retention_secs: u64,

    /// How often the eviction sweep runs, in seconds.
    pub cleanup_interval_secs: u64,

    /// Wall-clock limit per session. A session exceeding it is terminated
    /// and ends with the `error` status. Unlimited when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            scrollback_bytes: 50_000,
            throttle_ms: 100,
            batch_bytes: 8 * 1024,
            retention_secs: 60 * 60,
            cleanup_interval_secs: 5 * 60,
            timeout_secs: None,
        }
    }
}

/// Tuning for CLI agent execution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(default)]
pub struct AgentSettings {
    /// Quiet period after which a silent agent is reported as possibly hung.
    pub liveness_secs: u64,

    /// Skip automated verification: finished features wait for approval
    /// instead of becoming verified.
    pub skip_tests: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            liveness_secs: 30,
            skip_tests: false,
        }
    }
}
