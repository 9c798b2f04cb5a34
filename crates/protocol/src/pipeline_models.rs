//! Pipeline configuration models for `.feature-pilot/pipeline.yaml`.
//!
//! A project may define custom workflow steps a feature passes through
//! between implementation and verification. Each feature's status is either
//! one of a few fixed states or `pipeline_<stepId>` while it sits in a step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;

/// Prefix of a status that points at a pipeline step.
pub const PIPELINE_STATUS_PREFIX: &str = "pipeline_";

/// A project-configurable workflow stage.
///
/// # Example
///
/// ```yaml
/// id: step_review
/// name: Code review
/// order: 0
/// color: purple
/// instructions: Review the diff for correctness and style.
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStep {
    /// Stable identifier, referenced by `pipeline_<id>` statuses.
    pub id: String,

    pub name: String,

    /// Position in the pipeline. Kept dense (`0..n-1`) by the CRUD layer.
    pub order: u32,

    /// UI color hint.
    #[serde(default)]
    pub color: String,

    /// Prompt text handed to the agent while a feature is in this step.
    #[serde(default)]
    pub instructions: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The ordered set of custom steps for one project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct PipelineConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub steps: Vec<PipelineStep>,
}

fn default_version() -> u32 {
    1
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            steps: Vec::new(),
        }
    }
}

/// Workflow status of a feature.
///
/// Serializes as a plain string: `"in_progress"`, `"verified"`,
/// `"pipeline_step_review"`, ...
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureStatus {
    Backlog,
    InProgress,
    WaitingApproval,
    Verified,
    Completed,
    /// The feature sits in the custom step with this id.
    Pipeline(String),
}

impl FeatureStatus {
    /// Status for a pipeline step id.
    pub fn pipeline(step_id: impl Into<String>) -> Self {
        Self::Pipeline(step_id.into())
    }

    pub fn is_pipeline(&self) -> bool {
        matches!(self, Self::Pipeline(_))
    }

    /// The step id if this is a `pipeline_<id>` status.
    pub fn step_id(&self) -> Option<&str> {
        match self {
            Self::Pipeline(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backlog => f.write_str("backlog"),
            Self::InProgress => f.write_str("in_progress"),
            Self::WaitingApproval => f.write_str("waiting_approval"),
            Self::Verified => f.write_str("verified"),
            Self::Completed => f.write_str("completed"),
            Self::Pipeline(id) => write!(f, "{PIPELINE_STATUS_PREFIX}{id}"),
        }
    }
}

/// Error returned when a string is not a known feature status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown feature status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for FeatureStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlog" => Ok(Self::Backlog),
            "in_progress" => Ok(Self::InProgress),
            "waiting_approval" => Ok(Self::WaitingApproval),
            "verified" => Ok(Self::Verified),
            "completed" => Ok(Self::Completed),
            other => match other.strip_prefix(PIPELINE_STATUS_PREFIX) {
                Some(id) if !id.is_empty() => Ok(Self::Pipeline(id.to_string())),
                _ => Err(ParseStatusError(other.to_string())),
            },
        }
    }
}

impl Serialize for FeatureStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FeatureStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
