//! Error types for pipeline step management.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Pipeline step '{0}' not found")]
    StepNotFound(String),

    #[error("Duplicate pipeline step id '{0}'")]
    DuplicateStepId(String),

    #[error("Pipeline step id must not be empty")]
    EmptyStepId,

    #[error("Pipeline step name must not be empty")]
    EmptyName,

    #[error("Invalid reorder: {0}")]
    InvalidReorder(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
