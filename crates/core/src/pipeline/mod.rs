//! Pipeline state machine and step management.

pub mod error;
pub mod machine;
pub mod steps;

pub use error::{PipelineError, PipelineResult};
pub use machine::{first_step, is_pipeline_status, next_status, step_id_of, terminal_status};
pub use steps::{add_step, delete_step, reorder_steps, update_step, StepDraft, StepUpdate};
