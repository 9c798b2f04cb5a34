//! Next-status computation for features moving through a pipeline.
//!
//! The machine is a pure function of the current status, the configured
//! steps and the feature's excluded step ids. Exclusions only apply to the
//! computation; the configuration itself is never touched.

use fp_protocol::pipeline_models::{FeatureStatus, PipelineStep, PIPELINE_STATUS_PREFIX};

/// Where a feature lands after its last step.
pub fn terminal_status(skip_tests: bool) -> FeatureStatus {
    if skip_tests {
        FeatureStatus::WaitingApproval
    } else {
        FeatureStatus::Verified
    }
}

/// Steps sorted by `order`. Ties keep their configured order.
pub fn sorted_steps(steps: &[PipelineStep]) -> Vec<&PipelineStep> {
    let mut sorted: Vec<&PipelineStep> = steps.iter().collect();
    sorted.sort_by_key(|step| step.order);
    sorted
}

/// Whether a raw status string points at a pipeline step.
pub fn is_pipeline_status(status: &str) -> bool {
    step_id_of(status).is_some()
}

/// The step id of a raw `pipeline_<id>` status.
pub fn step_id_of(status: &str) -> Option<&str> {
    status
        .strip_prefix(PIPELINE_STATUS_PREFIX)
        .filter(|id| !id.is_empty())
}

/// First step a feature enters, honoring its exclusions.
pub fn first_step<'a>(steps: &'a [PipelineStep], excluded: &[String]) -> Option<&'a PipelineStep> {
    sorted_steps(steps)
        .into_iter()
        .find(|step| !is_excluded(step, excluded))
}

/// Compute the status that follows `current`.
///
/// - No usable steps: `in_progress` and any `pipeline_*` status go to the
///   terminal status; anything else is unchanged.
/// - `in_progress` enters the first usable step.
/// - `pipeline_<id>` moves to the next usable step, or to the terminal
///   status after the last one. An excluded step scans forward from its
///   configured position. A step that no longer exists resolves to the
///   terminal status.
/// - Any other status is unchanged.
///
/// # Examples
///
/// ```
/// use fp_core::pipeline::next_status;
/// use fp_protocol::pipeline_models::{FeatureStatus, PipelineStep};
///
/// let step = |id: &str, order| PipelineStep {
///     id: id.to_string(),
///     name: id.to_uppercase(),
///     order,
///     color: String::new(),
///     instructions: String::new(),
///     created_at: None,
///     updated_at: None,
/// };
/// let steps = vec![step("a", 0), step("b", 1)];
///
/// let next = next_status(&FeatureStatus::InProgress, &steps, &[], false);
/// assert_eq!(next, FeatureStatus::pipeline("a"));
/// let next = next_status(&FeatureStatus::pipeline("b"), &steps, &[], true);
/// assert_eq!(next, FeatureStatus::WaitingApproval);
/// ```
pub fn next_status(
    current: &FeatureStatus,
    steps: &[PipelineStep],
    excluded: &[String],
    skip_tests: bool,
) -> FeatureStatus {
    let sorted = sorted_steps(steps);
    let usable: Vec<&PipelineStep> = sorted
        .iter()
        .copied()
        .filter(|step| !is_excluded(step, excluded))
        .collect();
    let terminal = terminal_status(skip_tests);

    if usable.is_empty() {
        return match current {
            FeatureStatus::InProgress | FeatureStatus::Pipeline(_) => terminal,
            other => other.clone(),
        };
    }

    match current {
        FeatureStatus::InProgress => FeatureStatus::pipeline(usable[0].id.clone()),
        FeatureStatus::Pipeline(step_id) => {
            if let Some(pos) = usable.iter().position(|step| &step.id == step_id) {
                return usable
                    .get(pos + 1)
                    .map(|next| FeatureStatus::pipeline(next.id.clone()))
                    .unwrap_or(terminal);
            }

            match sorted.iter().position(|step| &step.id == step_id) {
                // Excluded for this feature: continue from its configured position.
                Some(pos) => sorted[pos + 1..]
                    .iter()
                    .find(|step| !is_excluded(step, excluded))
                    .map(|next| FeatureStatus::pipeline(next.id.clone()))
                    .unwrap_or(terminal),
                None => {
                    tracing::debug!(step_id = %step_id, "status references a deleted step");
                    terminal
                }
            }
        }
        other => other.clone(),
    }
}

fn is_excluded(step: &PipelineStep, excluded: &[String]) -> bool {
    excluded.iter().any(|id| *id == step.id)
}
