//! CRUD layer over the configured pipeline steps.
//!
//! Every mutation renormalizes `order` to a dense `0..n-1` range.

use crate::pipeline::error::{PipelineError, PipelineResult};
use chrono::Utc;
use fp_protocol::pipeline_models::{PipelineConfig, PipelineStep};
use std::collections::HashSet;
use uuid::Uuid;

/// Fields of a step to create.
#[derive(Debug, Clone, Default)]
pub struct StepDraft {
    pub name: String,
    pub color: String,
    pub instructions: String,
}

/// Partial update of a step. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct StepUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub instructions: Option<String>,
}

pub fn generate_step_id() -> String {
    format!("step_{}", Uuid::new_v4().simple())
}

/// Sort steps by `order` (stable) and reassign `0..n-1`.
pub fn renormalize(steps: &mut [PipelineStep]) {
    steps.sort_by_key(|step| step.order);
    for (index, step) in steps.iter_mut().enumerate() {
        step.order = index as u32;
    }
}

/// Insert a new step at `position` (appended when `None` or past the end).
pub fn add_step(
    config: &mut PipelineConfig,
    draft: StepDraft,
    position: Option<usize>,
) -> PipelineResult<PipelineStep> {
    if draft.name.trim().is_empty() {
        return Err(PipelineError::EmptyName);
    }

    renormalize(&mut config.steps);
    let now = Utc::now();
    let step = PipelineStep {
        id: generate_step_id(),
        name: draft.name.trim().to_string(),
        order: 0,
        color: draft.color,
        instructions: draft.instructions,
        created_at: Some(now),
        updated_at: Some(now),
    };

    let index = position.unwrap_or(config.steps.len()).min(config.steps.len());
    config.steps.insert(index, step);
    reassign_positions(&mut config.steps);

    Ok(config.steps[index].clone())
}

pub fn update_step(
    config: &mut PipelineConfig,
    step_id: &str,
    update: StepUpdate,
) -> PipelineResult<PipelineStep> {
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(PipelineError::EmptyName);
    }

    let step = config
        .steps
        .iter_mut()
        .find(|step| step.id == step_id)
        .ok_or_else(|| PipelineError::StepNotFound(step_id.to_string()))?;

    if let Some(name) = update.name {
        step.name = name.trim().to_string();
    }
    if let Some(color) = update.color {
        step.color = color;
    }
    if let Some(instructions) = update.instructions {
        step.instructions = instructions;
    }
    step.updated_at = Some(Utc::now());
    let updated = step.clone();

    renormalize(&mut config.steps);
    Ok(updated)
}

/// Remove a step. Features still pointing at it resolve to the terminal
/// status on their next transition.
pub fn delete_step(config: &mut PipelineConfig, step_id: &str) -> PipelineResult<PipelineStep> {
    let index = config
        .steps
        .iter()
        .position(|step| step.id == step_id)
        .ok_or_else(|| PipelineError::StepNotFound(step_id.to_string()))?;

    let removed = config.steps.remove(index);
    renormalize(&mut config.steps);
    Ok(removed)
}

/// Put the steps in the order of `ordered_ids`, which must name every step
/// exactly once.
pub fn reorder_steps(config: &mut PipelineConfig, ordered_ids: &[String]) -> PipelineResult<()> {
    if ordered_ids.len() != config.steps.len() {
        return Err(PipelineError::InvalidReorder(format!(
            "expected {} step ids, got {}",
            config.steps.len(),
            ordered_ids.len()
        )));
    }

    let mut seen = HashSet::new();
    for id in ordered_ids {
        if !seen.insert(id.as_str()) {
            return Err(PipelineError::InvalidReorder(format!("step '{id}' listed twice")));
        }
        if !config.steps.iter().any(|step| &step.id == id) {
            return Err(PipelineError::StepNotFound(id.clone()));
        }
    }

    let now = Utc::now();
    for step in &mut config.steps {
        let position = ordered_ids.iter().position(|id| *id == step.id).unwrap_or(usize::MAX);
        let order = position as u32;
        if step.order != order {
            step.updated_at = Some(now);
        }
        step.order = order;
    }
    renormalize(&mut config.steps);
    Ok(())
}

/// Check ids are present and unique.
pub fn validate(config: &PipelineConfig) -> PipelineResult<()> {
    let mut seen = HashSet::new();
    for step in &config.steps {
        if step.id.trim().is_empty() {
            return Err(PipelineError::EmptyStepId);
        }
        if !seen.insert(step.id.as_str()) {
            return Err(PipelineError::DuplicateStepId(step.id.clone()));
        }
    }
    Ok(())
}

fn reassign_positions(steps: &mut [PipelineStep]) {
    for (index, step) in steps.iter_mut().enumerate() {
        step.order = index as u32;
    }
}
