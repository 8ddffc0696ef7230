//! Task validation against the fixed required-parameter table
//!
//! Validation is a strict filter: a task either passes untouched or is
//! dropped with a warning. It never rewrites parameters.

use crate::actions::catalog::ActionKind;
use crate::task::Task;
use tracing::warn;

/// Alternative required-parameter sets for an action kind
///
/// A task is valid if it carries every key of at least one set.
pub fn required_parameters(kind: ActionKind) -> &'static [&'static [&'static str]] {
    match kind {
        ActionKind::Pathfind => &[&["x", "y", "z"]],
        ActionKind::Mine => &[&["block", "quantity"]],
        ActionKind::Place => &[&["block", "x", "y", "z"]],
        ActionKind::Craft => &[&["item", "quantity"]],
        ActionKind::Attack => &[&["target"]],
        ActionKind::Follow => &[&["player"]],
        ActionKind::Gather => &[&["resource", "quantity"]],
        ActionKind::Build => &[&["blocks"], &["structure"]],
        ActionKind::Blueprint => &[&["blocks"]],
        ActionKind::Interact => &[&["target"]],
    }
}

/// Check one task against the table
pub fn validate_task(task: &Task) -> bool {
    let Some(kind) = ActionKind::from_tag(task.action()) else {
        warn!("Unknown action type: {}", task.action());
        return false;
    };

    let valid = required_parameters(kind)
        .iter()
        .any(|set| task.has_parameters(set));
    if !valid {
        warn!("Dropping {} task with missing parameters: {}", kind, task);
    }
    valid
}

/// Keep only valid tasks, preserving order
pub fn validate_and_filter(tasks: Vec<Task>) -> Vec<Task> {
    tasks.into_iter().filter(validate_task).collect()
}
