//! Action kinds and the kind → behaviour table

use crate::actions::{
    blueprint::BlueprintBuild, combat::Combat, craft::CraftItem, follow::FollowPlayer,
    interact::Interact, mine::MineBlock, pathfind::Pathfind, place::PlaceBlock, Action,
};
use crate::task::Task;
use serde::{Deserialize, Serialize};

/// Every action kind the planner may emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Pathfind,
    Mine,
    Place,
    Craft,
    Attack,
    Follow,
    Gather,
    Build,
    Blueprint,
    Interact,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        ActionKind::Pathfind,
        ActionKind::Mine,
        ActionKind::Place,
        ActionKind::Craft,
        ActionKind::Attack,
        ActionKind::Follow,
        ActionKind::Gather,
        ActionKind::Build,
        ActionKind::Blueprint,
        ActionKind::Interact,
    ];

    /// Parse the wire tag (case-insensitive)
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ActionKind::Pathfind => "pathfind",
            ActionKind::Mine => "mine",
            ActionKind::Place => "place",
            ActionKind::Craft => "craft",
            ActionKind::Attack => "attack",
            ActionKind::Follow => "follow",
            ActionKind::Gather => "gather",
            ActionKind::Build => "build",
            ActionKind::Blueprint => "blueprint",
            ActionKind::Interact => "interact",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Instantiate the behaviour for a task
///
/// Returns `None` for unknown kinds; the caller logs and skips.
pub fn create_action(task: &Task) -> Option<Action> {
    let kind = ActionKind::from_tag(task.action())?;
    let action = match kind {
        ActionKind::Pathfind => Action::new(kind, Pathfind::from_task(task)),
        ActionKind::Mine => Action::new(kind, MineBlock::from_task(task)),
        ActionKind::Gather => Action::new(kind, MineBlock::from_gather_task(task)),
        ActionKind::Place => Action::new(kind, PlaceBlock::from_task(task)),
        ActionKind::Craft => Action::new(kind, CraftItem::from_task(task)),
        ActionKind::Attack => Action::new(kind, Combat::from_task(task)),
        ActionKind::Follow => Action::new(kind, FollowPlayer::from_task(task)),
        ActionKind::Build => {
            if task.has_parameters(&["blocks"]) {
                Action::new(kind, BlueprintBuild::from_task(task))
            } else {
                Action::new(kind, BlueprintBuild::from_structure_task(task))
            }
        }
        ActionKind::Blueprint => Action::new(kind, BlueprintBuild::from_task(task)),
        ActionKind::Interact => Action::new(kind, Interact::from_task(task)),
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_tag_roundtrip() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn test_from_tag_case_insensitive() {
        assert_eq!(ActionKind::from_tag(" Mine "), Some(ActionKind::Mine));
        assert_eq!(ActionKind::from_tag("dance"), None);
    }

    #[test]
    fn test_create_action_unknown_kind() {
        assert!(create_action(&Task::new("teleport", BTreeMap::new())).is_none());
    }

    #[test]
    fn test_create_action_build_variants() {
        let by_structure = Task::new("build", BTreeMap::new()).with_param("structure", "tower");
        let action = create_action(&by_structure).unwrap();
        assert_eq!(action.kind(), ActionKind::Build);
        assert!(!action.is_complete());
    }
}
