//! Situational snapshot embedded in the user prompt
//!
//! Captured on the simulation loop when a command arrives, then moved into
//! the planning worker. The worker never touches the world itself.

use crate::actions::AgentInfo;
use crate::core::types::BlockPos;
use crate::world::{blocks, EntityKind, WorldAccess};
use std::collections::BTreeMap;

const ENTITY_RADIUS: f64 = 16.0;
const BLOCK_RADIUS: i32 = 8;
const MAX_BLOCK_KINDS: usize = 5;

/// What the agent can see around itself
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    pub agent_name: String,
    pub position: BlockPos,
    pub nearby_players: Vec<String>,
    /// Non-player entity counts by type
    pub nearby_entities: BTreeMap<String, usize>,
    /// Non-air block counts by name
    pub nearby_blocks: BTreeMap<String, usize>,
}

impl PromptContext {
    /// Snapshot the world around an agent; `None` if it has no body
    pub fn capture(world: &dyn WorldAccess, agent: &AgentInfo) -> Option<Self> {
        let pos = world.position(agent.id)?;
        let mut context = Self {
            agent_name: agent.name.clone(),
            position: pos.block_pos(),
            ..Self::default()
        };

        for entity in world.entities_within(pos, ENTITY_RADIUS) {
            if entity.id == agent.id {
                continue;
            }
            match entity.kind {
                EntityKind::Player => context.nearby_players.push(entity.name),
                _ => *context.nearby_entities.entry(entity.type_name).or_default() += 1,
            }
        }
        context.nearby_players.sort();

        let feet = pos.block_pos();
        for cell in world.blocks_within(feet, BLOCK_RADIUS, &|name| name != blocks::AIR) {
            *context.nearby_blocks.entry(world.block_at(cell)).or_default() += 1;
        }
        Some(context)
    }

    pub fn players_summary(&self) -> String {
        if self.nearby_players.is_empty() {
            "none".to_string()
        } else {
            self.nearby_players.join(", ")
        }
    }

    pub fn entities_summary(&self) -> String {
        summarize(&self.nearby_entities, usize::MAX)
    }

    /// The most common block kinds only
    pub fn blocks_summary(&self) -> String {
        summarize(&self.nearby_blocks, MAX_BLOCK_KINDS)
    }
}

fn summarize(counts: &BTreeMap<String, usize>, limit: usize) -> String {
    if counts.is_empty() {
        return "none".to_string();
    }
    let mut ranked: Vec<_> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(name, count)| format!("{} {}", count, name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::world::grid::GROUND_LEVEL;
    use crate::world::GridWorld;

    #[test]
    fn test_capture_counts_surroundings() {
        let mut world = GridWorld::flat(16, 3);
        let y = GROUND_LEVEL as f64;
        world.spawn_player("Alex", Vec3::new(3.5, y, 0.5));
        world.spawn_mob("cow", EntityKind::Animal, Vec3::new(-3.5, y, 2.5));
        world.spawn_mob("cow", EntityKind::Animal, Vec3::new(-4.5, y, 2.5));
        world.spawn_mob("zombie", EntityKind::Monster, Vec3::new(0.5, y, 6.5));
        world.set_block(BlockPos::new(1, GROUND_LEVEL, 1), "oak_log");
        let id = world.spawn_agent("Steve", Vec3::new(0.5, y, 0.5));

        let agent = AgentInfo { id, name: "Steve".into() };
        let context = PromptContext::capture(&world, &agent).unwrap();
        assert_eq!(context.position, BlockPos::new(0, GROUND_LEVEL, 0));
        assert_eq!(context.players_summary(), "Alex");
        assert_eq!(context.entities_summary(), "2 cow, 1 zombie");
        assert_eq!(context.nearby_blocks.get("oak_log"), Some(&1));
        assert!(context.blocks_summary().contains("grass_block"));
    }

    #[test]
    fn test_empty_summaries() {
        let context = PromptContext::default();
        assert_eq!(context.players_summary(), "none");
        assert_eq!(context.entities_summary(), "none");
    }
}
