//! World and navigation capability
//!
//! Behaviours never own the world; they borrow it through [`WorldAccess`]
//! for the duration of one tick. Every call is atomic and immediately
//! visible to the next one.

pub mod blocks;
pub mod grid;

use crate::core::types::{BlockPos, Direction, EntityId, Vec3};
use serde::{Deserialize, Serialize};

pub use grid::GridWorld;

/// Broad classification of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Agent,
    Monster,
    Animal,
}

/// Locomotion style requested by a behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementMode {
    #[default]
    Walking,
    Sprinting,
    Flying,
}

/// Snapshot of an entity at query time
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Type identifier such as "zombie" or "cow"
    pub type_name: String,
    /// Display name (player name, agent name, or type name for mobs)
    pub name: String,
    pub position: Vec3,
    pub alive: bool,
}

/// Query and mutation surface consumed by actions and the planner
pub trait WorldAccess {
    // --- entities ---
    fn entity(&self, id: EntityId) -> Option<EntityInfo>;

    fn position(&self, id: EntityId) -> Option<Vec3> {
        self.entity(id).map(|e| e.position)
    }

    fn on_ground(&self, id: EntityId) -> bool;

    /// Living entities within `radius` of `center`
    fn entities_within(&self, center: Vec3, radius: f64) -> Vec<EntityInfo>;

    /// Every living player in the world
    fn players(&self) -> Vec<EntityInfo>;

    // --- blocks ---
    /// Normalized block name at a cell ("air" when empty)
    fn block_at(&self, pos: BlockPos) -> String;

    fn is_air(&self, pos: BlockPos) -> bool {
        self.block_at(pos) == blocks::AIR
    }

    fn is_solid(&self, pos: BlockPos) -> bool {
        blocks::is_solid(&self.block_at(pos))
    }

    fn is_replaceable(&self, pos: BlockPos) -> bool {
        blocks::is_replaceable(&self.block_at(pos))
    }

    fn is_unbreakable(&self, pos: BlockPos) -> bool {
        blocks::is_unbreakable(&self.block_at(pos))
    }

    fn is_water_source(&self, pos: BlockPos) -> bool {
        self.block_at(pos) == "water"
    }

    /// Cells within a cube of half-extent `radius` whose block matches
    fn blocks_within(
        &self,
        center: BlockPos,
        radius: i32,
        matches: &dyn Fn(&str) -> bool,
    ) -> Vec<BlockPos>;

    /// Y of the first free cell above the highest solid block in a column
    fn surface_height(&self, x: i32, z: i32) -> i32;

    // --- navigation ---
    /// Request navigation to a point; false when no path can be started
    fn navigate_to(&mut self, id: EntityId, target: Vec3, speed: f64) -> bool;

    fn navigate_to_entity(&mut self, id: EntityId, target: EntityId, speed: f64) -> bool;

    fn navigation_done(&self, id: EntityId) -> bool;

    fn stop_navigation(&mut self, id: EntityId);

    // --- body control ---
    fn teleport(&mut self, id: EntityId, pos: Vec3);

    fn jump(&mut self, id: EntityId);

    fn set_movement(&mut self, id: EntityId, mode: MovementMode);

    fn facing(&self, id: EntityId) -> Direction;

    fn set_facing(&mut self, id: EntityId, dir: Direction);

    // --- mutations ---
    fn set_block(&mut self, pos: BlockPos, block: &str) -> bool;

    /// Remove a block, returning what was there
    fn destroy_block(&mut self, pos: BlockPos) -> Option<String>;

    /// Melee hit; false when the target is gone or out of reach
    fn attack(&mut self, attacker: EntityId, target: EntityId) -> bool;

    fn interact(&mut self, actor: EntityId, target: EntityId, kind: &str) -> bool;

    /// Put items into an entity's inventory; false when it cannot take them
    fn give_items(&mut self, receiver: EntityId, item: &str, count: u32) -> bool;

    fn drop_items(&mut self, at: Vec3, item: &str, count: u32);

    fn craft(&mut self, crafter: EntityId, item: &str, count: u32) -> bool;

    /// A random standable point near `center`, if one exists
    fn random_position_near(&mut self, center: Vec3, horizontal: i32, vertical: i32)
        -> Option<Vec3>;
}
