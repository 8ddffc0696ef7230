//! Sparse voxel world used by the simulation loop and the tests
//!
//! Navigation is deliberately simple: bodies walk in a straight line toward
//! their goal, step up single blocks, fall when unsupported and stop dead
//! against walls. That is enough to exercise stall recovery.

use crate::core::types::{BlockPos, Direction, EntityId, Tick, Vec3};
use crate::world::{blocks, EntityInfo, EntityKind, MovementMode, WorldAccess};
use ahash::{AHashMap, AHashSet};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// First free cell above flat ground
pub const GROUND_LEVEL: i32 = 64;
const MIN_Y: i32 = -64;
const MAX_Y: i32 = 192;

const BASE_SPEED: f64 = 0.25;
const ARRIVE_DISTANCE: f64 = 0.35;
const FOLLOW_DISTANCE: f64 = 1.5;
const MAX_PATH_DISTANCE: f64 = 128.0;
const REACH: f64 = 4.0;
const ATTACK_DAMAGE: f32 = 8.0;

#[derive(Debug, Clone, Copy)]
enum NavTarget {
    Point(Vec3),
    Entity(EntityId),
}

#[derive(Debug, Clone)]
struct Body {
    info: EntityInfo,
    health: f32,
    nav: Option<(NavTarget, f64)>,
    mode: MovementMode,
    facing: Direction,
}

/// In-memory world implementing [`WorldAccess`]
pub struct GridWorld {
    pub current_tick: Tick,
    blocks: AHashMap<BlockPos, String>,
    by_name: AHashMap<String, AHashSet<BlockPos>>,
    bodies: AHashMap<EntityId, Body>,
    inventories: AHashMap<EntityId, AHashMap<String, u32>>,
    dropped: Vec<(Vec3, String, u32)>,
    rng: ChaCha8Rng,
}

impl GridWorld {
    /// Empty void world
    pub fn new(seed: u64) -> Self {
        Self {
            current_tick: 0,
            blocks: AHashMap::new(),
            by_name: AHashMap::new(),
            bodies: AHashMap::new(),
            inventories: AHashMap::new(),
            dropped: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Flat terrain: grass on top, dirt, stone, then bedrock
    pub fn flat(radius: i32, seed: u64) -> Self {
        let mut world = Self::new(seed);
        let top = GROUND_LEVEL - 1;
        for x in -radius..=radius {
            for z in -radius..=radius {
                world.put(BlockPos::new(x, top, z), "grass_block");
                world.put(BlockPos::new(x, top - 1, z), "dirt");
                world.put(BlockPos::new(x, top - 2, z), "dirt");
                for y in (top - 5)..=(top - 3) {
                    world.put(BlockPos::new(x, y, z), "stone");
                }
                world.put(BlockPos::new(x, top - 6, z), "bedrock");
            }
        }
        world
    }

    fn put(&mut self, pos: BlockPos, name: &str) {
        self.remove(pos);
        if name == blocks::AIR {
            return;
        }
        self.blocks.insert(pos, name.to_string());
        self.by_name.entry(name.to_string()).or_default().insert(pos);
    }

    fn remove(&mut self, pos: BlockPos) -> Option<String> {
        let old = self.blocks.remove(&pos)?;
        if let Some(set) = self.by_name.get_mut(&old) {
            set.remove(&pos);
        }
        Some(old)
    }

    fn spawn(&mut self, kind: EntityKind, type_name: &str, name: &str, pos: Vec3) -> EntityId {
        let id = EntityId::new();
        let info = EntityInfo {
            id,
            kind,
            type_name: type_name.to_string(),
            name: name.to_string(),
            position: pos,
            alive: true,
        };
        self.bodies.insert(
            id,
            Body {
                info,
                health: 20.0,
                nav: None,
                mode: MovementMode::Walking,
                facing: Direction::South,
            },
        );
        id
    }

    pub fn spawn_player(&mut self, name: &str, pos: Vec3) -> EntityId {
        self.spawn(EntityKind::Player, "player", name, pos)
    }

    pub fn spawn_agent(&mut self, name: &str, pos: Vec3) -> EntityId {
        self.spawn(EntityKind::Agent, "agent", name, pos)
    }

    pub fn spawn_mob(&mut self, type_name: &str, kind: EntityKind, pos: Vec3) -> EntityId {
        self.spawn(kind, type_name, type_name, pos)
    }

    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        self.inventories.remove(&id);
        self.bodies.remove(&id).is_some()
    }

    pub fn entity_count(&self) -> usize {
        self.bodies.values().filter(|b| b.info.alive).count()
    }

    pub fn inventory_count(&self, id: EntityId, item: &str) -> u32 {
        self.inventories
            .get(&id)
            .and_then(|inv| inv.get(item))
            .copied()
            .unwrap_or(0)
    }

    pub fn dropped_items(&self) -> &[(Vec3, String, u32)] {
        &self.dropped
    }

    pub fn movement_mode(&self, id: EntityId) -> Option<MovementMode> {
        self.bodies.get(&id).map(|b| b.mode)
    }

    /// Advance every body one tick
    pub fn step(&mut self) {
        self.current_tick += 1;
        let ids: Vec<EntityId> = self.bodies.keys().copied().collect();
        for id in ids {
            self.step_body(id);
        }
    }

    fn can_occupy(&self, pos: Vec3) -> bool {
        let feet = pos.block_pos();
        !self.is_solid(feet) && !self.is_solid(feet.above())
    }

    fn step_body(&mut self, id: EntityId) {
        let Some(body) = self.bodies.get(&id) else {
            return;
        };
        if !body.info.alive {
            return;
        }
        let pos = body.info.position;
        let mode = body.mode;

        let goal = match body.nav {
            Some((NavTarget::Point(p), speed)) => Some((p, speed, false)),
            Some((NavTarget::Entity(target), speed)) => self
                .bodies
                .get(&target)
                .filter(|t| t.info.alive)
                .map(|t| (t.info.position, speed, true)),
            None => None,
        };

        let mut new_pos = pos;
        let mut facing = None;
        let mut arrived = false;

        if let Some((goal_pos, speed, following)) = goal {
            let mut delta = goal_pos - pos;
            if mode != MovementMode::Flying {
                delta.y = 0.0;
            }
            let dist = delta.length();
            let stop = if following { FOLLOW_DISTANCE } else { ARRIVE_DISTANCE };
            if dist <= stop {
                arrived = !following;
            } else {
                let multiplier = match mode {
                    MovementMode::Walking => 1.0,
                    MovementMode::Sprinting => 1.3,
                    MovementMode::Flying => 1.5,
                };
                let step_len = (BASE_SPEED * speed * multiplier).min(dist);
                let candidate = pos + delta.normalize() * step_len;
                facing = Some(Direction::from_delta(delta.x, delta.z));

                if self.can_occupy(candidate) {
                    new_pos = candidate;
                } else {
                    let stepped = candidate + Vec3::new(0.0, 1.0, 0.0);
                    if mode != MovementMode::Flying
                        && self.on_ground(id)
                        && self.can_occupy(stepped)
                    {
                        new_pos = Vec3::new(stepped.x, stepped.y.floor(), stepped.z);
                    }
                }
            }
        } else if body.nav.is_some() {
            // followed entity vanished
            arrived = true;
        }

        if mode != MovementMode::Flying
            && new_pos.y > MIN_Y as f64
            && !self.is_solid(new_pos.block_pos().below())
        {
            new_pos.y = new_pos.y.floor() - 1.0;
        }

        if let Some(body) = self.bodies.get_mut(&id) {
            body.info.position = new_pos;
            if let Some(dir) = facing {
                body.facing = dir;
            }
            if arrived {
                body.nav = None;
            }
        }
    }
}

impl WorldAccess for GridWorld {
    fn entity(&self, id: EntityId) -> Option<EntityInfo> {
        self.bodies.get(&id).map(|b| b.info.clone())
    }

    fn on_ground(&self, id: EntityId) -> bool {
        self.bodies
            .get(&id)
            .map(|b| self.is_solid(b.info.position.block_pos().below()))
            .unwrap_or(false)
    }

    fn entities_within(&self, center: Vec3, radius: f64) -> Vec<EntityInfo> {
        let r2 = radius * radius;
        let mut found: Vec<EntityInfo> = self
            .bodies
            .values()
            .filter(|b| b.info.alive && b.info.position.distance_sqr(&center) <= r2)
            .map(|b| b.info.clone())
            .collect();
        found.sort_by(|a, b| {
            a.position
                .distance_sqr(&center)
                .total_cmp(&b.position.distance_sqr(&center))
        });
        found
    }

    fn players(&self) -> Vec<EntityInfo> {
        let mut players: Vec<EntityInfo> = self
            .bodies
            .values()
            .filter(|b| b.info.alive && b.info.kind == EntityKind::Player)
            .map(|b| b.info.clone())
            .collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        players
    }

    fn block_at(&self, pos: BlockPos) -> String {
        self.blocks
            .get(&pos)
            .cloned()
            .unwrap_or_else(|| blocks::AIR.to_string())
    }

    fn blocks_within(
        &self,
        center: BlockPos,
        radius: i32,
        matches: &dyn Fn(&str) -> bool,
    ) -> Vec<BlockPos> {
        let in_cube = |p: &BlockPos| {
            (p.x - center.x).abs() <= radius
                && (p.y - center.y).abs() <= radius
                && (p.z - center.z).abs() <= radius
        };
        let mut found: Vec<BlockPos> = self
            .by_name
            .iter()
            .filter(|(name, _)| matches(name))
            .flat_map(|(_, cells)| cells.iter().filter(|p| in_cube(p)).copied())
            .collect();
        found.sort_by_key(|p| (p.x, p.y, p.z));
        found
    }

    fn surface_height(&self, x: i32, z: i32) -> i32 {
        (MIN_Y..=MAX_Y)
            .rev()
            .find(|&y| self.is_solid(BlockPos::new(x, y, z)))
            .map(|y| y + 1)
            .unwrap_or(GROUND_LEVEL)
    }

    fn navigate_to(&mut self, id: EntityId, target: Vec3, speed: f64) -> bool {
        let Some(body) = self.bodies.get_mut(&id) else {
            return false;
        };
        if body.info.position.distance(&target) > MAX_PATH_DISTANCE {
            return false;
        }
        body.nav = Some((NavTarget::Point(target), speed));
        true
    }

    fn navigate_to_entity(&mut self, id: EntityId, target: EntityId, speed: f64) -> bool {
        let Some(target_pos) = self.position(target) else {
            return false;
        };
        let Some(body) = self.bodies.get_mut(&id) else {
            return false;
        };
        if body.info.position.distance(&target_pos) > MAX_PATH_DISTANCE {
            return false;
        }
        body.nav = Some((NavTarget::Entity(target), speed));
        true
    }

    fn navigation_done(&self, id: EntityId) -> bool {
        self.bodies.get(&id).map(|b| b.nav.is_none()).unwrap_or(true)
    }

    fn stop_navigation(&mut self, id: EntityId) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.nav = None;
        }
    }

    fn teleport(&mut self, id: EntityId, pos: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.info.position = pos;
            body.nav = None;
        }
    }

    fn jump(&mut self, id: EntityId) {
        if !self.on_ground(id) {
            return;
        }
        let Some(pos) = self.position(id) else {
            return;
        };
        let lifted = pos + Vec3::new(0.0, 1.0, 0.0);
        if self.can_occupy(lifted) {
            if let Some(body) = self.bodies.get_mut(&id) {
                body.info.position = lifted;
            }
        }
    }

    fn set_movement(&mut self, id: EntityId, mode: MovementMode) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.mode = mode;
        }
    }

    fn facing(&self, id: EntityId) -> Direction {
        self.bodies
            .get(&id)
            .map(|b| b.facing)
            .unwrap_or(Direction::South)
    }

    fn set_facing(&mut self, id: EntityId, dir: Direction) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.facing = dir;
        }
    }

    fn set_block(&mut self, pos: BlockPos, block: &str) -> bool {
        let name = blocks::normalize(block);
        if !blocks::is_known(&name) {
            return false;
        }
        self.put(pos, &name);
        true
    }

    fn destroy_block(&mut self, pos: BlockPos) -> Option<String> {
        if self.is_unbreakable(pos) {
            return None;
        }
        self.remove(pos)
    }

    fn attack(&mut self, attacker: EntityId, target: EntityId) -> bool {
        let Some(from) = self.position(attacker) else {
            return false;
        };
        let Some(body) = self.bodies.get_mut(&target) else {
            return false;
        };
        if !body.info.alive || body.info.position.distance(&from) > REACH {
            return false;
        }
        body.health -= ATTACK_DAMAGE;
        if body.health <= 0.0 {
            body.info.alive = false;
            body.nav = None;
        }
        true
    }

    fn interact(&mut self, actor: EntityId, target: EntityId, kind: &str) -> bool {
        let (Some(from), Some(info)) = (self.position(actor), self.entity(target)) else {
            return false;
        };
        if !info.alive || info.position.distance(&from) > REACH {
            return false;
        }
        let produce = match kind {
            "milk" => Some("milk_bucket"),
            "shear" => Some("white_wool"),
            _ => None,
        };
        if let Some(item) = produce {
            self.give_items(actor, item, 1);
        }
        true
    }

    fn give_items(&mut self, receiver: EntityId, item: &str, count: u32) -> bool {
        match self.bodies.get(&receiver) {
            Some(body) if body.info.alive => {
                *self
                    .inventories
                    .entry(receiver)
                    .or_default()
                    .entry(item.to_string())
                    .or_insert(0) += count;
                true
            }
            _ => false,
        }
    }

    fn drop_items(&mut self, at: Vec3, item: &str, count: u32) {
        self.dropped.push((at, item.to_string(), count));
    }

    fn craft(&mut self, crafter: EntityId, item: &str, count: u32) -> bool {
        self.give_items(crafter, item, count)
    }

    fn random_position_near(
        &mut self,
        center: Vec3,
        horizontal: i32,
        vertical: i32,
    ) -> Option<Vec3> {
        let origin = center.block_pos();
        for _ in 0..10 {
            let x = origin.x + self.rng.gen_range(-horizontal..=horizontal);
            let z = origin.z + self.rng.gen_range(-horizontal..=horizontal);
            let y = self.surface_height(x, z);
            if (y - origin.y).abs() <= vertical {
                return Some(BlockPos::new(x, y, z).bottom_center());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground(x: f64, z: f64) -> Vec3 {
        Vec3::new(x, GROUND_LEVEL as f64, z)
    }

    #[test]
    fn test_flat_world_surface() {
        let world = GridWorld::flat(4, 1);
        assert_eq!(world.surface_height(0, 0), GROUND_LEVEL);
        assert_eq!(world.block_at(BlockPos::new(0, GROUND_LEVEL - 1, 0)), "grass_block");
        assert!(world.is_air(BlockPos::new(0, GROUND_LEVEL, 0)));
        assert!(world.is_unbreakable(BlockPos::new(0, GROUND_LEVEL - 7, 0)));
    }

    #[test]
    fn test_navigation_moves_and_arrives() {
        let mut world = GridWorld::flat(16, 1);
        let id = world.spawn_agent("Ada", ground(0.5, 0.5));
        assert!(world.navigate_to(id, ground(4.5, 0.5), 1.0));
        for _ in 0..40 {
            world.step();
        }
        let pos = world.position(id).unwrap();
        assert!(pos.distance(&ground(4.5, 0.5)) < 0.5);
        assert!(world.navigation_done(id));
    }

    #[test]
    fn test_wall_blocks_movement() {
        let mut world = GridWorld::flat(16, 1);
        for y in GROUND_LEVEL..GROUND_LEVEL + 3 {
            for z in -3..=3 {
                world.set_block(BlockPos::new(2, y, z), "stone");
            }
        }
        let id = world.spawn_agent("Ada", ground(0.5, 0.5));
        world.navigate_to(id, ground(6.5, 0.5), 1.0);
        for _ in 0..40 {
            world.step();
        }
        assert!(world.position(id).unwrap().x < 2.0);
        assert!(!world.navigation_done(id));
    }

    #[test]
    fn test_steps_up_single_block() {
        let mut world = GridWorld::flat(16, 1);
        world.set_block(BlockPos::new(2, GROUND_LEVEL, 0), "dirt");
        let id = world.spawn_agent("Ada", ground(0.5, 0.5));
        world.navigate_to(id, ground(2.5, 0.5), 1.0);
        for _ in 0..20 {
            world.step();
        }
        let pos = world.position(id).unwrap();
        assert_eq!(pos.block_pos().y, GROUND_LEVEL + 1);
    }

    #[test]
    fn test_blocks_within_filters_by_name_and_cube() {
        let mut world = GridWorld::new(1);
        world.set_block(BlockPos::new(1, 0, 1), "iron_ore");
        world.set_block(BlockPos::new(40, 0, 0), "iron_ore");
        world.set_block(BlockPos::new(2, 0, 2), "coal_ore");
        let found = world.blocks_within(BlockPos::new(0, 0, 0), 8, &|n| n == "iron_ore");
        assert_eq!(found, vec![BlockPos::new(1, 0, 1)]);
    }

    #[test]
    fn test_attack_kills_after_repeated_hits() {
        let mut world = GridWorld::flat(8, 1);
        let agent = world.spawn_agent("Ada", ground(0.5, 0.5));
        let zombie = world.spawn_mob("zombie", EntityKind::Monster, ground(2.0, 0.5));
        assert!(world.attack(agent, zombie));
        assert!(world.attack(agent, zombie));
        assert!(world.attack(agent, zombie));
        assert!(!world.entity(zombie).unwrap().alive);
        assert!(!world.attack(agent, zombie));
    }

    #[test]
    fn test_unknown_block_not_placed() {
        let mut world = GridWorld::new(1);
        assert!(!world.set_block(BlockPos::new(0, 0, 0), "minecraft:unobtainium"));
        assert!(world.set_block(BlockPos::new(0, 0, 0), "minecraft:stone"));
        assert_eq!(world.block_at(BlockPos::new(0, 0, 0)), "stone");
    }
}
