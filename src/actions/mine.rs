//! Mining and gathering
//!
//! A four-phase loop: search for the nearest matching block, walk to it,
//! break it, and once enough have been collected carry the haul back to the
//! nearest player. Logs are vein-mined. Deep ores that cannot be found
//! nearby are reached by digging a staircase downward.

use crate::actions::goal::{
    clear_surroundings, halt, nearest_player, relocate_near, wander_step, Escalation,
    ProgressCadence, RepathTimer, StallTracker, TickBudget,
};
use crate::actions::{ActionEnv, ActionResult, ActionState, Behavior};
use crate::core::types::BlockPos;
use crate::task::Task;
use crate::world::{blocks, EntityInfo, MovementMode};
use std::collections::VecDeque;
use tracing::{debug, info};

const TIMEOUT: TickBudget = TickBudget::new(12_000);
const SEARCH_RADIUS: i32 = 32;
const REACH_SQR: f64 = 25.0;
const DELIVER_SQR: f64 = 9.0;
const PLAYER_SEARCH_DISTANCE: f64 = 100.0;
/// Staircases are only dug while above this height
const STAIRCASE_FLOOR: f64 = 16.0;
const WATER_PENALTY: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MinePhase {
    Searching,
    MovingToBlock,
    Mining,
    Returning,
}

pub struct MineBlock {
    requested: String,
    block: Option<String>,
    quantity: u32,
    mined: u32,
    phase: MinePhase,
    target: Option<BlockPos>,
    vein: VecDeque<BlockPos>,
    stall: StallTracker,
    repath: RepathTimer,
    cadence: ProgressCadence,
    verb: &'static str,
}

impl MineBlock {
    pub fn new(block: &str, quantity: u32) -> Self {
        Self {
            requested: block.to_string(),
            block: blocks::resolve(block),
            quantity: quantity.max(1),
            mined: 0,
            phase: MinePhase::Searching,
            target: None,
            vein: VecDeque::new(),
            stall: StallTracker::new(),
            repath: RepathTimer::default(),
            cadence: ProgressCadence::new(5),
            verb: "Mining",
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self::new(
            task.get_str_or("block", ""),
            task.get_count("quantity"),
        )
    }

    /// `gather` is mining after resource aliasing
    pub fn from_gather_task(task: &Task) -> Self {
        let mut mine = Self::new(
            task.get_str_or("resource", ""),
            task.get_count("quantity"),
        );
        mine.verb = "Gathering";
        mine
    }

    pub fn mined(&self) -> u32 {
        self.mined
    }

    fn matches(&self, name: &str) -> bool {
        self.block
            .as_deref()
            .map(|b| blocks::is_same_ore(name, b))
            .unwrap_or(false)
    }

    fn is_deep(&self) -> bool {
        self.block.as_deref().map(blocks::is_deep_ore).unwrap_or(false)
    }

    fn block_name(&self) -> &str {
        self.block.as_deref().unwrap_or(&self.requested)
    }

    /// Nearest matching block, preferring ones not under water
    fn scan(&self, env: &ActionEnv<'_>, from: BlockPos) -> Option<BlockPos> {
        let world = &*env.world;
        let matcher = |name: &str| self.matches(name);
        let score = |p: &BlockPos| {
            let penalty = if world.is_water_source(p.above()) {
                WATER_PENALTY
            } else {
                0.0
            };
            p.dist_sqr(&from) + penalty
        };
        world
            .blocks_within(from, SEARCH_RADIUS, &matcher)
            .into_iter()
            .filter(|p| !world.is_unbreakable(*p))
            .min_by(|a, b| score(a).total_cmp(&score(b)))
    }

    fn scan_vein(&mut self, env: &ActionEnv<'_>, center: BlockPos) {
        for dy in 0..=1 {
            for dx in -1..=1 {
                for dz in -1..=1 {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    let cell = center.offset(dx, dy, dz);
                    let queued = u32::try_from(self.vein.len()).unwrap_or(u32::MAX);
                    if self.mined.saturating_add(queued) >= self.quantity {
                        return;
                    }
                    if self.matches(&env.world.block_at(cell)) && !self.vein.contains(&cell) {
                        self.vein.push_back(cell);
                    }
                }
            }
        }
    }

    fn search(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        let Some(pos) = env.position() else {
            state.mark_complete(false, "Agent is no longer in the world");
            return;
        };

        let mut found = None;
        while let Some(candidate) = self.vein.pop_front() {
            if self.matches(&env.world.block_at(candidate)) {
                found = Some(candidate);
                break;
            }
        }
        if found.is_none() {
            found = self.scan(env, pos.block_pos());
        }

        match found {
            Some(block_pos) => {
                env.world.stop_navigation(env.agent.id);
                self.target = Some(block_pos);
                self.phase = MinePhase::MovingToBlock;
                self.stall.reset();
                self.repath.force();
                if self.mined == 0 {
                    env.say(&format!("Found {} at {}!", self.block_name(), block_pos));
                }
                info!("{} found {} at {}", env.agent.name, self.block_name(), block_pos);
            }
            None if self.is_deep() && pos.y > STAIRCASE_FLOOR => dig_staircase(env),
            None => {
                if env.world.navigation_done(env.agent.id) {
                    wander_step(env, 16, 7);
                }
            }
        }
    }

    fn move_to_block(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        let Some(target) = self.target else {
            self.phase = MinePhase::Searching;
            return;
        };
        if !self.matches(&env.world.block_at(target)) {
            self.target = None;
            self.phase = MinePhase::Searching;
            return;
        }
        let Some(pos) = env.position() else {
            state.mark_complete(false, "Agent is no longer in the world");
            return;
        };
        let feet = pos.block_pos();
        let dist_sqr = feet.dist_sqr(&target);

        match self.stall.observe(dist_sqr, env.grounded()) {
            Escalation::Relocate => {
                relocate_near(env, target.bottom_center());
                self.phase = MinePhase::Mining;
                return;
            }
            Escalation::Unstick => {
                let block = self.block.clone().unwrap_or_default();
                clear_surroundings(env, &|name| blocks::is_same_ore(name, &block));
                if env.grounded() {
                    env.world.jump(env.agent.id);
                }
                if self.is_deep() && target.y < feet.y {
                    dig_staircase(env);
                }
            }
            Escalation::None => {}
        }

        if dist_sqr <= REACH_SQR {
            env.world.stop_navigation(env.agent.id);
            self.phase = MinePhase::Mining;
            return;
        }

        if self.repath.due(env.world.navigation_done(env.agent.id)) {
            let path_found = env
                .world
                .navigate_to(env.agent.id, target.bottom_center(), 1.0);
            if !path_found && dist_sqr < 100.0 {
                self.stall.accelerate(10);
            } else if !path_found && self.is_deep() && target.y < feet.y {
                dig_staircase(env);
            }
        }
    }

    fn mine_target(&mut self, env: &mut ActionEnv<'_>) {
        self.phase = MinePhase::Searching;
        let Some(target) = self.target.take() else {
            return;
        };
        if !self.matches(&env.world.block_at(target)) {
            return;
        }
        if env.world.destroy_block(target).is_none() {
            return;
        }
        self.mined += 1;

        if blocks::is_log(self.block_name()) {
            self.scan_vein(env, target);
        }
        info!(
            "{} mined {} ({}/{})",
            env.agent.name,
            self.block_name(),
            self.mined,
            self.quantity
        );

        if self.mined >= self.quantity {
            self.phase = MinePhase::Returning;
            self.stall.reset();
            self.repath.force();
            env.say(&format!(
                "I've collected enough {}. Coming back to you now.",
                self.block_name()
            ));
        } else if self.cadence.due(self.mined) {
            env.say(&format!(
                "Mined {}/{} {}",
                self.mined,
                self.quantity,
                self.block_name()
            ));
        }
    }

    fn return_to_player(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        let Some(pos) = env.position() else {
            state.mark_complete(false, "Agent is no longer in the world");
            return;
        };
        // re-resolved every tick so a moving player is tracked
        let player = nearest_player(&*env.world, pos, PLAYER_SEARCH_DISTANCE);
        let return_pos = player.as_ref().map(|p| p.position).unwrap_or(pos);
        let dist_sqr = pos.block_pos().dist_sqr(&return_pos.block_pos());

        match self.stall.observe(dist_sqr, env.grounded()) {
            Escalation::Relocate => {
                relocate_near(env, return_pos);
                halt(env);
                self.deliver(env, state, player.as_ref());
                return;
            }
            Escalation::Unstick => env.world.jump(env.agent.id),
            Escalation::None => {}
        }

        if dist_sqr <= DELIVER_SQR {
            halt(env);
            self.deliver(env, state, player.as_ref());
            return;
        }

        if self.repath.due(env.world.navigation_done(env.agent.id)) {
            let id = env.agent.id;
            let path_found = match &player {
                Some(p) => env.world.navigate_to_entity(id, p.id, 1.0),
                None => env.world.navigate_to(id, return_pos, 1.0),
            };
            if !path_found && dist_sqr < 100.0 {
                self.stall.accelerate(10);
            }
        }
    }

    fn deliver(
        &mut self,
        env: &mut ActionEnv<'_>,
        state: &mut ActionState,
        player: Option<&EntityInfo>,
    ) {
        let block = self.block_name().to_string();
        let item = blocks::drop_for(&block);
        let mut handed_over = false;

        if let Some(player) = player {
            handed_over = env.world.give_items(player.id, &item, self.mined);
            if handed_over {
                env.say(&format!(
                    "I put {} {} in your inventory.",
                    self.mined, block
                ));
            } else {
                env.say(&format!(
                    "Your inventory is full, so I dropped the {} here.",
                    block
                ));
            }
        }
        if !handed_over {
            if let Some(pos) = env.position() {
                env.world.drop_items(pos, &item, self.mined);
            }
        }
        state.mark_complete(true, format!("Mined {} {} and returned.", self.mined, block));
    }
}

/// Dig one step of a two-wide staircase in the facing direction
fn dig_staircase(env: &mut ActionEnv<'_>) {
    let Some(pos) = env.position() else {
        return;
    };
    let id = env.agent.id;
    let dir = env.world.facing(id);
    let next_step = pos.block_pos().relative(dir, 1).below();

    if env.world.is_unbreakable(next_step) {
        env.world.set_facing(id, dir.opposite());
        return;
    }

    let right = dir.clockwise();
    for base in [next_step, next_step.relative(right, 1)] {
        for dy in 0..=2 {
            let cell = base.offset(0, dy, 0);
            if !env.world.is_air(cell) && !env.world.is_unbreakable(cell) {
                env.world.destroy_block(cell);
            }
        }
    }
    env.world.navigate_to(id, next_step.bottom_center(), 1.0);
    debug!("{} digging staircase down to Y={}", env.agent.name, next_step.y);
}

impl Behavior for MineBlock {
    fn on_start(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        let Some(block) = self.block.clone() else {
            state.complete(ActionResult::failure_replan(format!(
                "Invalid block type: {}",
                self.requested
            )));
            return;
        };
        env.world.set_movement(env.agent.id, MovementMode::Walking);
        env.say(&format!(
            "I'm going to mine {} {} for you.",
            self.quantity, block
        ));
        info!(
            "{} starting to mine {} {}",
            env.agent.name, self.quantity, block
        );
    }

    fn on_tick(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        if TIMEOUT.exceeded(state.ticks_run()) {
            halt(env);
            env.say(&format!(
                "I couldn't finish mining in time. I got {} blocks.",
                self.mined
            ));
            state.mark_complete(
                false,
                format!(
                    "Mining timeout: collected {} of {}",
                    self.mined, self.quantity
                ),
            );
            return;
        }

        match self.phase {
            MinePhase::Searching => self.search(env, state),
            MinePhase::MovingToBlock => self.move_to_block(env, state),
            MinePhase::Mining => self.mine_target(env),
            MinePhase::Returning => self.return_to_player(env, state),
        }
    }

    fn on_cancel(&mut self, env: &mut ActionEnv<'_>) {
        halt(env);
    }

    fn description(&self) -> String {
        format!(
            "{} {} ({}/{}, {:?})",
            self.verb,
            self.block_name(),
            self.mined,
            self.quantity,
            self.phase
        )
    }
}
