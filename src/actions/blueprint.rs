//! Build from a blueprint or a named structure

use crate::actions::goal::{
    find_safe_position, relocate_near, Escalation, ProgressCadence, RepathTimer, StallTracker,
    TickBudget,
};
use crate::actions::{ActionEnv, ActionResult, ActionState, Behavior};
use crate::blueprints::{self, Placement};
use crate::core::types::{BlockPos, Vec3};
use crate::task::Task;
use crate::world::WorldAccess;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

const TIMEOUT: TickBudget = TickBudget::new(24_000);
const PLACE_DELAY: u32 = 4;
const PLACE_REACH_SQR: f64 = 16.0;
const MIN_FLATNESS_SCORE: u32 = 5;

pub struct BlueprintBuild {
    name: String,
    blueprint: Vec<Placement>,
    origin: Option<BlockPos>,
    problem: Option<String>,
    queue: VecDeque<(BlockPos, String)>,
    current: Option<(BlockPos, String)>,
    total: u32,
    placed: u32,
    delay: u32,
    stall: StallTracker,
    repath: RepathTimer,
    cadence: ProgressCadence,
}

impl BlueprintBuild {
    pub fn new(name: impl Into<String>, blueprint: Vec<Placement>) -> Self {
        Self {
            name: name.into(),
            blueprint,
            origin: None,
            problem: None,
            queue: VecDeque::new(),
            current: None,
            total: 0,
            placed: 0,
            delay: 0,
            stall: StallTracker::new(),
            repath: RepathTimer::default(),
            cadence: ProgressCadence::new(20),
        }
    }

    /// Build at a fixed origin instead of scanning for flat ground
    pub fn at(mut self, origin: BlockPos) -> Self {
        self.origin = Some(origin);
        self
    }

    /// `blocks` is a list of `{x, y, z, name}` maps
    pub fn from_task(task: &Task) -> Self {
        let entries = task.get_list("blocks").unwrap_or_default();
        let blueprint: Vec<Placement> = entries
            .iter()
            .filter_map(|entry| {
                let placement = Placement::from_param(entry);
                if placement.is_none() {
                    warn!("Skipping unusable blueprint entry: {:?}", entry);
                }
                placement
            })
            .collect();
        Self::new(task.get_str_or("name", "blueprint"), blueprint).with_task_origin(task)
    }

    /// `structure` names an entry of the structure library
    pub fn from_structure_task(task: &Task) -> Self {
        let structure = task.get_str_or("structure", "");
        let build = match blueprints::builtin().expand(structure, task.get_str("material")) {
            Some(blueprint) => Self::new(structure.to_lowercase(), blueprint),
            None => {
                let mut build = Self::new(structure, Vec::new());
                build.problem = Some(format!("Unknown structure: {}", structure));
                build
            }
        };
        build.with_task_origin(task)
    }

    fn with_task_origin(mut self, task: &Task) -> Self {
        if task.has_parameters(&["x", "y", "z"]) {
            self.origin = Some(BlockPos::new(
                task.get_coord("x"),
                task.get_coord("y"),
                task.get_coord("z"),
            ));
        }
        self
    }

    pub fn placed(&self) -> u32 {
        self.placed
    }

    fn place_current(&mut self, env: &mut ActionEnv<'_>) {
        let Some((cell, block)) = self.current.take() else {
            return;
        };
        if env.world.block_at(cell) == block {
            self.placed += 1;
            return;
        }
        if !env.world.is_replaceable(cell) {
            debug!("{} skipping occupied cell {}", env.agent.name, cell);
            return;
        }
        if !env.world.set_block(cell, &block) {
            warn!("{} could not place {} at {}", env.agent.name, block, cell);
            return;
        }
        push_out_of_cell(env, cell);
        self.placed += 1;
        self.delay = PLACE_DELAY;
        if self.cadence.due(self.placed) {
            env.say(&format!(
                "Placed {} out of {} blocks.",
                self.placed, self.total
            ));
        }
    }
}

/// Score a candidate origin by how flat and open its 3×3 area is
fn flatness_score(world: &dyn WorldAccess, center: BlockPos) -> u32 {
    let mut score = 0;
    for dx in -1..=1 {
        for dz in -1..=1 {
            let pos = center.offset(dx, 0, dz);
            if !world.is_air(pos.below()) && world.is_air(pos) {
                score += 1;
            }
            if world.is_air(pos) && world.is_air(pos.above()) {
                score += 1;
            }
        }
    }
    score
}

/// Pick flat ground near the agent, never the agent's own cell
pub fn find_build_origin(env: &ActionEnv<'_>) -> Option<BlockPos> {
    let feet = env.position()?.block_pos();
    let mut best: Option<(BlockPos, u32)> = None;
    for dx in (-5..=5).step_by(2) {
        for dz in (-5..=5).step_by(2) {
            if dx == 0 && dz == 0 {
                continue;
            }
            let candidate = feet.offset(dx, 0, dz);
            let score = flatness_score(&*env.world, candidate);
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((candidate, score));
            }
        }
    }
    match best {
        Some((pos, score)) if score > MIN_FLATNESS_SCORE => Some(pos),
        _ => Some(feet.relative(env.world.facing(env.agent.id), 5)),
    }
}

/// Lift the agent on top of a block placed where it stands
fn push_out_of_cell(env: &mut ActionEnv<'_>, cell: BlockPos) {
    let Some(pos) = env.position() else {
        return;
    };
    let feet = pos.block_pos();
    if cell != feet && cell != feet.above() {
        return;
    }
    let destination = find_safe_position(&*env.world, cell.above());
    env.world.teleport(env.agent.id, destination);
}

impl Behavior for BlueprintBuild {
    fn on_start(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        if let Some(problem) = &self.problem {
            env.say(&format!("I don't know how to build a {}.", self.name));
            state.complete(ActionResult::failure_replan(problem.clone()));
            return;
        }
        if self.blueprint.is_empty() {
            env.say("I couldn't figure out how to build that. The blueprint was empty.");
            state.complete(ActionResult::failure_replan("Empty or invalid blueprint"));
            return;
        }
        let Some(origin) = self.origin.or_else(|| find_build_origin(env)) else {
            state.mark_complete(false, "Agent is no longer in the world");
            return;
        };
        self.origin = Some(origin);

        let mut cells: Vec<(BlockPos, String)> = self
            .blueprint
            .iter()
            .map(|p| {
                (
                    origin.offset(p.offset.x, p.offset.y, p.offset.z),
                    p.block.clone(),
                )
            })
            .collect();
        // bottom-up so every block has support
        cells.sort_by_key(|(pos, _)| pos.y);
        self.total = u32::try_from(cells.len()).unwrap_or(u32::MAX);
        self.queue = cells.into();

        env.say(&format!("I'm going to build at {}", origin));
        env.say(&format!(
            "Starting construction! I have {} blocks to place.",
            self.total
        ));
        info!(
            "{} building {} with {} blocks at {}",
            env.agent.name, self.name, self.total, origin
        );
    }

    fn on_tick(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        if TIMEOUT.exceeded(state.ticks_run()) {
            env.world.stop_navigation(env.agent.id);
            env.say("This is taking too long, I'm going to stop for now.");
            state.mark_complete(
                false,
                format!("Building timeout: placed {} of {}", self.placed, self.total),
            );
            return;
        }
        if self.delay > 0 {
            self.delay -= 1;
            return;
        }

        if self.current.is_none() {
            let Some(next) = self.queue.pop_front() else {
                env.world.stop_navigation(env.agent.id);
                env.say("I'm all done building!");
                state.mark_complete(
                    true,
                    format!("Built {}: placed {} of {} blocks", self.name, self.placed, self.total),
                );
                return;
            };
            self.current = Some(next);
            self.stall.reset();
            self.repath.force();
        }

        let Some((cell, _)) = self.current.clone() else {
            return;
        };
        let Some(pos) = env.position() else {
            state.mark_complete(false, "Agent is no longer in the world");
            return;
        };
        let dist_sqr = pos.distance_sqr(&cell.center());

        if dist_sqr < PLACE_REACH_SQR {
            self.place_current(env);
            return;
        }

        match self.stall.observe(dist_sqr, env.grounded()) {
            Escalation::Relocate => {
                relocate_near(env, cell.bottom_center());
                self.repath.force();
            }
            Escalation::Unstick => env.world.jump(env.agent.id),
            Escalation::None => {}
        }
        if self.repath.due(env.world.navigation_done(env.agent.id)) {
            let above = cell.bottom_center() + Vec3::new(0.0, 1.0, 0.0);
            env.world.navigate_to(env.agent.id, above, 1.0);
        }
    }

    fn on_cancel(&mut self, env: &mut ActionEnv<'_>) {
        self.queue.clear();
        self.current = None;
        env.world.stop_navigation(env.agent.id);
        env.say("Building cancelled.");
    }

    fn description(&self) -> String {
        format!("Building {} ({}/{})", self.name, self.placed, self.total)
    }
}
