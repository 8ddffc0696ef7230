//! Place a single block

use crate::actions::goal::{approach, RepathTimer, StallTracker, TickBudget};
use crate::actions::{ActionEnv, ActionResult, ActionState, Behavior};
use crate::core::types::BlockPos;
use crate::task::Task;
use crate::world::blocks;

const TIMEOUT: TickBudget = TickBudget::new(600);
const REACH: f64 = 4.0;

pub struct PlaceBlock {
    requested: String,
    block: Option<String>,
    target: BlockPos,
    stall: StallTracker,
    repath: RepathTimer,
}

impl PlaceBlock {
    pub fn new(block: &str, target: BlockPos) -> Self {
        Self {
            requested: block.to_string(),
            block: blocks::resolve(block),
            target,
            stall: StallTracker::new(),
            repath: RepathTimer::default(),
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self::new(
            task.get_str_or("block", ""),
            BlockPos::new(
                task.get_coord("x"),
                task.get_coord("y"),
                task.get_coord("z"),
            ),
        )
    }
}

impl Behavior for PlaceBlock {
    fn on_start(&mut self, _env: &mut ActionEnv<'_>, state: &mut ActionState) {
        if self.block.is_none() {
            state.complete(ActionResult::failure_replan(format!(
                "Invalid block type: {}",
                self.requested
            )));
        }
    }

    fn on_tick(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        let Some(block) = self.block.clone() else {
            return;
        };
        if TIMEOUT.exceeded(state.ticks_run()) {
            env.world.stop_navigation(env.agent.id);
            state.mark_complete(false, format!("Could not reach {} to place {}", self.target, block));
            return;
        }

        let Some(dist_sqr) = approach(
            env,
            self.target.bottom_center(),
            &mut self.stall,
            &mut self.repath,
            false,
        ) else {
            state.mark_complete(false, "Agent is no longer in the world");
            return;
        };
        if dist_sqr > REACH * REACH {
            return;
        }

        env.world.stop_navigation(env.agent.id);
        if !env.world.is_replaceable(self.target) {
            let existing = env.world.block_at(self.target);
            state.mark_complete(
                false,
                format!("{} is occupied by {}", self.target, existing),
            );
        } else if env.world.set_block(self.target, &block) {
            state.mark_complete(true, format!("Placed {} at {}", block, self.target));
        } else {
            state.mark_complete(false, format!("Could not place {} at {}", block, self.target));
        }
    }

    fn on_cancel(&mut self, env: &mut ActionEnv<'_>) {
        env.world.stop_navigation(env.agent.id);
    }

    fn description(&self) -> String {
        format!(
            "Place {} at {}",
            self.block.as_deref().unwrap_or(&self.requested),
            self.target
        )
    }
}
