//! Walk to a coordinate

use crate::actions::goal::{approach, RepathTimer, StallTracker, TickBudget};
use crate::actions::{ActionEnv, ActionState, Behavior};
use crate::core::types::BlockPos;
use crate::task::Task;

const TIMEOUT: TickBudget = TickBudget::new(600);
const ARRIVE_DISTANCE: f64 = 2.0;

pub struct Pathfind {
    target: BlockPos,
    stall: StallTracker,
    repath: RepathTimer,
}

impl Pathfind {
    pub fn new(target: BlockPos) -> Self {
        Self {
            target,
            stall: StallTracker::new(),
            repath: RepathTimer::default(),
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self::new(BlockPos::new(
            task.get_coord("x"),
            task.get_coord("y"),
            task.get_coord("z"),
        ))
    }
}

impl Behavior for Pathfind {
    fn on_start(&mut self, env: &mut ActionEnv<'_>, _state: &mut ActionState) {
        env.world
            .navigate_to(env.agent.id, self.target.bottom_center(), 1.0);
    }

    fn on_tick(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        if TIMEOUT.exceeded(state.ticks_run()) {
            env.world.stop_navigation(env.agent.id);
            state.mark_complete(false, format!("Pathfinding timeout on the way to {}", self.target));
            return;
        }

        let objective = self.target.bottom_center();
        let Some(dist_sqr) = approach(env, objective, &mut self.stall, &mut self.repath, true)
        else {
            state.mark_complete(false, "Agent is no longer in the world");
            return;
        };

        if dist_sqr <= ARRIVE_DISTANCE * ARRIVE_DISTANCE {
            env.world.stop_navigation(env.agent.id);
            state.mark_complete(true, format!("Reached {}", self.target));
        }
    }

    fn on_cancel(&mut self, env: &mut ActionEnv<'_>) {
        env.world.stop_navigation(env.agent.id);
    }

    fn description(&self) -> String {
        format!("Pathfind to {}", self.target)
    }
}
