//! Fallback behaviour when the queue is empty: hang around the nearest player

use crate::actions::catalog::ActionKind;
use crate::actions::goal::{halt, nearest_player, RepathTimer};
use crate::actions::{Action, ActionEnv, ActionState, Behavior};
use crate::world::MovementMode;

const COMFORT_DISTANCE: f64 = 4.0;
const PLAYER_SEARCH_RADIUS: f64 = 64.0;

pub struct IdleFollow {
    repath: RepathTimer,
}

impl IdleFollow {
    pub fn new() -> Self {
        Self {
            repath: RepathTimer::default(),
        }
    }

    /// Wrapped in an [`Action`] so the executor can drive it like any other
    pub fn action() -> Action {
        Action::new(ActionKind::Follow, Self::new())
    }
}

impl Default for IdleFollow {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for IdleFollow {
    fn on_start(&mut self, env: &mut ActionEnv<'_>, _state: &mut ActionState) {
        env.world.set_movement(env.agent.id, MovementMode::Walking);
    }

    fn on_tick(&mut self, env: &mut ActionEnv<'_>, _state: &mut ActionState) {
        let Some(pos) = env.position() else {
            return;
        };
        let Some(player) = nearest_player(&*env.world, pos, PLAYER_SEARCH_RADIUS) else {
            return;
        };
        if pos.distance_sqr(&player.position) <= COMFORT_DISTANCE * COMFORT_DISTANCE {
            env.world.stop_navigation(env.agent.id);
            return;
        }
        if self.repath.due(env.world.navigation_done(env.agent.id)) {
            env.world.navigate_to_entity(env.agent.id, player.id, 1.0);
        }
    }

    fn on_cancel(&mut self, env: &mut ActionEnv<'_>) {
        halt(env);
    }

    fn description(&self) -> String {
        "Idle near the nearest player".to_string()
    }
}
