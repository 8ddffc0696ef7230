//! Follow a player, flying to catch up when far behind

use crate::actions::goal::{halt, relocate_near, Escalation, RepathTimer, StallTracker, TickBudget};
use crate::actions::{ActionEnv, ActionResult, ActionState, Behavior};
use crate::core::types::EntityId;
use crate::task::Task;
use crate::world::{EntityInfo, MovementMode, WorldAccess};
use tracing::info;

const TIMEOUT: TickBudget = TickBudget::new(6_000);
const FLY_DISTANCE: f64 = 10.0;
const LAND_DISTANCE: f64 = 5.0;
const KEEP_DISTANCE: f64 = 3.0;

pub struct FollowPlayer {
    requested: String,
    player: Option<EntityId>,
    player_name: String,
    flying: bool,
    stall: StallTracker,
    repath: RepathTimer,
}

/// Names a planner uses when it means "whoever is talking to me"
pub fn is_placeholder(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.is_empty()
        || trimmed.contains("PLAYER")
        || trimmed.contains("NAME")
        || trimmed.eq_ignore_ascii_case("me")
        || trimmed.eq_ignore_ascii_case("you")
}

/// Resolve a player by exact name, or the nearest one for placeholders
pub fn find_player(world: &dyn WorldAccess, near: EntityId, name: &str) -> Option<EntityInfo> {
    let players = world.players();
    if let Some(exact) = players.iter().find(|p| p.name.eq_ignore_ascii_case(name.trim())) {
        return Some(exact.clone());
    }
    if !is_placeholder(name) {
        return None;
    }
    let from = world.position(near)?;
    players.into_iter().min_by(|a, b| {
        a.position
            .distance_sqr(&from)
            .total_cmp(&b.position.distance_sqr(&from))
    })
}

impl FollowPlayer {
    pub fn new(player: &str) -> Self {
        Self {
            requested: player.to_string(),
            player: None,
            player_name: player.to_string(),
            flying: false,
            stall: StallTracker::new(),
            repath: RepathTimer::default(),
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self::new(task.get_str_or("player", ""))
    }

    fn set_flying(&mut self, env: &mut ActionEnv<'_>, flying: bool) {
        self.flying = flying;
        let mode = if flying {
            MovementMode::Flying
        } else {
            MovementMode::Walking
        };
        env.world.set_movement(env.agent.id, mode);
    }
}

impl Behavior for FollowPlayer {
    fn on_start(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        self.set_flying(env, false);
        match find_player(&*env.world, env.agent.id, &self.requested) {
            Some(player) => {
                info!("{} following {}", env.agent.name, player.name);
                self.player = Some(player.id);
                self.player_name = player.name;
                env.say("Coming to you!");
            }
            None => {
                state.complete(ActionResult::failure_replan(format!(
                    "Player not found: {}",
                    self.requested
                )));
            }
        }
    }

    fn on_tick(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        if TIMEOUT.exceeded(state.ticks_run()) {
            halt(env);
            if let Some(pos) = env.position() {
                env.say(&format!(
                    "I'm tired of following. I am at {}",
                    pos.block_pos()
                ));
            }
            state.mark_complete(true, format!("Stopped following {}", self.player_name));
            return;
        }

        let player = self
            .player
            .and_then(|id| env.world.entity(id))
            .filter(|p| p.alive)
            .or_else(|| find_player(&*env.world, env.agent.id, &self.requested));
        let Some(player) = player else {
            halt(env);
            state.complete(ActionResult::failure_replan(format!(
                "Lost track of {}",
                self.player_name
            )));
            return;
        };
        self.player = Some(player.id);
        let Some(pos) = env.position() else {
            state.mark_complete(false, "Agent is no longer in the world");
            return;
        };

        let distance = pos.distance(&player.position);
        if distance > FLY_DISTANCE && !self.flying {
            self.set_flying(env, true);
        } else if distance < LAND_DISTANCE && self.flying {
            self.set_flying(env, false);
        }

        if distance > KEEP_DISTANCE {
            match self.stall.observe(distance * distance, env.grounded()) {
                Escalation::Relocate => {
                    relocate_near(env, player.position);
                    self.repath.force();
                }
                Escalation::Unstick => env.world.jump(env.agent.id),
                Escalation::None => {}
            }
            if self.repath.due(env.world.navigation_done(env.agent.id)) {
                env.world.navigate_to_entity(env.agent.id, player.id, 1.0);
            }
        } else {
            env.world.stop_navigation(env.agent.id);
            self.stall.reset();
            self.repath.force();
        }
    }

    fn on_cancel(&mut self, env: &mut ActionEnv<'_>) {
        self.flying = false;
        halt(env);
    }

    fn description(&self) -> String {
        format!("Follow player {}", self.player_name)
    }
}
