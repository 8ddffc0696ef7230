//! Hunt and attack entities of a requested kind
//!
//! Combat is time-boxed rather than goal-boxed: the agent keeps fighting
//! whatever matches for a fixed number of ticks, re-acquiring targets as
//! they die, and then reports success.

use crate::actions::goal::{halt, relocate_near, Escalation, RepathTimer, StallTracker};
use crate::actions::{ActionEnv, ActionState, Behavior};
use crate::core::types::{EntityId, Vec3};
use crate::task::Task;
use crate::world::{EntityInfo, EntityKind, MovementMode, WorldAccess};
use tracing::{info, warn};

const COMBAT_TICKS: u64 = 600;
const SEARCH_RADIUS: f64 = 32.0;
const RESEARCH_INTERVAL: u64 = 20;
const ATTACK_RANGE: f64 = 3.5;
const ATTACK_COOLDOWN: u32 = 7;
const CHASE_SPEED: f64 = 2.5;

pub struct Combat {
    wanted: String,
    target: Option<EntityId>,
    cooldown: u32,
    kills: u32,
    stall: StallTracker,
    repath: RepathTimer,
}

/// Whether `entity` is fair game for a target description
///
/// Players and agents are never targets. "hostile", "mob", "monster" and
/// "any" match every monster; anything else matches by type name.
pub fn is_valid_target(entity: &EntityInfo, wanted: &str) -> bool {
    if !entity.alive || matches!(entity.kind, EntityKind::Player | EntityKind::Agent) {
        return false;
    }
    let wanted = wanted.trim().to_lowercase();
    if wanted.contains("mob") || wanted.contains("hostile") || wanted.contains("monster") || wanted == "any"
    {
        return entity.kind == EntityKind::Monster;
    }
    !wanted.is_empty() && entity.type_name.to_lowercase().contains(&wanted)
}

impl Combat {
    pub fn new(target: &str) -> Self {
        Self {
            wanted: target.to_string(),
            target: None,
            cooldown: 0,
            kills: 0,
            stall: StallTracker::new(),
            repath: RepathTimer::default(),
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self::new(task.get_str_or("target", "hostile"))
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }

    fn find_target(&mut self, env: &ActionEnv<'_>) {
        let Some(pos) = env.position() else {
            return;
        };
        self.target = nearest_match(&*env.world, pos, &self.wanted);
        if let Some(target) = self.target.and_then(|id| env.world.entity(id)) {
            self.stall.reset();
            info!(
                "{} locked onto {} at {:.0}m",
                env.agent.name,
                target.type_name,
                target.position.distance(&pos)
            );
        }
    }
}

fn nearest_match(
    world: &dyn WorldAccess,
    from: Vec3,
    wanted: &str,
) -> Option<EntityId> {
    world
        .entities_within(from, SEARCH_RADIUS)
        .into_iter()
        .filter(|e| is_valid_target(e, wanted))
        .min_by(|a, b| {
            a.position
                .distance_sqr(&from)
                .total_cmp(&b.position.distance_sqr(&from))
        })
        .map(|e| e.id)
}

impl Behavior for Combat {
    fn on_start(&mut self, env: &mut ActionEnv<'_>, _state: &mut ActionState) {
        env.world.set_movement(env.agent.id, MovementMode::Walking);
        self.find_target(env);
        if self.target.is_none() {
            warn!("{} found no {} nearby", env.agent.name, self.wanted);
        }
    }

    fn on_tick(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        let ticks = state.ticks_run();
        if ticks > COMBAT_TICKS {
            halt(env);
            info!("{} combat complete ({} defeated)", env.agent.name, self.kills);
            state.mark_complete(true, "Combat complete");
            return;
        }
        self.cooldown = self.cooldown.saturating_sub(1);

        let live_target = self
            .target
            .and_then(|id| env.world.entity(id))
            .filter(|e| e.alive);
        let target = match live_target {
            Some(target) => target,
            None => {
                self.target = None;
                if ticks % RESEARCH_INTERVAL == 0 {
                    self.find_target(env);
                }
                return;
            }
        };

        let Some(pos) = env.position() else {
            state.mark_complete(false, "Agent is no longer in the world");
            return;
        };
        let dist_sqr = pos.distance_sqr(&target.position);

        if dist_sqr <= ATTACK_RANGE * ATTACK_RANGE {
            env.world.stop_navigation(env.agent.id);
            if self.cooldown == 0 && env.world.attack(env.agent.id, target.id) {
                self.cooldown = ATTACK_COOLDOWN;
                let still_alive = env.world.entity(target.id).map(|e| e.alive).unwrap_or(false);
                if !still_alive {
                    self.kills += 1;
                    self.target = None;
                    env.say(&format!("Defeated a {}!", target.type_name));
                }
            }
            return;
        }

        match self.stall.observe(dist_sqr, env.grounded()) {
            Escalation::Relocate => {
                relocate_near(env, target.position);
                self.repath.force();
            }
            Escalation::Unstick => env.world.jump(env.agent.id),
            Escalation::None => {}
        }
        if self.repath.due(env.world.navigation_done(env.agent.id)) {
            env.world.set_movement(env.agent.id, MovementMode::Sprinting);
            env.world
                .navigate_to_entity(env.agent.id, target.id, CHASE_SPEED);
        }
    }

    fn on_cancel(&mut self, env: &mut ActionEnv<'_>) {
        self.target = None;
        halt(env);
    }

    fn description(&self) -> String {
        format!("Attack {}", self.wanted)
    }
}
