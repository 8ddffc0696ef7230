//! Walk up to an entity and interact with it (feed, milk, shear, ...)

use crate::actions::goal::{relocate_near, Escalation, RepathTimer, StallTracker, TickBudget};
use crate::actions::{ActionEnv, ActionResult, ActionState, Behavior};
use crate::core::types::EntityId;
use crate::task::Task;
use crate::world::{EntityInfo, EntityKind};
use tracing::info;

const TIMEOUT: TickBudget = TickBudget::new(1_200);
const SEARCH_RADIUS: f64 = 20.0;
const INTERACT_DISTANCE: f64 = 3.0;
const RESEARCH_DELAY: u32 = 20;

pub struct Interact {
    target_type: String,
    kind: String,
    target: Option<EntityId>,
    search_delay: u32,
    stall: StallTracker,
    repath: RepathTimer,
}

impl Interact {
    pub fn new(target_type: &str, kind: &str) -> Self {
        Self {
            target_type: target_type.trim().to_lowercase(),
            kind: kind.trim().to_lowercase(),
            target: None,
            search_delay: 0,
            stall: StallTracker::new(),
            repath: RepathTimer::default(),
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self::new(task.get_str_or("target", "cow"), task.get_str_or("type", "feed"))
    }

    fn matches(&self, entity: &EntityInfo) -> bool {
        entity.alive
            && entity.kind != EntityKind::Agent
            && (entity.type_name.to_lowercase().contains(&self.target_type)
                || entity.name.eq_ignore_ascii_case(&self.target_type))
    }

    fn find_target(&mut self, env: &ActionEnv<'_>) -> bool {
        let Some(pos) = env.position() else {
            return false;
        };
        let found = env
            .world
            .entities_within(pos, SEARCH_RADIUS)
            .into_iter()
            .filter(|e| e.id != env.agent.id && self.matches(e))
            .min_by(|a, b| {
                a.position
                    .distance_sqr(&pos)
                    .total_cmp(&b.position.distance_sqr(&pos))
            });
        if let Some(entity) = &found {
            info!("{} found interaction target {}", env.agent.name, entity.name);
        }
        self.target = found.map(|e| e.id);
        self.target.is_some()
    }
}

impl Behavior for Interact {
    fn on_start(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        if !self.find_target(env) {
            state.complete(ActionResult::failure_replan(format!(
                "Could not find {}",
                self.target_type
            )));
        }
    }

    fn on_tick(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState) {
        if TIMEOUT.exceeded(state.ticks_run()) {
            env.world.stop_navigation(env.agent.id);
            state.mark_complete(false, format!("Could not reach {}", self.target_type));
            return;
        }

        let target = self
            .target
            .and_then(|id| env.world.entity(id))
            .filter(|e| e.alive);
        let Some(target) = target else {
            if self.search_delay == 0 {
                self.find_target(env);
                self.search_delay = RESEARCH_DELAY;
            } else {
                self.search_delay -= 1;
            }
            return;
        };
        let Some(pos) = env.position() else {
            state.mark_complete(false, "Agent is no longer in the world");
            return;
        };

        let dist_sqr = pos.distance_sqr(&target.position);
        if dist_sqr > INTERACT_DISTANCE * INTERACT_DISTANCE {
            match self.stall.observe(dist_sqr, env.grounded()) {
                Escalation::Relocate => {
                    relocate_near(env, target.position);
                    self.repath.force();
                }
                Escalation::Unstick => env.world.jump(env.agent.id),
                Escalation::None => {}
            }
            if self.repath.due(env.world.navigation_done(env.agent.id)) {
                env.world.navigate_to_entity(env.agent.id, target.id, 1.0);
            }
            return;
        }

        env.world.stop_navigation(env.agent.id);
        if env.world.interact(env.agent.id, target.id, &self.kind) {
            state.mark_complete(
                true,
                format!("Interacted ({}) with {}", self.kind, self.target_type),
            );
        } else {
            state.mark_complete(
                false,
                format!("Could not {} the {}", self.kind, self.target_type),
            );
        }
    }

    fn on_cancel(&mut self, env: &mut ActionEnv<'_>) {
        self.target = None;
        env.world.stop_navigation(env.agent.id);
    }

    fn description(&self) -> String {
        format!("Interacting with {} ({})", self.target_type, self.kind)
    }
}
