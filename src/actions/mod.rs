//! Action lifecycle
//!
//! An [`Action`] wraps one [`Behavior`] and enforces the lifecycle around
//! it: Created → Started → Running → Terminal. Behaviours only see the
//! world through an [`ActionEnv`] borrowed for a single call.

pub mod blueprint;
pub mod catalog;
pub mod combat;
pub mod craft;
pub mod follow;
pub mod goal;
pub mod idle;
pub mod interact;
pub mod mine;
pub mod pathfind;
pub mod place;

use crate::core::types::{EntityId, Vec3};
use crate::ui::Notifier;
use crate::world::WorldAccess;
use catalog::ActionKind;
use serde::{Deserialize, Serialize};

pub const CANCELLED_MESSAGE: &str = "Action cancelled";

/// Terminal outcome of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    /// The failure means the plan itself is wrong, not just unlucky
    pub requires_replanning: bool,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            requires_replanning: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            requires_replanning: false,
        }
    }

    pub fn failure_replan(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            requires_replanning: true,
        }
    }
}

/// Identity of the agent an action runs for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInfo {
    pub id: EntityId,
    pub name: String,
}

/// Capabilities lent to an action for one call
pub struct ActionEnv<'a> {
    pub world: &'a mut dyn WorldAccess,
    pub agent: &'a AgentInfo,
    pub notifier: &'a dyn Notifier,
}

impl<'a> ActionEnv<'a> {
    pub fn new(
        world: &'a mut dyn WorldAccess,
        agent: &'a AgentInfo,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            world,
            agent,
            notifier,
        }
    }

    /// Show a message attributed to this agent
    pub fn say(&self, message: &str) {
        self.notifier.notify(&self.agent.name, message);
    }

    pub fn position(&self) -> Option<Vec3> {
        self.world.position(self.agent.id)
    }

    pub fn grounded(&self) -> bool {
        self.world.on_ground(self.agent.id)
    }
}

/// Mutable lifecycle bookkeeping shared with the behaviour
#[derive(Debug, Default)]
pub struct ActionState {
    started: bool,
    cancelled: bool,
    cleaned_up: bool,
    result: Option<ActionResult>,
    ticks_run: u64,
}

impl ActionState {
    /// Record the outcome. Only the first call has any effect.
    pub fn mark_complete(&mut self, success: bool, message: impl Into<String>) {
        let result = if success {
            ActionResult::success(message)
        } else {
            ActionResult::failure(message)
        };
        self.complete(result);
    }

    /// Record a prepared outcome. Only the first call has any effect.
    pub fn complete(&mut self, result: ActionResult) {
        if self.result.is_none() {
            self.result = Some(result);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some() || self.cancelled
    }

    /// Ticks delivered to the behaviour so far
    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }
}

/// Per-kind behaviour driven by an [`Action`]
pub trait Behavior: Send {
    fn on_start(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState);

    fn on_tick(&mut self, env: &mut ActionEnv<'_>, state: &mut ActionState);

    /// Release navigation and any other held resources
    fn on_cancel(&mut self, env: &mut ActionEnv<'_>);

    fn description(&self) -> String;
}

/// One unit of executing work
pub struct Action {
    kind: ActionKind,
    state: ActionState,
    behavior: Box<dyn Behavior>,
}

impl Action {
    pub fn new(kind: ActionKind, behavior: impl Behavior + 'static) -> Self {
        Self {
            kind,
            state: ActionState::default(),
            behavior: Box::new(behavior),
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Start the behaviour. Second and later calls do nothing.
    pub fn start(&mut self, env: &mut ActionEnv<'_>) {
        if self.state.started || self.state.is_complete() {
            return;
        }
        self.state.started = true;
        self.behavior.on_start(env, &mut self.state);
    }

    /// Advance one tick; no-op before start or once terminal
    pub fn tick(&mut self, env: &mut ActionEnv<'_>) {
        if !self.state.started || self.state.is_complete() {
            return;
        }
        self.state.ticks_run += 1;
        self.behavior.on_tick(env, &mut self.state);
    }

    /// Force the action terminal
    ///
    /// A live action ends with failure "Action cancelled". An action that
    /// already finished keeps its own result. Cleanup runs at most once and
    /// repeated cancels are no-ops.
    pub fn cancel(&mut self, env: &mut ActionEnv<'_>) {
        if self.state.cancelled {
            return;
        }
        self.state.cancelled = true;
        self.state.complete(ActionResult::failure(CANCELLED_MESSAGE));
        if !self.state.cleaned_up {
            self.state.cleaned_up = true;
            self.behavior.on_cancel(env);
        }
    }

    pub fn is_started(&self) -> bool {
        self.state.started
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled
    }

    /// Outcome, present once terminal
    pub fn result(&self) -> Option<&ActionResult> {
        self.state.result.as_ref()
    }

    pub fn ticks_run(&self) -> u64 {
        self.state.ticks_run
    }

    pub fn description(&self) -> String {
        self.behavior.description()
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("kind", &self.kind)
            .field("description", &self.behavior.description())
            .field("state", &self.state)
            .finish()
    }
}
