//! Task executor: one live action at a time, idle fallback, hard stop
//!
//! The executor never blocks. Planning happens elsewhere and arrives here
//! through [`TaskExecutor::install_plan`]; everything else is driven by
//! [`TaskExecutor::tick`] from the simulation loop.

use crate::actions::catalog::create_action;
use crate::actions::idle::IdleFollow;
use crate::actions::{Action, ActionEnv, ActionResult};
use crate::command::planner::TaskPlanner;
use crate::core::config::ExecutorConfig;
use crate::entity::memory::AgentMemory;
use crate::llm::context::PromptContext;
use crate::task::{Plan, Task};
use std::collections::VecDeque;
use tracing::{debug, error, info};

pub const NOT_UNDERSTOOD_MESSAGE: &str = "I couldn't understand that command.";

#[derive(Debug)]
pub struct TaskExecutor {
    config: ExecutorConfig,
    queue: VecDeque<Task>,
    current_action: Option<Action>,
    idle_action: Option<Action>,
    current_goal: Option<String>,
    ticks_since_last_action: u32,
    last_outcome: Option<ActionResult>,
}

impl TaskExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            current_action: None,
            idle_action: None,
            current_goal: None,
            ticks_since_last_action: 0,
            last_outcome: None,
        }
    }

    /// Pick up a goal and queue restored from memory
    pub fn resume(&mut self, memory: &AgentMemory) {
        self.current_goal = memory.current_goal().map(str::to_string);
        self.queue = memory.pending().clone();
    }

    fn cancel_live(&mut self, env: &mut ActionEnv<'_>) {
        if let Some(mut action) = self.current_action.take() {
            info!("{} cancelling {}", env.agent.name, action.description());
            action.cancel(env);
            self.last_outcome = action.result().cloned();
        }
        if let Some(mut idle) = self.idle_action.take() {
            idle.cancel(env);
        }
    }

    /// First half of a command: synchronously cancel and forget the old plan
    ///
    /// Nothing from the superseded plan may be dispatched while the new one
    /// is being computed, so the queue and goal go with the running action.
    pub fn begin_command(&mut self, env: &mut ActionEnv<'_>, memory: &mut AgentMemory) {
        self.cancel_live(env);
        self.queue.clear();
        self.current_goal = None;
        memory.clear_goal();
        memory.clear_pending();
    }

    /// Second half of a command: replace goal and queue with the new plan
    ///
    /// `None` means planning failed and the agent stays idle. Anything that
    /// started in between (the idle fallback) is cancelled first.
    pub fn install_plan(
        &mut self,
        env: &mut ActionEnv<'_>,
        memory: &mut AgentMemory,
        outcome: Option<Plan>,
    ) {
        let Some(plan) = outcome else {
            env.say(NOT_UNDERSTOOD_MESSAGE);
            return;
        };
        self.cancel_live(env);

        self.current_goal = if plan.tasks.is_empty() || plan.goal.trim().is_empty() {
            None
        } else {
            Some(plan.goal.clone())
        };
        memory.set_goal(self.current_goal.clone());

        self.queue.clear();
        self.queue.extend(plan.tasks);
        memory.set_pending(&self.queue);

        if self.config.enable_chat_responses {
            env.say(&format!("Okay! {}", plan.goal));
        }
        info!("{} queued {} tasks", env.agent.name, self.queue.len());
    }

    /// Capture context, cancel, plan and install in one call
    pub async fn submit_command(
        &mut self,
        env: &mut ActionEnv<'_>,
        memory: &mut AgentMemory,
        planner: &TaskPlanner,
        command: &str,
    ) {
        info!("{} processing command: {}", env.agent.name, command);
        let context = PromptContext::capture(&*env.world, env.agent).unwrap_or_else(|| PromptContext {
            agent_name: env.agent.name.clone(),
            ..PromptContext::default()
        });
        self.begin_command(env, memory);
        let outcome = planner.plan_tasks(&context, command, env.notifier).await;
        self.install_plan(env, memory, outcome);
    }

    pub fn tick(&mut self, env: &mut ActionEnv<'_>, memory: &mut AgentMemory) {
        self.ticks_since_last_action = self.ticks_since_last_action.saturating_add(1);

        if let Some(action) = self.current_action.as_mut() {
            if !action.is_complete() {
                let interval = u64::from(self.config.progress_log_interval.max(1));
                if action.ticks_run() > 0 && action.ticks_run() % interval == 0 {
                    info!("{} ticking action: {}", env.agent.name, action.description());
                }
                action.tick(env);
                return;
            }
            if let Some(action) = self.current_action.take() {
                self.finish(env, memory, action);
            }
        }

        if self.ticks_since_last_action >= self.config.action_tick_delay {
            if let Some(task) = self.queue.pop_front() {
                memory.set_pending(&self.queue);
                self.dispatch(env, task);
                self.ticks_since_last_action = 0;
                return;
            }
        }

        if self.queue.is_empty() && self.current_action.is_none() && self.current_goal.is_none() {
            match self.idle_action.as_mut() {
                Some(idle) if !idle.is_complete() => idle.tick(env),
                _ => {
                    let mut idle = IdleFollow::action();
                    idle.start(env);
                    debug!("{} is idle, following the nearest player", env.agent.name);
                    self.idle_action = Some(idle);
                }
            }
        } else if let Some(mut idle) = self.idle_action.take() {
            idle.cancel(env);
        }
    }

    fn finish(&mut self, env: &mut ActionEnv<'_>, memory: &mut AgentMemory, action: Action) {
        let description = action.description();
        let result = action
            .result()
            .cloned()
            .unwrap_or_else(|| ActionResult::failure("Action ended without a result"));
        info!(
            "{} action completed: {} (success: {})",
            env.agent.name, result.message, result.success
        );
        memory.record_action(description);

        if !result.success && result.requires_replanning && self.config.enable_chat_responses {
            env.say(&format!("Problem: {}", result.message));
        }
        if self.queue.is_empty() && self.current_goal.take().is_some() {
            memory.clear_goal();
            info!("{} finished its plan", env.agent.name);
        }
        self.last_outcome = Some(result);
    }

    fn dispatch(&mut self, env: &mut ActionEnv<'_>, task: Task) {
        if let Some(mut idle) = self.idle_action.take() {
            idle.cancel(env);
        }
        info!("{} executing task: {}", env.agent.name, task);
        let Some(mut action) = create_action(&task) else {
            error!("Failed to create action for task: {}", task);
            return;
        };
        action.start(env);
        debug!(
            "Started {} (complete: {})",
            action.description(),
            action.is_complete()
        );
        self.current_action = Some(action);
    }

    /// Hard reset: cancel everything and forget the goal
    pub fn stop(&mut self, env: &mut ActionEnv<'_>, memory: &mut AgentMemory) {
        self.begin_command(env, memory);
        info!("{} stopped", env.agent.name);
    }

    pub fn current_goal(&self) -> Option<&str> {
        self.current_goal.as_deref()
    }

    pub fn queue(&self) -> &VecDeque<Task> {
        &self.queue
    }

    pub fn current_action(&self) -> Option<&Action> {
        self.current_action.as_ref()
    }

    pub fn idle_action(&self) -> Option<&Action> {
        self.idle_action.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&ActionResult> {
        self.last_outcome.as_ref()
    }

    pub fn is_executing(&self) -> bool {
        self.current_action.is_some() || !self.queue.is_empty()
    }

    /// Number of owned actions that have not reached a terminal state
    pub fn live_actions(&self) -> usize {
        [&self.current_action, &self.idle_action]
            .into_iter()
            .flatten()
            .filter(|a| !a.is_complete())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::catalog::ActionKind;
    use crate::actions::{AgentInfo, CANCELLED_MESSAGE};
    use crate::core::types::Vec3;
    use crate::ui::ChatLog;
    use crate::world::grid::GROUND_LEVEL;
    use crate::world::GridWorld;
    use std::collections::BTreeMap;

    fn setup() -> (GridWorld, AgentInfo, ChatLog) {
        let mut world = GridWorld::flat(32, 4);
        let y = GROUND_LEVEL as f64;
        world.spawn_player("Alex", Vec3::new(6.5, y, 0.5));
        let id = world.spawn_agent("Steve", Vec3::new(0.5, y, 0.5));
        (world, AgentInfo { id, name: "Steve".into() }, ChatLog::new())
    }

    fn config(delay: u32) -> ExecutorConfig {
        ExecutorConfig {
            action_tick_delay: delay,
            ..ExecutorConfig::default()
        }
    }

    fn mine_plan() -> Plan {
        let mine = Task::new("mine", BTreeMap::new())
            .with_param("block", "diamond_ore")
            .with_param("quantity", 4);
        let follow = Task::new("follow", BTreeMap::new()).with_param("player", "Alex");
        Plan::new("r", "Mine diamonds", vec![mine, follow.clone(), follow])
    }

    #[test]
    fn test_idle_fallback_created_then_ticked() {
        let (mut world, agent, chat) = setup();
        let mut executor = TaskExecutor::new(config(20));
        let mut memory = AgentMemory::new();

        let mut env = ActionEnv::new(&mut world, &agent, &chat);
        executor.tick(&mut env, &mut memory);
        let idle = executor.idle_action().unwrap();
        assert!(idle.is_started());
        assert_eq!(idle.ticks_run(), 0);

        executor.tick(&mut env, &mut memory);
        assert_eq!(executor.idle_action().unwrap().ticks_run(), 1);
        assert_eq!(executor.live_actions(), 1);
    }

    #[test]
    fn test_dispatch_respects_delay_and_tears_down_idle() {
        let (mut world, agent, chat) = setup();
        let mut executor = TaskExecutor::new(config(3));
        let mut memory = AgentMemory::new();
        let mut env = ActionEnv::new(&mut world, &agent, &chat);

        executor.tick(&mut env, &mut memory);
        assert!(executor.idle_action().is_some());

        executor.install_plan(&mut env, &mut memory, Some(mine_plan()));
        assert!(chat.contains("Steve", "Okay! Mine diamonds"));
        assert_eq!(memory.current_goal(), Some("Mine diamonds"));

        executor.tick(&mut env, &mut memory);
        assert!(executor.current_action().is_none());
        assert!(executor.idle_action().is_none());

        executor.tick(&mut env, &mut memory);
        let action = executor.current_action().unwrap();
        assert_eq!(action.kind(), ActionKind::Mine);
        assert_eq!(executor.queue().len(), 2);
        assert_eq!(memory.pending().len(), 2);
        assert!(executor.live_actions() <= 1);
    }

    #[test]
    fn test_new_command_cancels_running_action() {
        let (mut world, agent, chat) = setup();
        let mut executor = TaskExecutor::new(config(0));
        let mut memory = AgentMemory::new();
        let mut env = ActionEnv::new(&mut world, &agent, &chat);

        executor.install_plan(&mut env, &mut memory, Some(mine_plan()));
        executor.tick(&mut env, &mut memory);
        assert!(!executor.current_action().unwrap().is_complete());
        assert_eq!(executor.queue().len(), 2);

        executor.begin_command(&mut env, &mut memory);
        executor.install_plan(&mut env, &mut memory, Some(Plan::new("stop", "Stop", Vec::new())));
        let cancelled = executor.last_outcome().unwrap();
        assert!(!cancelled.success);
        assert_eq!(cancelled.message, CANCELLED_MESSAGE);
        assert!(executor.current_action().is_none());
        assert!(executor.queue().is_empty());
        assert_eq!(executor.current_goal(), None);
        assert_eq!(memory.current_goal(), None);
    }

    #[test]
    fn test_superseded_plan_never_resumes_while_planning() {
        let (mut world, agent, chat) = setup();
        let mut executor = TaskExecutor::new(config(0));
        let mut memory = AgentMemory::new();
        let mut env = ActionEnv::new(&mut world, &agent, &chat);

        let follow = Task::new("follow", BTreeMap::new()).with_param("player", "Alex");
        let old = Plan::new("", "old", vec![follow.clone(), follow.clone(), follow]);
        executor.install_plan(&mut env, &mut memory, Some(old));
        executor.tick(&mut env, &mut memory);
        assert_eq!(executor.current_action().unwrap().kind(), ActionKind::Follow);

        executor.begin_command(&mut env, &mut memory);
        assert!(executor.queue().is_empty());
        assert_eq!(executor.current_goal(), None);
        assert!(memory.pending().is_empty());
        for _ in 0..3 {
            executor.tick(&mut env, &mut memory);
            assert!(executor.current_action().is_none());
            assert!(executor.queue().is_empty());
        }

        let walk = Task::new("pathfind", BTreeMap::new())
            .with_param("x", 3)
            .with_param("y", GROUND_LEVEL)
            .with_param("z", 0);
        executor.install_plan(&mut env, &mut memory, Some(Plan::new("", "new", vec![walk])));
        assert!(executor.idle_action().is_none());
        executor.tick(&mut env, &mut memory);
        assert_eq!(executor.current_action().unwrap().kind(), ActionKind::Pathfind);
        assert_eq!(executor.current_goal(), Some("new"));
        assert!(executor.live_actions() <= 1);
    }

    #[test]
    fn test_failed_planning_keeps_queue_empty() {
        let (mut world, agent, chat) = setup();
        let mut executor = TaskExecutor::new(config(0));
        let mut memory = AgentMemory::new();
        let mut env = ActionEnv::new(&mut world, &agent, &chat);

        executor.begin_command(&mut env, &mut memory);
        executor.install_plan(&mut env, &mut memory, None);
        assert!(chat.contains("Steve", NOT_UNDERSTOOD_MESSAGE));
        assert!(executor.queue().is_empty());
        assert!(!executor.is_executing());
    }

    #[test]
    fn test_replanning_failure_surfaces_problem() {
        let (mut world, agent, chat) = setup();
        let mut executor = TaskExecutor::new(config(0));
        let mut memory = AgentMemory::new();
        let mut env = ActionEnv::new(&mut world, &agent, &chat);

        let bad = Task::new("mine", BTreeMap::new())
            .with_param("block", "unobtainium")
            .with_param("quantity", 1);
        executor.install_plan(&mut env, &mut memory, Some(Plan::new("", "Mine", vec![bad])));
        executor.tick(&mut env, &mut memory);
        assert!(executor.current_action().unwrap().is_complete());

        executor.tick(&mut env, &mut memory);
        assert!(chat.contains("Steve", "Problem: Invalid block type"));
        assert!(!executor.last_outcome().unwrap().success);
        assert_eq!(memory.history().count(), 1);
        assert_eq!(executor.current_goal(), None);
    }

    #[test]
    fn test_unknown_kind_wastes_the_tick() {
        let (mut world, agent, chat) = setup();
        let mut executor = TaskExecutor::new(config(0));
        let mut memory = AgentMemory::new();
        let mut env = ActionEnv::new(&mut world, &agent, &chat);

        let plan = Plan::new("", "Dance", vec![Task::new("dance", BTreeMap::new())]);
        executor.install_plan(&mut env, &mut memory, Some(plan));
        executor.tick(&mut env, &mut memory);
        assert!(executor.current_action().is_none());
        assert!(executor.queue().is_empty());
        assert!(executor.idle_action().is_none());
    }

    #[test]
    fn test_stop_is_a_hard_reset() {
        let (mut world, agent, chat) = setup();
        let mut executor = TaskExecutor::new(config(0));
        let mut memory = AgentMemory::new();
        let mut env = ActionEnv::new(&mut world, &agent, &chat);

        executor.install_plan(&mut env, &mut memory, Some(mine_plan()));
        executor.tick(&mut env, &mut memory);
        executor.stop(&mut env, &mut memory);
        assert!(executor.current_action().is_none());
        assert!(executor.queue().is_empty());
        assert_eq!(executor.current_goal(), None);
        assert!(memory.pending().is_empty());
        assert_eq!(executor.live_actions(), 0);
    }

    #[test]
    fn test_resume_from_memory() {
        let mut memory = AgentMemory::new();
        memory.set_goal(Some("Mine diamonds".into()));
        memory.set_pending(&mine_plan().tasks);
        let mut executor = TaskExecutor::new(config(0));
        executor.resume(&memory);
        assert_eq!(executor.current_goal(), Some("Mine diamonds"));
        assert_eq!(executor.queue().len(), 3);
    }
}
