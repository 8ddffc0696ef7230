//! A commandable agent: identity, memory, executor and plan inbox
//!
//! Planning workers never touch an agent directly. They post
//! [`AgentMessage::PlanReady`] to its inbox, and the agent applies the
//! message at the start of its next tick. Each command bumps the agent's
//! generation; plans from older generations are discarded, so the last
//! submission always wins.

use crate::actions::{ActionEnv, AgentInfo};
use crate::command::executor::TaskExecutor;
use crate::core::config::ExecutorConfig;
use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::entity::memory::AgentMemory;
use crate::task::Plan;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

#[derive(Debug)]
pub enum AgentMessage {
    PlanReady {
        generation: u64,
        plan: Option<Plan>,
    },
}

#[derive(Debug)]
pub struct Agent {
    info: AgentInfo,
    memory: AgentMemory,
    executor: TaskExecutor,
    glowing: bool,
    generation: u64,
    outbox: UnboundedSender<AgentMessage>,
    inbox: UnboundedReceiver<AgentMessage>,
}

impl Agent {
    pub fn new(id: EntityId, name: impl Into<String>, config: ExecutorConfig) -> Self {
        let (outbox, inbox) = mpsc::unbounded_channel();
        Self {
            info: AgentInfo {
                id,
                name: name.into(),
            },
            memory: AgentMemory::new(),
            executor: TaskExecutor::new(config),
            glowing: false,
            generation: 0,
            outbox,
            inbox,
        }
    }

    pub fn id(&self) -> EntityId {
        self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &AgentInfo {
        &self.info
    }

    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Handle a planning worker posts its result to
    pub fn mailbox(&self) -> UnboundedSender<AgentMessage> {
        self.outbox.clone()
    }

    /// Start a new command: invalidate in-flight plans and cancel work
    ///
    /// Returns the generation the worker must tag its plan with.
    pub fn begin_command(&mut self, env: &mut ActionEnv<'_>) -> u64 {
        self.generation += 1;
        self.executor.begin_command(env, &mut self.memory);
        self.generation
    }

    fn drain_inbox(&mut self, env: &mut ActionEnv<'_>) {
        while let Ok(message) = self.inbox.try_recv() {
            match message {
                AgentMessage::PlanReady { generation, plan } if generation == self.generation => {
                    self.executor.install_plan(env, &mut self.memory, plan);
                }
                AgentMessage::PlanReady { generation, .. } => {
                    debug!(
                        "{} discarding stale plan (generation {} < {})",
                        self.info.name, generation, self.generation
                    );
                }
            }
        }
    }

    pub fn tick(&mut self, env: &mut ActionEnv<'_>) {
        self.drain_inbox(env);
        self.executor.tick(env, &mut self.memory);
    }

    /// Hard reset; plans still being computed are ignored when they land
    pub fn stop(&mut self, env: &mut ActionEnv<'_>) {
        self.generation += 1;
        self.executor.stop(env, &mut self.memory);
    }

    pub fn is_glowing(&self) -> bool {
        self.glowing
    }

    /// Flip the marker; returns the new state
    pub fn toggle_glow(&mut self) -> bool {
        self.glowing = !self.glowing;
        self.glowing
    }

    pub fn save_memory(&self) -> Result<String> {
        self.memory.save()
    }

    /// Replace memory from a saved blob and resume its pending work
    pub fn restore_memory(&mut self, blob: &str) -> Result<()> {
        self.memory = AgentMemory::restore(blob)?;
        self.executor.resume(&self.memory);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::task::Task;
    use crate::ui::ChatLog;
    use crate::world::grid::GROUND_LEVEL;
    use crate::world::GridWorld;
    use std::collections::BTreeMap;

    fn follow_plan(goal: &str) -> Plan {
        let task = Task::new("follow", BTreeMap::new()).with_param("player", "Alex");
        Plan::new("", goal, vec![task])
    }

    #[test]
    fn test_only_latest_generation_is_installed() {
        let mut world = GridWorld::flat(16, 9);
        let id = world.spawn_agent("Steve", Vec3::new(0.5, GROUND_LEVEL as f64, 0.5));
        let chat = ChatLog::new();
        let mut agent = Agent::new(id, "Steve", ExecutorConfig::default());
        let info = agent.info().clone();
        let mut env = ActionEnv::new(&mut world, &info, &chat);

        let first = agent.begin_command(&mut env);
        let second = agent.begin_command(&mut env);
        let mailbox = agent.mailbox();
        mailbox
            .send(AgentMessage::PlanReady {
                generation: second,
                plan: Some(follow_plan("Second")),
            })
            .unwrap();
        mailbox
            .send(AgentMessage::PlanReady {
                generation: first,
                plan: Some(follow_plan("First")),
            })
            .unwrap();

        agent.tick(&mut env);
        assert_eq!(agent.executor().current_goal(), Some("Second"));
        assert!(chat.contains("Steve", "Okay! Second"));
        assert!(!chat.contains("Steve", "Okay! First"));
    }

    #[test]
    fn test_stop_discards_in_flight_plan() {
        let mut world = GridWorld::flat(16, 9);
        let id = world.spawn_agent("Steve", Vec3::new(0.5, GROUND_LEVEL as f64, 0.5));
        let chat = ChatLog::new();
        let mut agent = Agent::new(id, "Steve", ExecutorConfig::default());
        let info = agent.info().clone();
        let mut env = ActionEnv::new(&mut world, &info, &chat);

        let generation = agent.begin_command(&mut env);
        agent.stop(&mut env);
        agent
            .mailbox()
            .send(AgentMessage::PlanReady {
                generation,
                plan: Some(follow_plan("Late")),
            })
            .unwrap();
        agent.tick(&mut env);
        assert_eq!(agent.executor().current_goal(), None);
        assert!(agent.executor().queue().is_empty());
    }

    #[tokio::test]
    async fn test_plan_posted_from_worker_task_is_applied_on_tick() {
        let mut world = GridWorld::flat(16, 9);
        let id = world.spawn_agent("Steve", Vec3::new(0.5, GROUND_LEVEL as f64, 0.5));
        let chat = ChatLog::new();
        let mut agent = Agent::new(id, "Steve", ExecutorConfig::default());
        let info = agent.info().clone();
        let mut env = ActionEnv::new(&mut world, &info, &chat);

        let generation = agent.begin_command(&mut env);
        let mailbox = agent.mailbox();
        tokio::spawn(async move {
            mailbox.send(AgentMessage::PlanReady {
                generation,
                plan: Some(follow_plan("Worker")),
            })
        })
        .await
        .unwrap()
        .unwrap();

        agent.tick(&mut env);
        assert_eq!(agent.executor().current_goal(), Some("Worker"));
    }

    #[test]
    fn test_glow_and_memory_restore() {
        let mut agent = Agent::new(EntityId::new(), "Steve", ExecutorConfig::default());
        assert!(agent.toggle_glow());
        assert!(!agent.toggle_glow());

        let mut memory = AgentMemory::new();
        memory.set_goal(Some("Follow Alex".into()));
        memory.set_pending(&follow_plan("Follow Alex").tasks);
        agent.restore_memory(&memory.save().unwrap()).unwrap();
        assert_eq!(agent.executor().current_goal(), Some("Follow Alex"));
        assert_eq!(agent.executor().queue().len(), 1);
        assert_eq!(agent.save_memory().unwrap(), memory.save().unwrap());
    }
}
