//! Simulation loop and agent registry
//!
//! The simulation owns the world and every agent and is the only thing that
//! mutates either. Planning runs on tokio workers that hand their result
//! back through each agent's inbox (see [`crate::entity::agent`]).

use crate::actions::ActionEnv;
use crate::command::operator::OperatorCommand;
use crate::command::planner::TaskPlanner;
use crate::core::config::{AgentConfig, ExecutorConfig, SimulationConfig};
use crate::core::error::{AgentError, Result};
use crate::core::types::{EntityId, Tick, Vec3};
use crate::entity::agent::{Agent, AgentMessage};
use crate::llm::context::PromptContext;
use crate::ui::Notifier;
use crate::world::{GridWorld, WorldAccess};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// Spawn offset from the nearest player
const SPAWN_OFFSET: f64 = 3.0;

pub struct Simulation {
    world: GridWorld,
    agents: Vec<Agent>,
    planner: Arc<TaskPlanner>,
    notifier: Arc<dyn Notifier>,
    executor_config: ExecutorConfig,
    config: SimulationConfig,
    runtime: Handle,
    current_tick: Tick,
}

impl Simulation {
    pub fn new(
        config: &AgentConfig,
        planner: TaskPlanner,
        notifier: Arc<dyn Notifier>,
        runtime: Handle,
    ) -> Self {
        let sim = &config.simulation;
        Self::with_world(
            GridWorld::flat(sim.world_radius, sim.seed),
            config,
            planner,
            notifier,
            runtime,
        )
    }

    pub fn with_world(
        world: GridWorld,
        config: &AgentConfig,
        planner: TaskPlanner,
        notifier: Arc<dyn Notifier>,
        runtime: Handle,
    ) -> Self {
        Self {
            world,
            agents: Vec::new(),
            planner: Arc::new(planner),
            notifier,
            executor_config: config.executor.clone(),
            config: config.simulation.clone(),
            runtime,
            current_tick: 0,
        }
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut GridWorld {
        &mut self.world
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.config.tick_millis)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        let name = name.trim();
        self.agents
            .iter()
            .position(|a| a.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| AgentError::AgentNotFound(name.to_string()))
    }

    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.index_of(name).ok().map(|i| &self.agents[i])
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.iter().map(Agent::name).collect()
    }

    fn spawn_point(&self) -> Vec3 {
        match self.world.players().first() {
            Some(player) => player.position + Vec3::new(SPAWN_OFFSET, 0.0, 0.0),
            None => {
                let y = self.world.surface_height(0, 0);
                Vec3::new(0.5, y as f64, 0.5)
            }
        }
    }

    pub fn spawn(&mut self, name: &str) -> Result<EntityId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AgentError::InvalidCommand("agent name is empty".into()));
        }
        if self.index_of(name).is_ok() {
            return Err(AgentError::AgentExists(name.to_string()));
        }
        if self.agents.len() >= self.config.max_agents {
            return Err(AgentError::AgentLimit(self.config.max_agents));
        }
        let pos = self.spawn_point();
        let id = self.world.spawn_agent(name, pos);
        self.agents
            .push(Agent::new(id, name, self.executor_config.clone()));
        info!("Spawned agent {} at {:.1}, {:.1}, {:.1}", name, pos.x, pos.y, pos.z);
        Ok(id)
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        let mut agent = self.agents.remove(index);
        let info = agent.info().clone();
        let mut env = ActionEnv::new(&mut self.world, &info, &*self.notifier);
        agent.stop(&mut env);
        self.world.remove_entity(info.id);
        info!("Removed agent {}", info.name);
        Ok(())
    }

    pub fn stop(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        let Self {
            world,
            agents,
            notifier,
            ..
        } = self;
        let agent = &mut agents[index];
        let info = agent.info().clone();
        let mut env = ActionEnv::new(world, &info, &**notifier);
        agent.stop(&mut env);
        Ok(())
    }

    pub fn toggle_glow(&mut self, name: &str) -> Result<bool> {
        let index = self.index_of(name)?;
        Ok(self.agents[index].toggle_glow())
    }

    /// Hand a natural-language command to an agent
    ///
    /// Cancellation happens here, synchronously. Planning runs on a worker
    /// and the plan is installed on a later tick.
    pub fn tell(&mut self, name: &str, command: &str) -> Result<()> {
        let index = self.index_of(name)?;
        let Self {
            world,
            agents,
            planner,
            notifier,
            runtime,
            ..
        } = self;
        let agent = &mut agents[index];
        let info = agent.info().clone();
        let context = PromptContext::capture(&*world, &info)
            .ok_or(AgentError::EntityNotFound(info.id))?;

        let generation = {
            let mut env = ActionEnv::new(&mut *world, &info, &**notifier);
            agent.begin_command(&mut env)
        };
        let mailbox = agent.mailbox();
        let planner = Arc::clone(planner);
        let notifier = Arc::clone(notifier);
        let command = command.trim().to_string();

        runtime.spawn(async move {
            let plan = planner
                .plan_tasks(&context, &command, notifier.as_ref())
                .await;
            if mailbox
                .send(AgentMessage::PlanReady { generation, plan })
                .is_err()
            {
                debug!("{} is gone, dropping its plan", context.agent_name);
            }
        });
        Ok(())
    }

    /// Advance every agent one tick, then the world
    pub fn tick(&mut self) {
        let Self {
            world,
            agents,
            notifier,
            ..
        } = self;
        for agent in agents.iter_mut() {
            let info = agent.info().clone();
            let mut env = ActionEnv::new(&mut *world, &info, &**notifier);
            agent.tick(&mut env);
        }
        world.step();
        self.current_tick += 1;
    }

    /// Run an operator command and return the feedback line
    pub fn execute(&mut self, command: OperatorCommand) -> Result<String> {
        match command {
            OperatorCommand::Spawn { name } => {
                self.spawn(&name)?;
                Ok(format!("Spawned agent: {}", name))
            }
            OperatorCommand::Remove { name } => {
                self.remove(&name)?;
                Ok(format!("Removed agent: {}", name))
            }
            OperatorCommand::List => {
                let names = self.agent_names();
                if names.is_empty() {
                    Ok("No active agents".to_string())
                } else {
                    Ok(format!(
                        "Active agents ({}): {}",
                        names.len(),
                        names.join(", ")
                    ))
                }
            }
            OperatorCommand::Stop { name } => {
                self.stop(&name)?;
                Ok(format!("Stopped agent: {}", name))
            }
            OperatorCommand::Tell { name, command } => {
                self.tell(&name, &command)?;
                Ok(format!("Instructing {}: {}", name, command))
            }
            OperatorCommand::Glow { name } => {
                let on = self.toggle_glow(&name)?;
                Ok(format!(
                    "{} glowing for {}",
                    if on { "Enabled" } else { "Disabled" },
                    name
                ))
            }
        }
    }
}
