//! End-to-end command flow
//!
//! Operator text goes through planning on the tokio runtime, then the plan
//! is installed and executed by ticking the simulation.

use async_trait::async_trait;
use craftmind::command::{OperatorCommand, TaskPlanner};
use craftmind::core::config::AgentConfig;
use craftmind::core::error::{AgentError, Result};
use craftmind::core::types::{BlockPos, Vec3};
use craftmind::llm::{ProviderKind, ProviderSet, ReasoningProvider};
use craftmind::simulation::Simulation;
use craftmind::ui::ChatLog;
use craftmind::world::grid::GROUND_LEVEL;
use craftmind::world::{GridWorld, WorldAccess};
use std::sync::Arc;
use std::time::Duration;

/// Answers with a fixed reply, or a delayed one when the command says "slow"
struct Scripted {
    reply: fn(&str) -> Option<String>,
}

#[async_trait]
impl ReasoningProvider for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send_request(&self, _system: &str, user: &str) -> Result<String> {
        if user.contains("\"slow") {
            tokio::time::sleep(Duration::from_millis(60)).await;
        }
        (self.reply)(user).ok_or_else(|| AgentError::LlmError("no reply".into()))
    }
}

fn ground(x: f64, z: f64) -> Vec3 {
    Vec3::new(x, GROUND_LEVEL as f64, z)
}

fn simulation(reply: fn(&str) -> Option<String>) -> (Simulation, Arc<ChatLog>) {
    let config = AgentConfig::default();
    let providers = ProviderSet::new(ProviderKind::Groq)
        .with(ProviderKind::Groq, Arc::new(Scripted { reply }));
    let chat = Arc::new(ChatLog::new());
    let sim = Simulation::with_world(
        GridWorld::flat(32, 7),
        &config,
        TaskPlanner::new(providers),
        chat.clone(),
        tokio::runtime::Handle::current(),
    );
    (sim, chat)
}

/// Let planning workers run, then tick until a goal shows up
async fn wait_for_plan(sim: &mut Simulation, agent: &str) {
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        sim.tick();
        if sim.agent(agent).and_then(|a| a.executor().current_goal()).is_some() {
            return;
        }
    }
}

fn follow_reply(_user: &str) -> Option<String> {
    Some(
        "```json\n{\"reasoning\": \"Go to Alex\", \"plan\": \"Follow Alex\", \"tasks\": \
         [{\"action\": \"follow\", \"parameters\": {\"player\": \"Alex\"}}]}\n```"
            .to_string(),
    )
}

#[tokio::test]
async fn test_tell_plans_then_follows() {
    let (mut sim, chat) = simulation(follow_reply);
    let id = sim.spawn("Steve").unwrap();
    let alex = sim.world_mut().spawn_player("Alex", ground(12.5, 0.5));

    let feedback = sim
        .execute(OperatorCommand::parse("tell Steve follow me").unwrap())
        .unwrap();
    assert_eq!(feedback, "Instructing Steve: follow me");

    wait_for_plan(&mut sim, "Steve").await;
    assert_eq!(
        sim.agent("Steve").unwrap().executor().current_goal(),
        Some("Follow Alex")
    );
    assert!(chat.contains("Steve", "Thinking..."));
    assert!(chat.contains("Steve", "Okay! Follow Alex"));

    for _ in 0..400 {
        sim.tick();
    }
    let steve = sim.world().position(id).unwrap();
    let target = sim.world().position(alex).unwrap();
    assert!(steve.distance(&target) < 4.0);
    assert!(chat.contains("Steve", "Coming to you!"));
}

#[tokio::test]
async fn test_multi_step_plan_runs_in_order() {
    fn reply(_user: &str) -> Option<String> {
        Some(
            r#"{"reasoning": "walk then dig", "plan": "Fetch iron",
                "tasks": [
                  {"action": "pathfind", "parameters": {"x": 4, "y": 64, "z": 0}}
                  {"action": "mine", "parameters": {"block": "iron", "quantity": 1}},
                  {"action": "mine", "parameters": {"block": "iron"}}
                ]}"#
            .to_string(),
        )
    }
    let (mut sim, chat) = simulation(reply);
    sim.world_mut()
        .set_block(BlockPos::new(5, GROUND_LEVEL - 2, 0), "iron_ore");
    sim.spawn("Steve").unwrap();
    let alex = sim.world_mut().spawn_player("Alex", ground(0.5, 3.5));

    sim.tell("Steve", "get me some iron").unwrap();
    wait_for_plan(&mut sim, "Steve").await;
    let agent = sim.agent("Steve").unwrap();
    // the second mine task has no quantity and is dropped
    let dispatched = usize::from(agent.executor().current_action().is_some());
    assert_eq!(agent.executor().queue().len() + dispatched, 2);

    for _ in 0..3_000 {
        sim.tick();
    }
    let agent = sim.agent("Steve").unwrap();
    assert_eq!(agent.memory().history().count(), 2);
    assert_eq!(agent.executor().current_goal(), None);
    assert!(agent.executor().idle_action().is_some());
    assert_eq!(sim.world().inventory_count(alex, "raw_iron"), 1);
    assert!(chat.contains("Steve", "I put 1 iron_ore in your inventory."));
}

#[tokio::test]
async fn test_unreadable_reply_leaves_agent_idle() {
    fn reply(_user: &str) -> Option<String> {
        Some("I would rather not.".to_string())
    }
    let (mut sim, chat) = simulation(reply);
    sim.spawn("Steve").unwrap();
    sim.tell("Steve", "dance").unwrap();
    wait_for_plan(&mut sim, "Steve").await;

    let agent = sim.agent("Steve").unwrap();
    assert_eq!(agent.executor().current_goal(), None);
    assert!(agent.executor().queue().is_empty());
    assert!(chat.contains(
        "Steve",
        "I'm confused. I couldn't understand the plan."
    ));
}

#[tokio::test]
async fn test_unreachable_service_is_reported() {
    fn reply(_user: &str) -> Option<String> {
        None
    }
    let (mut sim, chat) = simulation(reply);
    sim.spawn("Steve").unwrap();
    sim.tell("Steve", "build a house").unwrap();
    wait_for_plan(&mut sim, "Steve").await;
    assert!(chat.contains("Steve", "I couldn't connect to my brain"));
    assert_eq!(sim.agent("Steve").unwrap().executor().current_goal(), None);
}

#[tokio::test]
async fn test_latest_command_wins_over_slow_plan() {
    fn reply(user: &str) -> Option<String> {
        let goal = if user.contains("\"slow") { "Slow" } else { "Fast" };
        Some(format!(
            r#"{{"reasoning": "", "plan": "{}", "tasks": [{{"action": "follow", "parameters": {{"player": "Alex"}}}}]}}"#,
            goal
        ))
    }
    let (mut sim, chat) = simulation(reply);
    sim.spawn("Steve").unwrap();
    sim.world_mut().spawn_player("Alex", ground(10.5, 0.5));

    sim.tell("Steve", "slow down and follow").unwrap();
    sim.tell("Steve", "follow me now").unwrap();
    wait_for_plan(&mut sim, "Steve").await;
    assert_eq!(sim.agent("Steve").unwrap().executor().current_goal(), Some("Fast"));

    // let the slow worker land; its plan belongs to an older generation
    tokio::time::sleep(Duration::from_millis(120)).await;
    sim.tick();
    assert_eq!(sim.agent("Steve").unwrap().executor().current_goal(), Some("Fast"));
    assert!(!chat.contains("Steve", "Okay! Slow"));
}

#[tokio::test]
async fn test_stop_cancels_running_plan() {
    let (mut sim, _chat) = simulation(follow_reply);
    sim.spawn("Steve").unwrap();
    sim.world_mut().spawn_player("Alex", ground(20.5, 0.5));
    sim.tell("Steve", "follow me").unwrap();
    wait_for_plan(&mut sim, "Steve").await;
    for _ in 0..40 {
        sim.tick();
    }
    assert!(sim.agent("Steve").unwrap().executor().current_action().is_some());

    assert_eq!(
        sim.execute(OperatorCommand::Stop { name: "steve".into() }).unwrap(),
        "Stopped agent: steve"
    );
    let agent = sim.agent("Steve").unwrap();
    assert!(agent.executor().current_action().is_none());
    assert_eq!(agent.executor().current_goal(), None);
    assert!(agent.memory().pending().is_empty());
}
