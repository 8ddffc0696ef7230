//! Craftmind - Entry Point
//!
//! Builds a flat world with one player, then reads operator commands from
//! stdin. Planning calls run on the tokio runtime while the REPL advances
//! the simulation tick by tick.

use clap::Parser;
use craftmind::command::OperatorCommand;
use craftmind::command::TaskPlanner;
use craftmind::core::config::{set_tuning, AgentConfig};
use craftmind::core::error::Result;
use craftmind::core::types::Vec3;
use craftmind::llm::ProviderSet;
use craftmind::simulation::Simulation;
use craftmind::ui::ConsoleNotifier;
use craftmind::world::WorldAccess;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Craftmind - natural-language controlled voxel agents
#[derive(Parser, Debug)]
#[command(name = "craftmind")]
#[command(about = "Spawn agents in a voxel world and give them orders in plain language")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reasoning provider override: groq, gemini or openai
    #[arg(long)]
    provider: Option<String>,

    /// World seed
    #[arg(long)]
    seed: Option<u64>,

    /// Name of the player standing in the world
    #[arg(long, default_value = "Player")]
    player: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter("craftmind=debug")
        .init();

    tracing::info!("Craftmind starting...");

    let mut config = match &args.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::new(),
    };
    config.apply_env_overrides();
    if let Some(provider) = args.provider {
        config.llm.provider = provider;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    config.validate()?;
    if set_tuning(config.behavior.clone()).is_err() {
        tracing::warn!("Behaviour tuning was already set");
    }

    let rt = Runtime::new()?;

    let providers = ProviderSet::from_config(&config.llm);
    if providers.is_empty() {
        tracing::warn!("No API keys found - tell commands will report planning failures");
    }
    let planner = TaskPlanner::new(providers);
    let mut sim = Simulation::new(&config, planner, Arc::new(ConsoleNotifier), rt.handle().clone());

    let y = sim.world().surface_height(0, 0) as f64;
    sim.world_mut()
        .spawn_player(&args.player, Vec3::new(0.5, y, 0.5));

    println!("\n=== CRAFTMIND ===");
    println!();
    println!("Commands:");
    println!("  tick / t                 - Advance simulation by one tick");
    println!("  run <n>                  - Run n ticks in real time");
    println!("  status / s               - Show agent status");
    println!("  spawn <name>             - Spawn an agent next to {}", args.player);
    println!("  remove <name>            - Remove an agent");
    println!("  list                     - List agents");
    println!("  tell <name> <command>    - Give an agent an order");
    println!("  stop <name>              - Cancel everything an agent is doing");
    println!("  glow <name>              - Toggle an agent's highlight");
    println!("  quit / q                 - Exit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input == "quit" || input == "q" {
            break;
        }

        if input == "tick" || input == "t" {
            sim.tick();
            println!("Tick {} complete.", sim.current_tick());
            continue;
        }

        if input == "status" || input == "s" {
            display_status(&sim);
            continue;
        }

        if let Some(count) = input.strip_prefix("run ") {
            match count.trim().parse::<u32>() {
                Ok(n) => {
                    println!("Running {} ticks...", n);
                    for _ in 0..n {
                        sim.tick();
                        std::thread::sleep(sim.tick_duration());
                    }
                    println!("Now at tick {}.", sim.current_tick());
                }
                Err(_) => println!("Usage: run <number>"),
            }
            continue;
        }

        match OperatorCommand::parse(input).and_then(|command| sim.execute(command)) {
            Ok(feedback) => println!("{}", feedback),
            Err(e) => println!("{}", e),
        }
    }

    println!(
        "\nGoodbye! {} agents, {} ticks elapsed.",
        sim.agent_names().len(),
        sim.current_tick()
    );
    Ok(())
}

fn display_status(sim: &Simulation) {
    println!();
    println!("=== Status (Tick {}) ===", sim.current_tick());
    for name in sim.agent_names() {
        let Some(agent) = sim.agent(name) else {
            continue;
        };
        let executor = agent.executor();
        let position = sim
            .world()
            .position(agent.id())
            .map(|p| format!("{}", p.block_pos()))
            .unwrap_or_else(|| "unknown".to_string());
        let action = executor
            .current_action()
            .or(executor.idle_action())
            .map(|a| a.description())
            .unwrap_or_else(|| "nothing".to_string());

        println!("{}{}", agent.name(), if agent.is_glowing() { " *" } else { "" });
        println!("  Position: {}", position);
        println!("  Goal: {}", executor.current_goal().unwrap_or("none"));
        println!("  Doing: {} ({} queued)", action, executor.queue().len());
        if let Some(outcome) = executor.last_outcome() {
            println!("  Last result: {}", outcome.message);
        }
    }
    println!();
}
