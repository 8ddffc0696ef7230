//! Agent configuration with documented constants
//!
//! Loaded from TOML (every section and field is optional) and validated
//! before use. Behaviour tuning is also reachable through a global accessor
//! so long-running behaviours can read it without threading it through
//! every constructor.

use crate::core::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub llm: LlmConfig,
    pub executor: ExecutorConfig,
    pub behavior: BehaviorTuning,
    pub simulation: SimulationConfig,
}

/// Reasoning-service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Configured provider name: "groq", "gemini" or "openai"
    pub provider: String,
    pub groq: ProviderSettings,
    pub gemini: ProviderSettings,
    pub openai: ProviderSettings,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "groq".into(),
            groq: ProviderSettings {
                api_url: "https://api.groq.com/openai/v1/chat/completions".into(),
                model: "llama-3.1-8b-instant".into(),
                api_key_env: "GROQ_API_KEY".into(),
                max_tokens: 8000,
            },
            gemini: ProviderSettings {
                api_url: "https://generativelanguage.googleapis.com/v1beta/models".into(),
                model: "gemini-1.5-flash".into(),
                api_key_env: "GEMINI_API_KEY".into(),
                max_tokens: 8192,
            },
            openai: ProviderSettings {
                api_url: "https://api.openai.com/v1/chat/completions".into(),
                model: "gpt-4o-mini".into(),
                api_key_env: "OPENAI_API_KEY".into(),
                max_tokens: 8192,
            },
        }
    }
}

/// Connection settings for one provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub max_tokens: u32,
}

/// Task executor pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Minimum ticks between two task dispatches
    ///
    /// This is a global pacing knob, independent of any per-action timeout.
    /// At 20 ticks per second the default leaves one second between tasks.
    pub action_tick_delay: u32,

    /// Whether plan acknowledgements and failures are shown to players
    pub enable_chat_responses: bool,

    /// How often (in ticks) a running action is logged
    pub progress_log_interval: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            action_tick_delay: 20,
            enable_chat_responses: true,
            progress_log_interval: 100,
        }
    }
}

/// Stall-recovery tuning shared by every goal-directed behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorTuning {
    /// Squared-distance change below which a tick counts as "no progress"
    pub stuck_epsilon: f64,

    /// Stuck ticks before a jump / obstruction clear is attempted (~1 s)
    pub short_stuck_threshold: u32,

    /// Stuck ticks before relocating next to the objective (~10 s)
    pub long_stuck_threshold: u32,

    /// Amount subtracted from the stuck counter after an unstick attempt
    ///
    /// Damping rather than resetting means a second attempt follows soon
    /// if the first one did not help.
    pub stuck_damping: u32,

    /// Distance beyond which relocation is allowed (blocks)
    pub relocate_distance: f64,

    /// Ticks between navigation re-issues while approaching
    pub repath_interval: u32,
}

impl Default for BehaviorTuning {
    fn default() -> Self {
        Self {
            stuck_epsilon: 0.1,
            short_stuck_threshold: 20,
            long_stuck_threshold: 200,
            stuck_damping: 10,
            relocate_distance: 10.0,
            repath_interval: 10,
        }
    }
}

/// Simulation loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Wall-clock milliseconds per tick when running in real time
    pub tick_millis: u64,
    /// Maximum number of agents alive at once
    pub max_agents: usize,
    /// Half-extent of the generated flat world (blocks)
    pub world_radius: i32,
    /// Seed for world generation and random wandering
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_millis: 50,
            max_agents: 10,
            world_radius: 48,
            seed: 0x5EED,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AgentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AgentError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `CRAFTMIND_PROVIDER` if set
    pub fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("CRAFTMIND_PROVIDER") {
            if !provider.trim().is_empty() {
                self.llm.provider = provider.trim().to_lowercase();
            }
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let b = &self.behavior;
        if b.short_stuck_threshold >= b.long_stuck_threshold {
            return Err(AgentError::ConfigError(format!(
                "short_stuck_threshold ({}) should be < long_stuck_threshold ({})",
                b.short_stuck_threshold, b.long_stuck_threshold
            )));
        }
        if b.stuck_damping > b.short_stuck_threshold {
            return Err(AgentError::ConfigError(format!(
                "stuck_damping ({}) should be <= short_stuck_threshold ({})",
                b.stuck_damping, b.short_stuck_threshold
            )));
        }
        if b.stuck_epsilon <= 0.0 || b.relocate_distance <= 0.0 {
            return Err(AgentError::ConfigError(
                "stuck_epsilon and relocate_distance must be positive".into(),
            ));
        }
        if self.simulation.max_agents == 0 {
            return Err(AgentError::ConfigError("max_agents must be at least 1".into()));
        }
        Ok(())
    }
}

// === GLOBAL TUNING ACCESS ===

use std::sync::OnceLock;

static TUNING: OnceLock<BehaviorTuning> = OnceLock::new();

/// Get the global behaviour tuning (initializes with defaults if not set)
pub fn tuning() -> &'static BehaviorTuning {
    TUNING.get_or_init(BehaviorTuning::default)
}

/// Set the global behaviour tuning (can only be called once)
///
/// Returns Err if tuning was already set.
pub fn set_tuning(tuning: BehaviorTuning) -> std::result::Result<(), BehaviorTuning> {
    TUNING.set(tuning)
}
