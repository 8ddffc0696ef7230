//! Reasoning-service providers and the fallback chain
//!
//! Providers are injected into the planner as a [`ProviderSet`] so tests can
//! substitute scripted fakes for the HTTP clients.

use crate::core::config::LlmConfig;
use crate::core::error::{AgentError, Result};
use crate::llm::client::LlmClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Anything that can turn a system + user prompt into raw model text
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn send_request(&self, system: &str, user: &str) -> Result<String>;
}

/// Named providers the configuration may select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Groq,
    Gemini,
    OpenAi,
}

impl ProviderKind {
    /// Order in which alternates are tried after the configured provider
    pub const FALLBACK_ORDER: [ProviderKind; 3] =
        [ProviderKind::Groq, ProviderKind::Gemini, ProviderKind::OpenAi];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "groq" => Some(ProviderKind::Groq),
            "gemini" => Some(ProviderKind::Gemini),
            "openai" => Some(ProviderKind::OpenAi),
            _ => None,
        }
    }

    /// Resolve a configured name, falling back to Groq for unknown names
    pub fn resolve(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            warn!("Unknown AI provider '{}', using groq", name);
            ProviderKind::Groq
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The configured provider plus whichever alternates are available
#[derive(Clone)]
pub struct ProviderSet {
    configured: ProviderKind,
    providers: Vec<(ProviderKind, Arc<dyn ReasoningProvider>)>,
}

impl ProviderSet {
    pub fn new(configured: ProviderKind) -> Self {
        Self {
            configured,
            providers: Vec::new(),
        }
    }

    /// Register (or replace) the handle for one provider kind
    pub fn with(mut self, kind: ProviderKind, provider: Arc<dyn ReasoningProvider>) -> Self {
        self.providers.retain(|(k, _)| *k != kind);
        self.providers.push((kind, provider));
        self
    }

    /// Build HTTP clients for every provider whose API key is present
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut set = Self::new(ProviderKind::resolve(&config.provider));
        for kind in ProviderKind::FALLBACK_ORDER {
            let settings = match kind {
                ProviderKind::Groq => &config.groq,
                ProviderKind::Gemini => &config.gemini,
                ProviderKind::OpenAi => &config.openai,
            };
            match LlmClient::from_settings(kind.name(), settings) {
                Ok(client) => set = set.with(kind, Arc::new(client)),
                Err(e) => info!("Provider {} unavailable: {}", kind, e),
            }
        }
        set
    }

    pub fn configured(&self) -> ProviderKind {
        self.configured
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn handle(&self, kind: ProviderKind) -> Option<&Arc<dyn ReasoningProvider>> {
        self.providers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p)
    }

    /// Kinds in the order they will be tried
    ///
    /// The configured provider first, then up to two alternates from
    /// [`ProviderKind::FALLBACK_ORDER`]. Kinds without a handle are skipped.
    pub fn chain(&self) -> Vec<ProviderKind> {
        std::iter::once(self.configured)
            .chain(
                ProviderKind::FALLBACK_ORDER
                    .into_iter()
                    .filter(|k| *k != self.configured)
                    .take(2),
            )
            .filter(|k| self.handle(*k).is_some())
            .collect()
    }

    /// Walk the chain until one provider answers
    pub async fn request(&self, system: &str, user: &str) -> Result<String> {
        for kind in self.chain() {
            let Some(provider) = self.handle(kind) else {
                continue;
            };
            match provider.send_request(system, user).await {
                Ok(response) => return Ok(response),
                Err(e) => warn!("{} failed: {}", provider.name(), e),
            }
        }
        Err(AgentError::PlanningUnavailable)
    }
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSet")
            .field("configured", &self.configured)
            .field("chain", &self.chain())
            .finish()
    }
}
