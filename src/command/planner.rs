//! Command planning pipeline: prompt → provider chain → parse → validate

use crate::core::error::AgentError;
use crate::llm::context::PromptContext;
use crate::llm::parser::parse_response;
use crate::llm::prompt::{system_prompt, user_prompt};
use crate::llm::provider::ProviderSet;
use crate::task::validate::validate_and_filter;
use crate::task::Plan;
use crate::ui::Notifier;
use tracing::{error, info};

pub const THINKING_MESSAGE: &str = "Thinking...";
pub const UNAVAILABLE_MESSAGE: &str =
    "I couldn't connect to my brain (AI API failed). Please check the logs/config.";
pub const CONFUSED_MESSAGE: &str = "I'm confused. I couldn't understand the plan.";

/// Turns one natural-language command into a validated [`Plan`]
#[derive(Debug, Clone)]
pub struct TaskPlanner {
    providers: ProviderSet,
}

impl TaskPlanner {
    pub fn new(providers: ProviderSet) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    /// Plan, or explain the failure and return the error kind
    pub async fn try_plan(
        &self,
        context: &PromptContext,
        command: &str,
        notifier: &dyn Notifier,
    ) -> Result<Plan, AgentError> {
        let agent = context.agent_name.as_str();
        info!(
            "Requesting plan for '{}' using {}: {}",
            agent,
            self.providers.configured(),
            command
        );
        notifier.notify(agent, THINKING_MESSAGE);

        let user = user_prompt(context, command);
        let raw = match self.providers.request(system_prompt(), &user).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("No plan for '{}' ({}): {}", agent, e, command);
                notifier.notify(agent, UNAVAILABLE_MESSAGE);
                return Err(AgentError::PlanningUnavailable);
            }
        };
        info!("Raw response: {}", raw);

        let Some(mut plan) = parse_response(&raw) else {
            notifier.notify(agent, CONFUSED_MESSAGE);
            return Err(AgentError::ParseFailure(raw));
        };
        plan.tasks = validate_and_filter(plan.tasks);
        info!("Plan: {} ({} tasks)", plan.goal, plan.tasks.len());
        Ok(plan)
    }

    /// `None` means "no plan"; the reason has already been shown to the player
    pub async fn plan_tasks(
        &self,
        context: &PromptContext,
        command: &str,
        notifier: &dyn Notifier,
    ) -> Option<Plan> {
        self.try_plan(context, command, notifier).await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Result;
    use crate::llm::provider::{ProviderKind, ReasoningProvider};
    use crate::ui::ChatLog;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Canned(Option<&'static str>);

    #[async_trait]
    impl ReasoningProvider for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn send_request(&self, _system: &str, _user: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| AgentError::LlmError("down".into()))
        }
    }

    fn planner(reply: Option<&'static str>) -> TaskPlanner {
        TaskPlanner::new(
            ProviderSet::new(ProviderKind::Groq).with(ProviderKind::Groq, Arc::new(Canned(reply))),
        )
    }

    fn context() -> PromptContext {
        PromptContext {
            agent_name: "Steve".into(),
            ..PromptContext::default()
        }
    }

    #[tokio::test]
    async fn test_plan_validated() {
        let chat = ChatLog::new();
        let reply = r#"{"reasoning": "r", "plan": "Follow Alex", "tasks": [
            {"action": "dance", "parameters": {}},
            {"action": "follow", "parameters": {"player": "Alex"}}]}"#;
        let plan = planner(Some(reply))
            .plan_tasks(&context(), "follow alex", &chat)
            .await
            .unwrap();
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].action(), "follow");
        assert_eq!(chat.messages_for("Steve"), vec![THINKING_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_provider_failure_reported() {
        let chat = ChatLog::new();
        let result = planner(None).try_plan(&context(), "hi", &chat).await;
        assert!(matches!(result, Err(AgentError::PlanningUnavailable)));
        assert!(chat.contains("Steve", "couldn't connect"));
    }

    #[tokio::test]
    async fn test_parse_failure_reported() {
        let chat = ChatLog::new();
        let result = planner(Some("no json here")).try_plan(&context(), "hi", &chat).await;
        assert!(matches!(result, Err(AgentError::ParseFailure(_))));
        assert!(chat.contains("Steve", "I'm confused"));
    }
}
