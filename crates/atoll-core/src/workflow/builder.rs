//! Workflow builder — validates a config and assembles its agents.
//!
//! The builder owns the atomic-assembly rule: either every agent of the
//! workflow builds, or none survive. On a mid-build failure the agents
//! already built are closed before the error propagates, so no
//! sub-server connection leaks from a failed assembly.

use std::collections::HashMap;

use crate::agent::instructions::SYSTEM_CONTEXT_KEY;
use crate::agent::{Agent, AgentFactory};
use crate::error::WorkflowError;
use crate::workflow::schema::WorkflowConfig;

const OVERVIEW_HEADER: &str = "\
You are a manager agent. Solve the user's task by delegating tasks to the appropriate agents and delegating the tasks to them.
Think step by step and do not ask the user for clarification, just execute the task as best as you can.You have access to the following agents:
";

/// A fully assembled workflow, ready for one execution.
#[derive(Debug)]
pub struct BuiltWorkflow {
    /// Built agents keyed by name.
    pub agents: HashMap<String, Agent>,
    /// Agent names in config order. Chain and Single depend on it.
    pub order: Vec<String>,
    /// Manager/triage overview text listing every agent.
    pub overview: String,
    /// Model used for ephemeral coordinator agents.
    pub model_name: String,
}

pub struct WorkflowBuilder {
    factory: AgentFactory,
}

impl WorkflowBuilder {
    pub fn new(factory: AgentFactory) -> Self {
        Self { factory }
    }

    /// Validate the config and build every agent, in config order.
    pub async fn build(
        &self,
        config: &WorkflowConfig,
        user_id: &str,
    ) -> Result<BuiltWorkflow, WorkflowError> {
        config.validate()?;

        let mut overview = String::from(OVERVIEW_HEADER);
        for spec in &config.agents {
            overview.push_str(&format!("{}: {}\n", spec.name, spec.persona));
        }

        let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let mut agents: HashMap<String, Agent> = HashMap::with_capacity(config.agents.len());
        let mut order: Vec<String> = Vec::with_capacity(config.agents.len());

        for spec in &config.agents {
            let mut spec = spec.clone();
            spec.context.insert(
                SYSTEM_CONTEXT_KEY.to_string(),
                serde_json::json!(format!("The time is {}", timestamp)),
            );

            match self
                .factory
                .build(&spec, user_id, &config.model_name, config.credential_ref.as_deref())
                .await
            {
                Ok(agent) => {
                    order.push(agent.name.clone());
                    agents.insert(agent.name.clone(), agent);
                }
                Err(e) => {
                    for (_, mut agent) in agents.drain() {
                        agent.close().await;
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "[WorkflowBuilder] Assembled {} agent(s) for topology '{}'",
            order.len(),
            config.topology
        );

        Ok(BuiltWorkflow {
            agents,
            order,
            overview,
            model_name: config.model_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tools::StaticToolCatalog;
    use crate::workflow::schema::{AgentSpec, Topology};

    fn builder() -> WorkflowBuilder {
        WorkflowBuilder::new(AgentFactory::new(Arc::new(StaticToolCatalog::with_tools([
            ("Gmail.SendEmail", "Send an email"),
        ]))))
    }

    fn spec(name: &str, persona: &str) -> AgentSpec {
        AgentSpec {
            name: name.to_string(),
            persona: persona.to_string(),
            task: String::new(),
            expected_input: String::new(),
            expected_output: String::new(),
            guidelines: Vec::new(),
            tool_identifiers: Vec::new(),
            sub_servers: Vec::new(),
            context: serde_json::Map::new(),
        }
    }

    fn config(agents: Vec<AgentSpec>) -> WorkflowConfig {
        WorkflowConfig {
            objective: "test".to_string(),
            topology: Topology::Manager,
            model_name: "test-model".to_string(),
            credential_ref: None,
            agents,
        }
    }

    #[tokio::test]
    async fn test_build_preserves_config_order() {
        let built = builder()
            .build(
                &config(vec![spec("b", "second"), spec("a", "first")]),
                "user-1",
            )
            .await
            .unwrap();
        assert_eq!(built.order, vec!["b", "a"]);
        assert_eq!(built.agents.len(), 2);
    }

    #[tokio::test]
    async fn test_overview_lists_agents_in_order() {
        let built = builder()
            .build(
                &config(vec![spec("mailer", "email assistant"), spec("coder", "programmer")]),
                "user-1",
            )
            .await
            .unwrap();
        assert!(built.overview.starts_with(
            "You are a manager agent. Solve the user's task by delegating tasks to the appropriate agents and delegating the tasks to them.\n"
        ));
        assert!(built
            .overview
            .contains("as best as you can.You have access to the following agents:\n"));
        let mailer_pos = built.overview.find("mailer: email assistant").unwrap();
        let coder_pos = built.overview.find("coder: programmer").unwrap();
        assert!(mailer_pos < coder_pos);
    }

    #[tokio::test]
    async fn test_build_injects_system_context() {
        let built = builder()
            .build(&config(vec![spec("a", "helper")]), "user-1")
            .await
            .unwrap();
        assert!(built.agents["a"].instructions.contains("- The time is "));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let err = builder().build(&config(Vec::new()), "user-1").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Config(_)));
    }

    #[tokio::test]
    async fn test_failed_agent_aborts_whole_build() {
        let mut bad = spec("bad", "broken");
        bad.tool_identifiers = vec!["Nope.Missing".to_string()];
        let err = builder()
            .build(&config(vec![spec("good", "fine"), bad]), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AgentBuild { ref agent, .. } if agent == "bad"));
    }
}
