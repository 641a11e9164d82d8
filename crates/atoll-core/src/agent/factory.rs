//! Agent factory — turns one [`AgentSpec`] into a runnable [`Agent`].
//!
//! Build order per agent: resolve tools, connect sub-servers, render
//! instructions, assemble. Any failure aborts the agent; sub-server
//! connections already opened for that agent are closed before the
//! error propagates.

use std::sync::Arc;

use crate::agent::{instructions, Agent, SubServerConnection};
use crate::error::WorkflowError;
use crate::tools::ToolCatalog;
use crate::workflow::schema::AgentSpec;

pub struct AgentFactory {
    catalog: Arc<dyn ToolCatalog>,
}

impl AgentFactory {
    pub fn new(catalog: Arc<dyn ToolCatalog>) -> Self {
        Self { catalog }
    }

    /// Build one agent. `model_name` and `credential_ref` come from the
    /// workflow config and apply to every agent of the run.
    pub async fn build(
        &self,
        spec: &AgentSpec,
        user_id: &str,
        model_name: &str,
        credential_ref: Option<&str>,
    ) -> Result<Agent, WorkflowError> {
        let tools = if spec.tool_identifiers.is_empty() {
            Vec::new()
        } else {
            let mut context = spec.context.clone();
            context.insert("user_id".to_string(), serde_json::json!(user_id));
            self.catalog
                .resolve(&spec.tool_identifiers, user_id, &context)
                .await
                .map_err(|e| WorkflowError::AgentBuild {
                    agent: spec.name.clone(),
                    reason: e.to_string(),
                })?
        };

        let mut sub_servers: Vec<SubServerConnection> = Vec::with_capacity(spec.sub_servers.len());
        for server_spec in &spec.sub_servers {
            match SubServerConnection::connect(server_spec) {
                Ok(connection) => sub_servers.push(connection),
                Err(e) => {
                    for connection in sub_servers.drain(..) {
                        connection.close().await;
                    }
                    return Err(WorkflowError::AgentBuild {
                        agent: spec.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let rendered = instructions::render(spec);

        let mut agent = Agent::new(spec.name.clone(), rendered, model_name.to_string());
        agent.credential_ref = credential_ref.map(str::to_string);
        agent.tools = tools;
        agent.sub_servers = sub_servers;

        tracing::debug!(
            "[AgentFactory] Built agent '{}' ({} tool(s), {} sub-server(s))",
            agent.name,
            agent.tools.len(),
            agent.sub_servers.len()
        );

        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::StaticToolCatalog;
    use crate::workflow::schema::{SubServerKind, SubServerSpec};

    fn factory() -> AgentFactory {
        AgentFactory::new(Arc::new(StaticToolCatalog::with_tools([(
            "Gmail.SendEmail",
            "Send an email",
        )])))
    }

    fn spec() -> AgentSpec {
        AgentSpec {
            name: "mailer".to_string(),
            persona: "an email assistant".to_string(),
            task: String::new(),
            expected_input: String::new(),
            expected_output: String::new(),
            guidelines: Vec::new(),
            tool_identifiers: vec!["Gmail.SendEmail".to_string()],
            sub_servers: Vec::new(),
            context: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_build_resolves_tools() {
        let agent = factory()
            .build(&spec(), "user-1", "test-model", None)
            .await
            .unwrap();
        assert_eq!(agent.name, "mailer");
        assert_eq!(agent.model, "test-model");
        assert_eq!(agent.tools.len(), 1);
        assert_eq!(agent.tools[0].user_id, "user-1");
        assert!(agent.instructions.contains("an email assistant"));
    }

    #[tokio::test]
    async fn test_build_unknown_tool_fails() {
        let mut s = spec();
        s.tool_identifiers = vec!["Nope.Missing".to_string()];
        let err = factory()
            .build(&s, "user-1", "test-model", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AgentBuild { .. }));
        assert!(err.to_string().contains("Nope.Missing"));
    }

    #[tokio::test]
    async fn test_build_bad_sub_server_fails() {
        let mut s = spec();
        s.tool_identifiers.clear();
        s.sub_servers = vec![SubServerSpec {
            name: "broken".to_string(),
            kind: SubServerKind::Sse,
            connection_params: serde_json::Map::new(),
            url: None,
            timeout_seconds: 60,
            cache_tool_list: true,
        }];
        let err = factory()
            .build(&s, "user-1", "test-model", None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AgentBuild { ref agent, .. } if agent == "mailer"));
    }

    #[tokio::test]
    async fn test_build_forwards_credential_ref() {
        let mut s = spec();
        s.tool_identifiers.clear();
        let agent = factory()
            .build(&s, "user-1", "test-model", Some("cred-7"))
            .await
            .unwrap();
        assert_eq!(agent.credential_ref.as_deref(), Some("cred-7"));
    }
}
