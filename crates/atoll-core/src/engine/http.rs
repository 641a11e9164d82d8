//! HTTP execution engine — a single-shot call against an
//! Anthropic-compatible Messages API.
//!
//! The agent's rendered instructions go in the system slot and the task
//! is the sole user message. Tool handles are advertised in the request
//! but the multi-turn tool-use loop is handled upstream by coordinator
//! topologies, not here.

use async_trait::async_trait;
use serde::Deserialize;

use crate::agent::Agent;
use crate::engine::{AgentEngine, RunContext};
use crate::error::WorkflowError;
use crate::workflow::executor::Delegator;

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct HttpEngineConfig {
    pub base_url: String,
    pub api_key: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpEngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            api_key: String::new(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

pub struct HttpEngine {
    config: HttpEngineConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

impl HttpEngine {
    pub fn new(config: HttpEngineConfig) -> Result<Self, WorkflowError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| WorkflowError::Execution(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn invocation_error(agent: &Agent, reason: impl std::fmt::Display) -> WorkflowError {
        WorkflowError::AgentInvocation {
            agent: agent.name.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl AgentEngine for HttpEngine {
    async fn run(
        &self,
        agent: &Agent,
        task: &str,
        _ctx: &RunContext,
        _delegator: Option<&Delegator>,
    ) -> Result<String, WorkflowError> {
        let api_key = agent
            .credential_ref
            .as_deref()
            .unwrap_or(&self.config.api_key);

        let tools: Vec<serde_json::Value> = agent
            .tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.identifier.replace('.', "_"),
                    "description": t.description.clone().unwrap_or_default(),
                    "input_schema": t.parameters.clone()
                        .unwrap_or_else(|| serde_json::json!({"type": "object"})),
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": agent.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": agent.instructions,
            "messages": [{ "role": "user", "content": task }],
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::json!(tools);
        }

        tracing::debug!("[HttpEngine] Invoking agent '{}' ({})", agent.name, agent.model);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::invocation_error(agent, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Self::invocation_error(
                agent,
                format!("API returned {}: {}", status, detail),
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Self::invocation_error(agent, format!("invalid response body: {}", e)))?;

        let text: Vec<&str> = parsed
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text.as_str())
            .collect();

        if text.is_empty() {
            return Err(Self::invocation_error(agent, "response had no text content"));
        }

        Ok(text.join("\n"))
    }
}
