//! Declarative workflow configuration — the JSON/YAML document submitted
//! once per run.
//!
//! A workflow names its objective, an interaction topology, and an ordered
//! list of agent specs:
//!
//! ```json
//! {
//!   "objective": "Research and report",
//!   "topology": "manager",
//!   "modelName": "gpt-4.1-mini",
//!   "agents": [
//!     {
//!       "name": "mailer",
//!       "persona": "email assistant",
//!       "expectedOutput": "A confirmation that the mail was sent",
//!       "guidelines": ["Keep mails short"],
//!       "toolIdentifiers": ["Gmail.SendEmail"],
//!       "subServers": [
//!         { "name": "search", "kind": "sse",
//!           "connectionParams": { "url": "http://localhost:38080/sse" } }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! The config is immutable once submitted; `validate()` is the single
//! gate that rejects malformed configs before any agent is constructed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// Interaction pattern among a workflow's agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    /// One ephemeral manager delegates to named agents via a tool call.
    Manager,
    /// Agents execute strictly in config order, output feeding input.
    Chain,
    /// Recognized but intentionally unimplemented.
    GroupChat,
    /// One ephemeral handoff agent pre-wired to every built agent.
    Triage,
    /// Exactly the first agent in config order runs the task.
    Single,
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topology::Manager => write!(f, "manager"),
            Topology::Chain => write!(f, "chain"),
            Topology::GroupChat => write!(f, "group-chat"),
            Topology::Triage => write!(f, "triage"),
            Topology::Single => write!(f, "single"),
        }
    }
}

/// Top-level workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    /// What the workflow as a whole is meant to achieve.
    pub objective: String,

    /// How the agents interact.
    pub topology: Topology,

    /// Model identifier resolved by the execution engine; opaque here.
    pub model_name: String,

    /// Reference to the credential the engine should run under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<String>,

    /// Ordered agent specs. Order matters for Chain and Single.
    pub agents: Vec<AgentSpec>,
}

/// Declarative spec for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    /// Unique within a workflow; used as the delegation lookup key.
    pub name: String,

    /// Free text shaping the rendered system prompt.
    pub persona: String,

    #[serde(default)]
    pub task: String,

    #[serde(default)]
    pub expected_input: String,

    #[serde(default)]
    pub expected_output: String,

    /// Each guideline is rendered prefixed with `- `.
    #[serde(default)]
    pub guidelines: Vec<String>,

    /// Namespaced tool identifiers, e.g. "Gmail.SendEmail".
    #[serde(default)]
    pub tool_identifiers: Vec<String>,

    /// External tool sources connected at build time, in order.
    #[serde(default)]
    pub sub_servers: Vec<SubServerSpec>,

    /// Free-form context merged with the reserved `__system__` key
    /// injected at build time.
    #[serde(default)]
    pub context: serde_json::Map<String, serde_json::Value>,
}

/// Transport used to reach a sub-server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubServerKind {
    Sse,
    StreamableHttp,
}

impl std::fmt::Display for SubServerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubServerKind::Sse => write!(f, "sse"),
            SubServerKind::StreamableHttp => write!(f, "streamable-http"),
        }
    }
}

impl std::str::FromStr for SubServerKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sse" => Ok(SubServerKind::Sse),
            "streamable-http" | "http" => Ok(SubServerKind::StreamableHttp),
            other => Err(format!("Unknown sub-server kind: {}", other)),
        }
    }
}

/// One external tool server an agent connects to at build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubServerSpec {
    pub name: String,

    pub kind: SubServerKind,

    /// Transport parameters; must carry a `url` entry (or see `url`).
    #[serde(default)]
    pub connection_params: serde_json::Map<String, serde_json::Value>,

    /// Top-level URL fallback when `connectionParams` has no `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_cache_tool_list")]
    pub cache_tool_list: bool,
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_cache_tool_list() -> bool {
    true
}

impl SubServerSpec {
    /// Resolve the connection URL: `connectionParams.url` wins, the
    /// top-level `url` is the fallback. `None` is a fatal build error.
    pub fn resolve_url(&self) -> Option<&str> {
        self.connection_params
            .get("url")
            .and_then(|v| v.as_str())
            .or(self.url.as_deref())
    }
}

impl WorkflowConfig {
    /// Reject configs that cannot produce a well-formed run: an empty
    /// agent list, blank agent names, or duplicate agent names (a
    /// duplicate would silently rewire Chain order and the manager
    /// overview, so it is an explicit error rather than last-write-wins).
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.agents.is_empty() {
            return Err(WorkflowError::Config("workflow has no agents".to_string()));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for spec in &self.agents {
            if spec.name.trim().is_empty() {
                return Err(WorkflowError::Config("agent with empty name".to_string()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(WorkflowError::Config(format!(
                    "duplicate agent name '{}'",
                    spec.name
                )));
            }
        }

        Ok(())
    }

    /// Parse a workflow config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, WorkflowError> {
        serde_json::from_str(json)
            .map_err(|e| WorkflowError::Config(format!("failed to parse workflow JSON: {}", e)))
    }

    /// Parse a workflow config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, WorkflowError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| WorkflowError::Config(format!("failed to parse workflow YAML: {}", e)))
    }

    /// Load a workflow config from a file path, choosing the format by
    /// extension (`.yaml`/`.yml` for YAML, everything else JSON).
    pub fn from_file(path: &str) -> Result<Self, WorkflowError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::Config(format!("failed to read workflow file '{}': {}", path, e))
        })?;
        if path.ends_with(".yaml") || path.ends_with(".yml") {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }
}
