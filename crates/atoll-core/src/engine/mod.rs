//! Execution engines — the pluggable LLM backend behind every agent
//! invocation.
//!
//! The core never talks to a model directly; topologies hand each agent
//! invocation to an [`AgentEngine`]. [`http::HttpEngine`] is the
//! production implementation; [`mock`] holds deterministic engines for
//! tests and offline use.

pub mod http;
pub mod mock;

pub use http::{HttpEngine, HttpEngineConfig};

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::agent::Agent;
use crate::error::WorkflowError;
use crate::workflow::executor::Delegator;

/// Per-run context shared by every invocation of one run. Cheap to
/// clone; the value map is immutable once the run starts.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub user_id: String,
    pub values: Arc<serde_json::Map<String, serde_json::Value>>,
}

impl RunContext {
    pub fn new(run_id: Uuid, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let mut values = serde_json::Map::new();
        values.insert("user_id".to_string(), serde_json::json!(user_id));
        Self {
            run_id,
            user_id,
            values: Arc::new(values),
        }
    }
}

/// One agent invocation: run `task` through `agent` and return its final
/// text output.
///
/// `delegator` is `Some` only for ephemeral coordinator agents (manager,
/// triage handoff); worker agents never get one.
#[async_trait]
pub trait AgentEngine: Send + Sync {
    async fn run(
        &self,
        agent: &Agent,
        task: &str,
        ctx: &RunContext,
        delegator: Option<&Delegator>,
    ) -> Result<String, WorkflowError>;
}
