//! Runtime agents — live instances assembled once per run.
//!
//! An [`Agent`] combines rendered instructions, a resolved tool set, and
//! optional sub-server connections. Agents are built fresh for every run
//! and exclusively owned by that run's executor: topologies mutate
//! agent-level handoff links, so sharing an agent across concurrent runs
//! would corrupt routing.

pub mod factory;
pub mod instructions;
pub mod subserver;

pub use factory::AgentFactory;
pub use subserver::SubServerConnection;

use crate::tools::CallableTool;

/// A runnable agent. Lives for the duration of one run; whoever destroys
/// it owns closing its sub-server connections.
#[derive(Debug)]
pub struct Agent {
    pub name: String,
    /// Rendered system instructions.
    pub instructions: String,
    /// Model identifier forwarded to the execution engine.
    pub model: String,
    /// Credential reference forwarded to the execution engine.
    pub credential_ref: Option<String>,
    /// Resolved tool handles; empty when the spec declared none.
    pub tools: Vec<CallableTool>,
    /// Open sub-server connections, in spec order.
    pub sub_servers: Vec<SubServerConnection>,
    /// Outbound handoff links (agent names). Set by Chain/Triage wiring,
    /// never by Manager/Single.
    pub handoffs: Vec<String>,
}

impl Agent {
    pub fn new(name: String, instructions: String, model: String) -> Self {
        Self {
            name,
            instructions,
            model,
            credential_ref: None,
            tools: Vec::new(),
            sub_servers: Vec::new(),
            handoffs: Vec::new(),
        }
    }

    pub fn set_handoffs(&mut self, targets: Vec<String>) {
        self.handoffs = targets;
    }

    /// Close every sub-server connection this agent owns.
    pub async fn close(&mut self) {
        for connection in self.sub_servers.drain(..) {
            connection.close().await;
        }
    }
}
