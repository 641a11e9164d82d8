//! Core error type for the Atoll workflow engine.
//!
//! `WorkflowError` is used throughout the core domain (builder, executor,
//! run supervisor). Build-phase errors abort a run before any agent
//! executes; execution-phase errors abort only the run they belong to.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Malformed workflow configuration. The run never starts.
    #[error("Invalid workflow config: {0}")]
    Config(String),

    /// A tool identifier could not be resolved against the catalog, or
    /// the user is not authorized for it.
    #[error("Tool resolution failed: {0}")]
    ToolResolution(String),

    /// Connecting a single sub-server failed. Wrapped into `AgentBuild`
    /// before it leaves the factory.
    #[error("Sub-server '{name}' connection failed: {reason}")]
    SubServerConnect { name: String, reason: String },

    /// Building one agent failed; the whole batch is torn down.
    #[error("Failed to build agent '{agent}': {reason}")]
    AgentBuild { agent: String, reason: String },

    /// Delegation named an agent that is not in the run's agent map.
    /// Recoverable at the manager-tool-call level.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// An agent's underlying invocation failed. Aborts the run.
    #[error("Agent '{agent}' invocation failed: {reason}")]
    AgentInvocation { agent: String, reason: String },

    /// The topology is recognized but intentionally unimplemented.
    #[error("Topology '{0}' is not supported")]
    Unsupported(String),

    /// A topology precondition was violated.
    #[error("Topology execution failed: {0}")]
    Execution(String),

    /// `result()` was called while the run is still pending or running.
    #[error("Run {0} is not completed")]
    RunNotCompleted(Uuid),

    /// The run id is unknown or its result was already collected.
    #[error("Run not found: {0}")]
    RunNotFound(Uuid),
}
