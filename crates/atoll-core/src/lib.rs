//! Atoll — dynamic assembly and execution of agent workflows.
//!
//! A workflow is a declarative config (objective, topology, agent
//! specs). The core assembles runnable agents from it, executes them
//! under the configured topology (manager, chain, triage, single), and
//! supervises runs with trace-level observability.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use atoll_core::agent::AgentFactory;
//! use atoll_core::engine::mock::EchoEngine;
//! use atoll_core::tools::StaticToolCatalog;
//! use atoll_core::workflow::{TopologyExecutor, WorkflowBuilder, WorkflowConfig};
//! use atoll_core::RunSupervisor;
//!
//! # async fn demo() -> Result<(), atoll_core::WorkflowError> {
//! let config = WorkflowConfig::from_file("workflow.json")?;
//! let builder = WorkflowBuilder::new(AgentFactory::new(Arc::new(StaticToolCatalog::new())));
//! let executor = TopologyExecutor::new(Arc::new(EchoEngine));
//! let supervisor = RunSupervisor::new(builder, executor);
//! let run_id = supervisor
//!     .submit(config, "summarize the repo".into(), "user-1".into())
//!     .await;
//! # let _ = run_id;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod engine;
pub mod error;
pub mod run;
pub mod tools;
pub mod trace;
pub mod workflow;

pub use error::WorkflowError;
pub use run::{RunStatus, RunSupervisor};
pub use workflow::schema::{AgentSpec, SubServerSpec, Topology, WorkflowConfig};
