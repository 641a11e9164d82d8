//! Workflow definition, assembly, and execution.
//!
//! `schema` holds the declarative config, `builder` turns a validated
//! config into built agents, and `executor` runs the built workflow
//! under its topology.

pub mod builder;
pub mod executor;
pub mod schema;

pub use builder::{BuiltWorkflow, WorkflowBuilder};
pub use executor::{Delegator, TopologyExecutor};
pub use schema::{AgentSpec, SubServerKind, SubServerSpec, Topology, WorkflowConfig};
