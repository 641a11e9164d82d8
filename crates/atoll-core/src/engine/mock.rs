//! Deterministic engines for tests and offline dry-runs.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::agent::Agent;
use crate::engine::{AgentEngine, RunContext};
use crate::error::WorkflowError;
use crate::workflow::executor::Delegator;

/// One recorded engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCall {
    pub agent: String,
    pub task: String,
    /// Handoff links the invoked agent carried at call time.
    pub handoffs: Vec<String>,
}

/// Returns `"{agent}: {task}"` for every invocation.
#[derive(Debug, Default)]
pub struct EchoEngine;

#[async_trait]
impl AgentEngine for EchoEngine {
    async fn run(
        &self,
        agent: &Agent,
        task: &str,
        _ctx: &RunContext,
        _delegator: Option<&Delegator>,
    ) -> Result<String, WorkflowError> {
        Ok(format!("{}: {}", agent.name, task))
    }
}

/// Returns a fixed output per agent name and records every call; agents
/// in the failure set return an invocation error instead.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    outputs: HashMap<String, String>,
    default_output: String,
    failures: HashSet<String>,
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl ScriptedEngine {
    pub fn new(default_output: impl Into<String>) -> Self {
        Self {
            default_output: default_output.into(),
            ..Default::default()
        }
    }

    pub fn with_output(mut self, agent: impl Into<String>, output: impl Into<String>) -> Self {
        self.outputs.insert(agent.into(), output.into());
        self
    }

    pub fn with_failure(mut self, agent: impl Into<String>) -> Self {
        self.failures.insert(agent.into());
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentEngine for ScriptedEngine {
    async fn run(
        &self,
        agent: &Agent,
        task: &str,
        _ctx: &RunContext,
        _delegator: Option<&Delegator>,
    ) -> Result<String, WorkflowError> {
        self.calls.lock().unwrap().push(EngineCall {
            agent: agent.name.clone(),
            task: task.to_string(),
            handoffs: agent.handoffs.clone(),
        });

        if self.failures.contains(&agent.name) {
            return Err(WorkflowError::AgentInvocation {
                agent: agent.name.clone(),
                reason: "scripted failure".to_string(),
            });
        }

        Ok(self
            .outputs
            .get(&agent.name)
            .cloned()
            .unwrap_or_else(|| self.default_output.clone()))
    }
}

/// For coordinator agents (those handed a [`Delegator`]) this engine
/// plays a fixed delegation script; unknown-agent failures are noted and
/// the script continues. Worker agents get echo behavior.
#[derive(Debug, Default)]
pub struct DelegatingEngine {
    script: Vec<(String, String)>,
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl DelegatingEngine {
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            script: script
                .into_iter()
                .map(|(a, t)| (a.into(), t.into()))
                .collect(),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentEngine for DelegatingEngine {
    async fn run(
        &self,
        agent: &Agent,
        task: &str,
        _ctx: &RunContext,
        delegator: Option<&Delegator>,
    ) -> Result<String, WorkflowError> {
        self.calls.lock().unwrap().push(EngineCall {
            agent: agent.name.clone(),
            task: task.to_string(),
            handoffs: agent.handoffs.clone(),
        });

        let Some(delegator) = delegator else {
            return Ok(format!("{}: {}", agent.name, task));
        };

        let mut notes = Vec::with_capacity(self.script.len());
        for (target, sub_task) in &self.script {
            match delegator.delegate(target, sub_task).await {
                Ok(output) => notes.push(output),
                Err(WorkflowError::UnknownAgent(name)) => {
                    notes.push(format!("unknown agent {}", name));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(notes.join("\n"))
    }
}
