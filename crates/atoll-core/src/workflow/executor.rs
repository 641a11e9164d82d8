//! Topology executor — runs a built workflow under its interaction
//! pattern.
//!
//! Manager and Triage create an ephemeral coordinator agent that exists
//! only for the run and delegates through a [`Delegator`]. Chain and
//! Single invoke the built agents directly. Whatever the outcome, the
//! executor closes every agent's sub-server connections before
//! returning.

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::Agent;
use crate::engine::{AgentEngine, RunContext};
use crate::error::WorkflowError;
use crate::trace::{Span, TraceEmitter};
use crate::workflow::builder::BuiltWorkflow;
use crate::workflow::schema::Topology;

/// Delegation handle passed to coordinator agents. Lookup failures
/// surface as [`WorkflowError::UnknownAgent`] so the coordinator can
/// decide whether to continue.
#[derive(Clone)]
pub struct Delegator {
    agents: Arc<HashMap<String, Agent>>,
    engine: Arc<dyn AgentEngine>,
    emitter: Option<Arc<TraceEmitter>>,
    ctx: RunContext,
}

impl Delegator {
    /// Run `task` through the named agent and return its output.
    pub async fn delegate(&self, target: &str, task: &str) -> Result<String, WorkflowError> {
        let agent = self
            .agents
            .get(target)
            .ok_or_else(|| WorkflowError::UnknownAgent(target.to_string()))?;

        tracing::info!("[Executor] Delegating to '{}'", target);
        invoke_agent(&*self.engine, self.emitter.as_deref(), agent, task, &self.ctx, None).await
    }
}

/// Run one agent invocation, traced as a span when an emitter is wired.
/// Engine errors are wrapped as [`WorkflowError::AgentInvocation`] with
/// the agent's name unless the engine already produced one.
async fn invoke_agent(
    engine: &dyn AgentEngine,
    emitter: Option<&TraceEmitter>,
    agent: &Agent,
    task: &str,
    ctx: &RunContext,
    delegator: Option<&Delegator>,
) -> Result<String, WorkflowError> {
    let mut span = Span::started(ctx.run_id, &agent.name, task);
    if let Some(emitter) = emitter {
        emitter.on_span_start(&span).await;
    }

    let result = engine.run(agent, task, ctx, delegator).await.map_err(|e| match e {
        invocation @ WorkflowError::AgentInvocation { .. } => invocation,
        other => WorkflowError::AgentInvocation {
            agent: agent.name.clone(),
            reason: other.to_string(),
        },
    });

    match &result {
        Ok(output) => span.complete(output),
        Err(e) => span.fail(&e.to_string()),
    }
    if let Some(emitter) = emitter {
        emitter.on_span_end(span).await;
    }

    result
}

pub struct TopologyExecutor {
    engine: Arc<dyn AgentEngine>,
    emitter: Option<Arc<TraceEmitter>>,
}

impl TopologyExecutor {
    pub fn new(engine: Arc<dyn AgentEngine>) -> Self {
        Self {
            engine,
            emitter: None,
        }
    }

    pub fn with_emitter(mut self, emitter: Arc<TraceEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Execute the built workflow and return the final text output. All
    /// agent sub-server connections are closed before this returns.
    pub async fn execute(
        &self,
        mut built: BuiltWorkflow,
        topology: Topology,
        user_task: &str,
        ctx: &RunContext,
    ) -> Result<String, WorkflowError> {
        if built.agents.is_empty() {
            return Err(WorkflowError::Execution(
                "built workflow has no agents".to_string(),
            ));
        }

        tracing::info!(
            "[Executor] Running topology '{}' with {} agent(s)",
            topology,
            built.order.len()
        );

        let result = match topology {
            Topology::Manager => {
                self.run_coordinator(&mut built, "manager", false, user_task, ctx).await
            }
            Topology::Triage => {
                self.run_coordinator(&mut built, "handoff", true, user_task, ctx).await
            }
            Topology::Chain => self.run_chain(&mut built, user_task, ctx).await,
            Topology::Single => self.run_single(&built, user_task, ctx).await,
            Topology::GroupChat => Err(WorkflowError::Unsupported("group-chat".to_string())),
        };

        for (_, mut agent) in built.agents.drain() {
            agent.close().await;
        }

        result
    }

    /// Manager and Triage: an ephemeral coordinator delegates into the
    /// built agents. The coordinator itself is never part of the map and
    /// its name may collide with nothing. Only Triage pre-wires handoff
    /// links; the manager's sole capability is the delegation tool.
    async fn run_coordinator(
        &self,
        built: &mut BuiltWorkflow,
        name: &str,
        wire_handoffs: bool,
        user_task: &str,
        ctx: &RunContext,
    ) -> Result<String, WorkflowError> {
        let mut coordinator = Agent::new(
            name.to_string(),
            built.overview.clone(),
            built.model_name.clone(),
        );
        if wire_handoffs {
            coordinator.set_handoffs(built.order.clone());
        }

        // Agents move behind an Arc for the duration of the coordinator
        // invocation so the delegator can reach them; the executor still
        // owns teardown afterwards.
        let agents = Arc::new(std::mem::take(&mut built.agents));
        let delegator = Delegator {
            agents: Arc::clone(&agents),
            engine: Arc::clone(&self.engine),
            emitter: self.emitter.clone(),
            ctx: ctx.clone(),
        };

        let result = invoke_agent(
            &*self.engine,
            self.emitter.as_deref(),
            &coordinator,
            user_task,
            ctx,
            Some(&delegator),
        )
        .await;

        drop(delegator);
        built.agents = Arc::try_unwrap(agents).unwrap_or_default();

        result
    }

    /// Chain: agents run strictly in config order, each step's output
    /// wrapped into the next step's task. The first failure aborts the
    /// chain.
    async fn run_chain(
        &self,
        built: &mut BuiltWorkflow,
        user_task: &str,
        ctx: &RunContext,
    ) -> Result<String, WorkflowError> {
        let order = built.order.clone();
        for window in order.windows(2) {
            if let Some(agent) = built.agents.get_mut(&window[0]) {
                agent.set_handoffs(vec![window[1].clone()]);
            }
        }

        let mut current = user_task.to_string();
        let mut previous: Option<&str> = None;
        for name in &order {
            let agent = built
                .agents
                .get(name)
                .ok_or_else(|| WorkflowError::UnknownAgent(name.clone()))?;

            let task = match previous {
                None => current.clone(),
                Some(prev) => format!(
                    "Previous step output from {}: {}\n\nYour task: Continue the workflow by processing this output.",
                    prev, current
                ),
            };

            current = invoke_agent(
                &*self.engine,
                self.emitter.as_deref(),
                agent,
                &task,
                ctx,
                None,
            )
            .await?;
            previous = Some(name);
        }

        Ok(current)
    }

    /// Single: exactly the first agent in config order runs the task.
    async fn run_single(
        &self,
        built: &BuiltWorkflow,
        user_task: &str,
        ctx: &RunContext,
    ) -> Result<String, WorkflowError> {
        let name = &built.order[0];
        let agent = built
            .agents
            .get(name)
            .ok_or_else(|| WorkflowError::UnknownAgent(name.clone()))?;

        invoke_agent(
            &*self.engine,
            self.emitter.as_deref(),
            agent,
            user_task,
            ctx,
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentFactory;
    use crate::engine::mock::{DelegatingEngine, EchoEngine, ScriptedEngine};
    use crate::tools::StaticToolCatalog;
    use crate::workflow::builder::WorkflowBuilder;
    use crate::workflow::schema::{AgentSpec, WorkflowConfig};
    use uuid::Uuid;

    fn spec(name: &str) -> AgentSpec {
        AgentSpec {
            name: name.to_string(),
            persona: format!("{} persona", name),
            task: String::new(),
            expected_input: String::new(),
            expected_output: String::new(),
            guidelines: Vec::new(),
            tool_identifiers: Vec::new(),
            sub_servers: Vec::new(),
            context: serde_json::Map::new(),
        }
    }

    async fn build(topology: Topology, agents: Vec<AgentSpec>) -> BuiltWorkflow {
        let builder = WorkflowBuilder::new(AgentFactory::new(Arc::new(StaticToolCatalog::new())));
        let config = WorkflowConfig {
            objective: "test".to_string(),
            topology,
            model_name: "test-model".to_string(),
            credential_ref: None,
            agents,
        };
        builder.build(&config, "user-1").await.unwrap()
    }

    fn ctx() -> RunContext {
        RunContext::new(Uuid::new_v4(), "user-1")
    }

    #[tokio::test]
    async fn test_single_runs_first_agent_only() {
        let built = build(Topology::Single, vec![spec("first"), spec("second")]).await;
        let engine = Arc::new(ScriptedEngine::new("out"));
        let executor = TopologyExecutor::new(engine.clone());
        let output = executor
            .execute(built, Topology::Single, "do it", &ctx())
            .await
            .unwrap();
        assert_eq!(output, "out");
        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].agent, "first");
        assert_eq!(calls[0].task, "do it");
    }

    #[tokio::test]
    async fn test_chain_wraps_previous_output() {
        let built = build(Topology::Chain, vec![spec("a"), spec("b")]).await;
        let executor = TopologyExecutor::new(Arc::new(EchoEngine));
        let output = executor
            .execute(built, Topology::Chain, "start", &ctx())
            .await
            .unwrap();
        assert_eq!(
            output,
            "b: Previous step output from a: a: start\n\nYour task: Continue the workflow by processing this output."
        );
    }

    #[tokio::test]
    async fn test_chain_aborts_on_first_failure() {
        let built = build(Topology::Chain, vec![spec("a"), spec("b"), spec("c")]).await;
        let engine = Arc::new(ScriptedEngine::new("out").with_failure("b"));
        let executor = TopologyExecutor::new(engine.clone());
        let err = executor
            .execute(built, Topology::Chain, "start", &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AgentInvocation { ref agent, .. } if agent == "b"));
        let calls = engine.calls();
        let invoked: Vec<&str> = calls.iter().map(|c| c.agent.as_str()).collect();
        assert_eq!(invoked, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_manager_delegates_and_survives_unknown_agent() {
        let built = build(Topology::Manager, vec![spec("worker")]).await;
        let engine = Arc::new(DelegatingEngine::new([
            ("worker", "subtask one"),
            ("ghost", "subtask two"),
            ("worker", "subtask three"),
        ]));
        let executor = TopologyExecutor::new(engine.clone());
        let output = executor
            .execute(built, Topology::Manager, "big task", &ctx())
            .await
            .unwrap();
        assert_eq!(
            output,
            "worker: subtask one\nunknown agent ghost\nworker: subtask three"
        );
        let coordinator = &engine.calls()[0];
        assert_eq!(coordinator.agent, "manager");
        // The manager's only capability is delegation; it carries no
        // handoff links.
        assert!(coordinator.handoffs.is_empty());
    }

    #[tokio::test]
    async fn test_triage_coordinator_has_full_fanout() {
        let built = build(Topology::Triage, vec![spec("a"), spec("b")]).await;
        let engine = Arc::new(DelegatingEngine::new([("b", "routed task")]));
        let executor = TopologyExecutor::new(engine.clone());
        let output = executor
            .execute(built, Topology::Triage, "route me", &ctx())
            .await
            .unwrap();
        assert_eq!(output, "b: routed task");
        let coordinator = &engine.calls()[0];
        assert_eq!(coordinator.agent, "handoff");
        assert_eq!(coordinator.handoffs, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_group_chat_unsupported() {
        let built = build(Topology::GroupChat, vec![spec("a")]).await;
        let executor = TopologyExecutor::new(Arc::new(EchoEngine));
        let err = executor
            .execute(built, Topology::GroupChat, "task", &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unsupported(_)));
        assert!(err.to_string().contains("group-chat"));
    }
}
