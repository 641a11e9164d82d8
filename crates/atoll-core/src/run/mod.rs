//! Run supervisor — owns run lifecycles.
//!
//! `submit` registers a pending run and spawns its execution on the
//! runtime; the caller polls `status` and collects the outcome with
//! `result`. A successfully collected result evicts the run, so each
//! result is handed out exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::engine::RunContext;
use crate::error::WorkflowError;
use crate::trace::{Trace, TraceEmitter, TraceStatus};
use crate::workflow::builder::WorkflowBuilder;
use crate::workflow::executor::TopologyExecutor;
use crate::workflow::schema::WorkflowConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
struct Run {
    status: RunStatus,
    result: Option<String>,
}

pub struct RunSupervisor {
    runs: Arc<RwLock<HashMap<Uuid, Run>>>,
    builder: Arc<WorkflowBuilder>,
    executor: Arc<TopologyExecutor>,
    emitter: Option<Arc<TraceEmitter>>,
}

impl RunSupervisor {
    pub fn new(builder: WorkflowBuilder, executor: TopologyExecutor) -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
            builder: Arc::new(builder),
            executor: Arc::new(executor),
            emitter: None,
        }
    }

    pub fn with_emitter(mut self, emitter: Arc<TraceEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Register a run and spawn its execution. Returns immediately with
    /// the run id; the run starts as `Pending` and moves to `Running`
    /// once the spawned task picks it up.
    pub async fn submit(
        &self,
        config: WorkflowConfig,
        user_task: String,
        user_id: String,
    ) -> Uuid {
        let run_id = Uuid::new_v4();
        self.runs.write().await.insert(
            run_id,
            Run {
                status: RunStatus::Pending,
                result: None,
            },
        );

        let runs = Arc::clone(&self.runs);
        let builder = Arc::clone(&self.builder);
        let executor = Arc::clone(&self.executor);
        let emitter = self.emitter.clone();

        tokio::spawn(async move {
            if let Some(run) = runs.write().await.get_mut(&run_id) {
                run.status = RunStatus::Running;
            }

            let ctx = RunContext::new(run_id, user_id.clone());
            if let Some(emitter) = &emitter {
                emitter
                    .on_trace_start(Trace::started(run_id, config.objective.clone(), user_id))
                    .await;
            }

            let outcome = match builder.build(&config, &ctx.user_id).await {
                Ok(built) => {
                    executor
                        .execute(built, config.topology, &user_task, &ctx)
                        .await
                }
                Err(e) => Err(e),
            };

            if let Some(emitter) = &emitter {
                let status = match &outcome {
                    Ok(_) => TraceStatus::Completed,
                    Err(_) => TraceStatus::Failed,
                };
                emitter.on_trace_end(run_id, status).await;
            }

            let mut runs = runs.write().await;
            if let Some(run) = runs.get_mut(&run_id) {
                match outcome {
                    Ok(output) => {
                        tracing::info!("[RunSupervisor] Run {} completed", run_id);
                        run.status = RunStatus::Completed;
                        run.result = Some(output);
                    }
                    Err(e) => {
                        tracing::warn!("[RunSupervisor] Run {} failed: {}", run_id, e);
                        run.status = RunStatus::Failed;
                        run.result = Some(e.to_string());
                    }
                }
            }
        });

        run_id
    }

    pub async fn status(&self, run_id: Uuid) -> Option<RunStatus> {
        self.runs.read().await.get(&run_id).map(|run| run.status)
    }

    /// Collect the outcome of a finished run, evicting it. A `Failed`
    /// run yields its error text; pending and running runs are not yet
    /// collectable.
    pub async fn result(&self, run_id: Uuid) -> Result<String, WorkflowError> {
        let mut runs = self.runs.write().await;
        let run = runs.get(&run_id).ok_or(WorkflowError::RunNotFound(run_id))?;

        match run.status {
            RunStatus::Pending | RunStatus::Running => {
                Err(WorkflowError::RunNotCompleted(run_id))
            }
            RunStatus::Completed | RunStatus::Failed => {
                let run = runs.remove(&run_id).ok_or(WorkflowError::RunNotFound(run_id))?;
                match (run.status, run.result) {
                    (RunStatus::Completed, Some(output)) => Ok(output),
                    (_, detail) => Err(WorkflowError::Execution(
                        detail.unwrap_or_else(|| "run failed".to_string()),
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::agent::AgentFactory;
    use crate::engine::mock::EchoEngine;
    use crate::tools::StaticToolCatalog;
    use crate::workflow::schema::{AgentSpec, Topology};

    fn supervisor() -> RunSupervisor {
        let factory = AgentFactory::new(Arc::new(StaticToolCatalog::new()));
        RunSupervisor::new(
            WorkflowBuilder::new(factory),
            TopologyExecutor::new(Arc::new(EchoEngine)),
        )
    }

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            objective: "test".to_string(),
            topology: Topology::Single,
            model_name: "test-model".to_string(),
            credential_ref: None,
            agents: vec![AgentSpec {
                name: "worker".to_string(),
                persona: "a helper".to_string(),
                task: String::new(),
                expected_input: String::new(),
                expected_output: String::new(),
                guidelines: Vec::new(),
                tool_identifiers: Vec::new(),
                sub_servers: Vec::new(),
                context: serde_json::Map::new(),
            }],
        }
    }

    async fn wait_for_finish(supervisor: &RunSupervisor, run_id: Uuid) -> RunStatus {
        for _ in 0..200 {
            match supervisor.status(run_id).await {
                Some(RunStatus::Completed) => return RunStatus::Completed,
                Some(RunStatus::Failed) => return RunStatus::Failed,
                Some(_) => tokio::time::sleep(Duration::from_millis(5)).await,
                None => panic!("run disappeared"),
            }
        }
        panic!("run did not finish");
    }

    #[tokio::test]
    async fn test_submit_status_result_evict() {
        let supervisor = supervisor();
        let run_id = supervisor
            .submit(config(), "do it".to_string(), "user-1".to_string())
            .await;

        assert_eq!(wait_for_finish(&supervisor, run_id).await, RunStatus::Completed);
        assert_eq!(supervisor.result(run_id).await.unwrap(), "worker: do it");

        // Collected results are handed out exactly once.
        assert!(supervisor.status(run_id).await.is_none());
        assert!(matches!(
            supervisor.result(run_id).await,
            Err(WorkflowError::RunNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_build_marks_run_failed() {
        let supervisor = supervisor();
        let mut config = config();
        config.agents.clear();
        let run_id = supervisor
            .submit(config, "task".to_string(), "user-1".to_string())
            .await;

        assert_eq!(wait_for_finish(&supervisor, run_id).await, RunStatus::Failed);
        let err = supervisor.result(run_id).await.unwrap_err();
        assert!(err.to_string().contains("no agents"));
    }
}
