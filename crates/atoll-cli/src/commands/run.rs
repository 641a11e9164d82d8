//! `atoll run` — submit a workflow and wait for its result.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use atoll_core::agent::AgentFactory;
use atoll_core::engine::mock::EchoEngine;
use atoll_core::engine::{AgentEngine, HttpEngine, HttpEngineConfig};
use atoll_core::run::{RunStatus, RunSupervisor};
use atoll_core::trace::{JsonlTraceSink, TraceEmitter};
use atoll_core::workflow::{TopologyExecutor, WorkflowBuilder};
use atoll_core::WorkflowConfig;

pub async fn execute(
    file: &str,
    task: &str,
    user_id: &str,
    trace_dir: Option<&Path>,
    offline: bool,
) -> Result<(), String> {
    let config = WorkflowConfig::from_file(file).map_err(|e| e.to_string())?;

    let engine: Arc<dyn AgentEngine> = if offline {
        Arc::new(EchoEngine)
    } else {
        let api_key = std::env::var("ATOLL_API_KEY")
            .map_err(|_| "ATOLL_API_KEY is not set (use --offline for a dry run)".to_string())?;
        let base_url = std::env::var("ATOLL_BASE_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com".to_string());
        Arc::new(
            HttpEngine::new(HttpEngineConfig {
                base_url,
                api_key,
                ..HttpEngineConfig::default()
            })
            .map_err(|e| e.to_string())?,
        )
    };

    let builder = WorkflowBuilder::new(AgentFactory::new(Arc::new(super::demo_catalog())));
    let mut executor = TopologyExecutor::new(engine);

    let emitter = trace_dir
        .map(|dir| Arc::new(TraceEmitter::new(Arc::new(JsonlTraceSink::new(dir)))));
    if let Some(emitter) = &emitter {
        executor = executor.with_emitter(Arc::clone(emitter));
    }

    let mut supervisor = RunSupervisor::new(builder, executor);
    if let Some(emitter) = emitter {
        supervisor = supervisor.with_emitter(emitter);
    }

    let run_id = supervisor
        .submit(config, task.to_string(), user_id.to_string())
        .await;
    println!("Submitted run {}", run_id);

    loop {
        match supervisor.status(run_id).await {
            Some(RunStatus::Pending) | Some(RunStatus::Running) => {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Some(RunStatus::Completed) | Some(RunStatus::Failed) => break,
            None => return Err(format!("run {} disappeared", run_id)),
        }
    }

    let output = supervisor.result(run_id).await.map_err(|e| e.to_string())?;
    println!("{}", output);
    Ok(())
}
