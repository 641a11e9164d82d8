//! `atoll validate` — parse and validate a workflow file.

use atoll_core::agent::SubServerConnection;
use atoll_core::WorkflowConfig;

pub async fn execute(file: &str, probe: bool) -> Result<(), String> {
    let config = WorkflowConfig::from_file(file).map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.to_string())?;

    println!("{} is valid", file);
    println!("  objective: {}", config.objective);
    println!("  topology:  {}", config.topology);
    println!("  model:     {}", config.model_name);
    println!("  agents:    {}", config.agents.len());
    for agent in &config.agents {
        println!(
            "    {} ({} tool(s), {} sub-server(s))",
            agent.name,
            agent.tool_identifiers.len(),
            agent.sub_servers.len()
        );
    }

    if probe {
        probe_sub_servers(&config).await?;
    }
    Ok(())
}

/// Connect to every declared sub-server and list the tools it exposes.
/// Any unreachable sub-server fails the validation.
async fn probe_sub_servers(config: &WorkflowConfig) -> Result<(), String> {
    for agent in &config.agents {
        for spec in &agent.sub_servers {
            let connection = SubServerConnection::connect(spec).map_err(|e| e.to_string())?;
            let tools = connection.list_tools().await.map_err(|e| e.to_string())?;
            println!(
                "  sub-server {} ({}): {}",
                spec.name,
                spec.kind,
                if tools.is_empty() {
                    "no tools".to_string()
                } else {
                    tools.join(", ")
                }
            );
            connection.close().await;
        }
    }
    Ok(())
}
