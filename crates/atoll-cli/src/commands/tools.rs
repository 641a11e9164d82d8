//! `atoll tools` — list resolvable tool identifiers.

use atoll_core::tools::ToolCatalog;

pub async fn execute() -> Result<(), String> {
    let catalog = super::demo_catalog();
    for identifier in catalog.identifiers().await {
        println!("{}", identifier);
    }
    Ok(())
}
