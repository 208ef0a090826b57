// SPDX-License-Identifier: MIT

pub mod engine;
pub mod review;
pub mod server;

use std::path::Path;
use std::sync::Arc;

use engine::{
    AppConfig, EngineError, GraphCatalog, GraphLoader, InMemoryRunStore, NodeRegistry,
    WorkflowRunner,
};

/// Wire the built-in review workflow, plus any graphs found in
/// `config.graphs_dir`, into a runner backed by an in-memory run store
pub fn build_runner(config: &AppConfig) -> Result<WorkflowRunner, EngineError> {
    let start = config.runner.start_node.as_str();

    let mut registry = NodeRegistry::new();
    review::register_nodes(&mut registry)?;

    let mut catalog = GraphCatalog::new();
    catalog.register(review::graph(start)?)?;

    if let Some(dir) = &config.graphs_dir {
        load_graphs(dir, start, &mut catalog)?;
    }

    for graph in catalog.graphs() {
        let missing = graph.unresolved_nodes(&registry);
        if !missing.is_empty() {
            log::warn!(
                "Graph '{}' points at unregistered nodes: {:?}",
                graph.id(),
                missing
            );
        }
    }

    Ok(WorkflowRunner::new(
        Arc::new(catalog),
        Arc::new(registry),
        Arc::new(InMemoryRunStore::new()),
        config.runner.clone(),
    ))
}

fn load_graphs(
    dir: &Path,
    start: &str,
    catalog: &mut GraphCatalog,
) -> Result<(), EngineError> {
    let count = GraphLoader::new(start).load_dir(dir, catalog)?;
    log::info!("Loaded {} graphs from {}", count, dir.display());
    Ok(())
}
