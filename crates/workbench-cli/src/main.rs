//! `workbench` - run hero workbench graphs from the command line
//!
//! Results are persisted under the data directory's `runs/` folder, so
//! `history` and `show` can inspect earlier runs.

mod graph_file;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use node_engine::{
    validate_graph, ChannelEventSink, EngineRunResult, FileRunStore, NodeCategory, NodeRegistry,
    RunContext, RunStore, WorkflowEvent, WorkflowRunner, DEFAULT_WORKFLOW_ID,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use workflow_nodes::services::{
    HeroCatalog, JsonHeroCatalog, LocalWorkspaceService, PreviewRegistry, WorkspaceFileNode,
};
use workflow_nodes::{builtin_registry, Services, ServicesConfig};

use crate::graph_file::load_graph;

/// Hero workbench - typed node graphs that build landing-page heroes
#[derive(Parser)]
#[command(name = "workbench")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Services configuration file (JSON); defaults apply when it is absent
    #[arg(long, global = true, default_value = "workbench.json")]
    config: PathBuf,

    /// Overrides the configured data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a graph (engine JSON or editor snapshot)
    Run {
        graph_file: PathBuf,

        /// Re-run only this node, its dependents and their dependencies
        #[arg(long)]
        from_node: Option<String>,

        #[arg(long, default_value = DEFAULT_WORKFLOW_ID)]
        workflow_id: String,

        /// Keep started previews alive until Ctrl-C
        #[arg(long)]
        serve: bool,
    },

    /// Check a graph without running it
    Validate { graph_file: PathBuf },

    /// List recent runs of a workflow
    History {
        #[arg(long, default_value = DEFAULT_WORKFLOW_ID)]
        workflow_id: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Print a stored run result as JSON
    Show {
        /// Run id; the latest run when omitted
        run_id: Option<String>,

        #[arg(long, default_value = DEFAULT_WORKFLOW_ID)]
        workflow_id: String,
    },

    /// List the built-in node types
    Nodes,

    /// List published heroes
    Heroes,

    /// List the editable files of a hero inside a workspace
    Files { workspace: String, hero_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let mut config = ServicesConfig::load(&cli.config)
        .with_context(|| format!("failed to load config: {}", cli.config.display()))?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let previews = Arc::new(PreviewRegistry::new());
    let services = Services::local(&config, previews.clone())?;
    let registry = Arc::new(builtin_registry(&services));
    let store = FileRunStore::new(config.runs_dir());

    match cli.command {
        Commands::Run {
            graph_file,
            from_node,
            workflow_id,
            serve,
        } => {
            let result = run_graph(
                registry,
                &store,
                &graph_file,
                from_node.as_deref(),
                &workflow_id,
            )
            .await?;
            if serve {
                serve_previews(&previews, &config).await?;
            }
            if !result.is_success() {
                bail!(
                    "run {} finished with {} error(s)",
                    result.run_id,
                    result.errors.len()
                );
            }
        }
        Commands::Validate { graph_file } => {
            let graph = load_graph(&graph_file, &registry).await?;
            let errors = validate_graph(&graph, &registry);
            if errors.is_empty() {
                println!(
                    "Graph is valid ({} nodes, {} edges)",
                    graph.nodes.len(),
                    graph.edges.len()
                );
            } else {
                for error in &errors {
                    println!("{}", error);
                }
                bail!("graph has {} validation error(s)", errors.len());
            }
        }
        Commands::History { workflow_id, limit } => {
            let history = store.get_run_history(&workflow_id, limit).await?;
            if history.is_empty() {
                eprintln!("No runs recorded for {}", workflow_id);
            }
            for item in history {
                println!(
                    "{}  {}  {:<7}  nodes={} ok={} err={}",
                    item.created_at.to_rfc3339(),
                    item.run_id,
                    item.status.as_str(),
                    item.node_count,
                    item.success_count,
                    item.error_count
                );
            }
        }
        Commands::Show {
            run_id,
            workflow_id,
        } => {
            let result = match run_id {
                Some(run_id) => store.get_run_result_by_id(&run_id, &workflow_id).await?,
                None => store.get_latest_run_result(&workflow_id).await?,
            };
            match result {
                Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                None => bail!("no matching run for workflow {}", workflow_id),
            }
        }
        Commands::Nodes => print_nodes(&registry),
        Commands::Heroes => {
            let catalog = JsonHeroCatalog::new(config.catalog_path());
            for hero in catalog.list().await? {
                println!(
                    "{}  {}  {}  {}",
                    hero.id, hero.hero_id, hero.title, hero.preview_url
                );
            }
        }
        Commands::Files { workspace, hero_id } => {
            let service = LocalWorkspaceService::new(config.clone(), previews.clone());
            let tree = service.list_hero_files(&workspace, &hero_id).await?;
            print_tree(&tree, 0);
        }
    }

    Ok(())
}

async fn run_graph(
    registry: Arc<NodeRegistry>,
    store: &FileRunStore,
    graph_file: &Path,
    from_node: Option<&str>,
    workflow_id: &str,
) -> Result<EngineRunResult> {
    let graph = load_graph(graph_file, &registry).await?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let runner = WorkflowRunner::new(registry)
        .with_event_sink(Arc::new(ChannelEventSink::new(events_tx)));
    let progress = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            eprintln!("{}", progress_line(&event));
        }
    });

    let ctx = RunContext::new(Some(workflow_id.to_string()));
    let interrupt = tokio::spawn(watch_interrupts(ctx.cancel.clone()));

    let result = match from_node {
        Some(node_id) => runner.run_from_node_with_context(&graph, node_id, ctx).await,
        None => runner.run_workflow_with_context(&graph, ctx).await,
    };
    interrupt.abort();
    drop(runner);
    if let Err(e) = progress.await {
        log::warn!("Progress reporter stopped: {}", e);
    }

    store
        .persist_run_result(&result)
        .await
        .context("failed to persist run result")?;

    print_summary(&result);
    Ok(result)
}

/// First Ctrl-C cancels the run; a second one exits without waiting
async fn watch_interrupts(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    log::warn!("Interrupt received, cancelling run (press Ctrl-C again to exit)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        log::error!("Second interrupt, exiting");
        std::process::exit(130);
    }
}

fn progress_line(event: &WorkflowEvent) -> String {
    match event {
        WorkflowEvent::RunStarted {
            run_id, node_count, ..
        } => format!("run {} started ({} nodes)", run_id, node_count),
        WorkflowEvent::NodeStarted { node_id, .. } => format!("  ..    {}", node_id),
        WorkflowEvent::NodeCompleted {
            node_id,
            duration_ms,
            ..
        } => format!("  done  {} ({} ms)", node_id, duration_ms),
        WorkflowEvent::NodeFailed { node_id, error, .. } => {
            format!("  fail  {}: {}", node_id, error)
        }
        WorkflowEvent::NodeSkipped { node_id, .. } => format!("  skip  {}", node_id),
        WorkflowEvent::RunCompleted {
            run_id,
            status,
            error_count,
        } => format!(
            "run {} {} ({} error(s))",
            run_id,
            status.as_str(),
            error_count
        ),
    }
}

fn print_summary(result: &EngineRunResult) {
    eprintln!("Run {} finished: {}", result.run_id, result.status.as_str());
    for node_id in &result.executed_node_ids {
        eprintln!("  ok    {}", node_id);
    }
    let mut failed: Vec<_> = result
        .node_states
        .values()
        .filter(|s| s.error.is_some())
        .collect();
    failed.sort_by(|a, b| a.node_id.cmp(&b.node_id));
    for state in failed {
        eprintln!(
            "  {:<5} {}: {}",
            state.status.as_str(),
            state.node_id,
            state.error.as_deref().unwrap_or_default()
        );
    }
    for error in &result.errors {
        eprintln!("error: {}", error);
    }

    let outputs: serde_json::Map<String, serde_json::Value> = result
        .executed_node_ids
        .iter()
        .filter_map(|id| {
            let output = result.node_state(id)?.output.as_ref()?;
            Some((id.clone(), serde_json::to_value(output).ok()?))
        })
        .collect();
    match serde_json::to_string_pretty(&outputs) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to render outputs: {}", e),
    }
}

/// Wait for Ctrl-C, then stop every preview this process started
async fn serve_previews(previews: &PreviewRegistry, config: &ServicesConfig) -> Result<()> {
    if previews.is_empty() {
        return Ok(());
    }
    for workspace in previews.workspaces() {
        if let Some(info) = previews.get(&workspace) {
            eprintln!("Serving {} (pid {})", info.url, info.pid);
        }
    }
    eprintln!("Press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    let grace = Duration::from_millis(config.preview.stop_grace_ms);
    for workspace in previews.workspaces() {
        if let Some(process) = previews.remove(&workspace) {
            log::info!("Stopping preview for {:?}", workspace);
            if let Err(e) = process.stop(grace).await {
                log::warn!("Failed to stop preview for {:?}: {}", workspace, e);
            }
        }
    }
    Ok(())
}

fn print_nodes(registry: &NodeRegistry) {
    let by_category = registry.metadata_by_category();
    for category in NodeCategory::ALL {
        let Some(nodes) = by_category.get(&category) else {
            continue;
        };
        println!("[{}]", category.as_str());
        let mut nodes = nodes.clone();
        nodes.sort_by(|a, b| a.node_type.cmp(&b.node_type));
        for meta in nodes {
            let ports = |ports: &[node_engine::PortMetadata]| {
                ports
                    .iter()
                    .map(|p| {
                        let marker = if p.required { "" } else { "?" };
                        format!("{}{}:{}", p.id, marker, p.data_type.as_str())
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!(
                "  {:<20} {:<18} ({}) -> ({})",
                meta.node_type,
                meta.label,
                ports(&meta.inputs),
                ports(&meta.outputs)
            );
        }
    }
}

fn print_tree(nodes: &[WorkspaceFileNode], depth: usize) {
    for node in nodes {
        println!("{}{}", "  ".repeat(depth), node.name);
        if let Some(children) = &node.children {
            print_tree(children, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use node_engine::RunStatus;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::parse_from([
            "workbench",
            "--data-dir",
            "/srv/hero",
            "run",
            "graph.json",
            "--from-node",
            "hero",
        ]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/srv/hero")));
        match cli.command {
            Commands::Run {
                graph_file,
                from_node,
                workflow_id,
                serve,
            } => {
                assert_eq!(graph_file, PathBuf::from("graph.json"));
                assert_eq!(from_node.as_deref(), Some("hero"));
                assert_eq!(workflow_id, DEFAULT_WORKFLOW_ID);
                assert!(!serve);
            }
            _ => panic!("expected run"),
        }
    }

    #[tokio::test]
    async fn test_run_graph_persists_result() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = ServicesConfig::with_data_dir(temp.path());
        let services = Services::local(&config, Arc::new(PreviewRegistry::new())).unwrap();
        let registry = Arc::new(builtin_registry(&services));
        let store = FileRunStore::new(config.runs_dir());

        let graph_path = temp.path().join("graph.json");
        std::fs::write(
            &graph_path,
            r#"{
                "nodes": [
                    {"id": "p", "data": {"kind": "prompt", "config": {"text": "Launch banner"}}},
                    {"id": "h", "data": {"kind": "generateHero"}}
                ],
                "edges": [{"source": "p", "target": "h",
                           "sourceHandle": "output:text:text", "targetHandle": "input:text:text"}]
            }"#,
        )
        .unwrap();

        let result = run_graph(registry, &store, &graph_path, None, "cli-test")
            .await
            .unwrap();
        assert!(result.is_success(), "{:?}", result.errors);

        let history = store.get_run_history("cli-test", 5).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].run_id, result.run_id);
        assert_eq!(history[0].success_count, 2);
    }

    #[test]
    fn test_progress_lines() {
        let failed = WorkflowEvent::NodeFailed {
            run_id: "r1".to_string(),
            node_id: "apply".to_string(),
            error: "Run cancelled.".to_string(),
        };
        assert_eq!(progress_line(&failed), "  fail  apply: Run cancelled.");

        let done = WorkflowEvent::RunCompleted {
            run_id: "r1".to_string(),
            status: RunStatus::Error,
            error_count: 1,
        };
        assert_eq!(progress_line(&done), "run r1 error (1 error(s))");
    }
}
