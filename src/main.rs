use clap::{Parser, Subcommand};
use dotenv::dotenv;
use loopflow::engine::{AppConfig, WorkflowState};
use loopflow::server::{self, AppState};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Execute one run and print its record
    Run {
        /// Graph to run (defaults to the configured default graph)
        #[arg(short, long)]
        graph: Option<String>,

        /// JSON object laid over the graph's default state
        #[arg(short, long)]
        state: Option<String>,
    },
    /// List registered graphs
    Graphs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;
    let runner = loopflow::build_runner(&config)?;

    match args.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            server::serve(
                port,
                AppState {
                    runner,
                    default_graph: config.default_graph.clone(),
                },
            )
            .await?;
        }
        Commands::Run { graph, state } => {
            let graph_id = graph.unwrap_or_else(|| config.default_graph.clone());
            let overrides = match state {
                Some(raw) => Some(WorkflowState::from_json(serde_json::from_str(&raw)?)?),
                None => None,
            };

            log::info!("Running graph: {}", graph_id);
            let run_id = runner.start(&graph_id, overrides).await?;
            let record = runner.result(&run_id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Graphs => {
            for graph in runner.graphs().graphs() {
                println!("{}\t{}", graph.id(), graph.description());
                let missing = graph.unresolved_nodes(runner.registry());
                if !missing.is_empty() {
                    println!("\tunregistered nodes: {}", missing.join(", "));
                }
            }
        }
    }

    Ok(())
}
