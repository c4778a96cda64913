use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;

use flowforge_rs::forge::catalog::catalog;
use flowforge_rs::forge::config::AppConfig;
use flowforge_rs::forge::graph::{Topology, WorkflowGraph};
use flowforge_rs::forge::pipeline::{GenerateOptions, Generator};
use flowforge_rs::forge::resolver::resolve;
use flowforge_rs::forge::server;
use flowforge_rs::forge::validator::validate;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML config file (defaults to ./flowforge.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on, overriding the config
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Generate a workflow from a prompt
    Generate {
        /// The automation request
        #[arg(short, long)]
        prompt: String,

        /// Node wiring for the rule engine: linear or fan-out
        #[arg(short, long)]
        topology: Option<Topology>,

        /// Never call the external generator
        #[arg(long)]
        rules_only: bool,

        /// Write the workflow JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Resolve and validate a workflow JSON file
    Validate {
        /// Path to the workflow file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// List the node catalog
    Catalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;

    match args.command {
        Commands::Serve { port } => {
            let mut server_config = config.server.clone();
            if let Some(port) = port {
                server_config.port = port;
            }
            let generator = Generator::from_config(&config)?;
            server::serve(&server_config, generator).await?;
        }
        Commands::Generate {
            prompt,
            topology,
            rules_only,
            output,
        } => {
            let generator = Generator::from_config(&config)?;
            let outcome = generator
                .generate(&prompt, GenerateOptions { topology, rules_only })
                .await?;
            log::info!("Workflow generated via {}", outcome.method);

            let json = serde_json::to_string_pretty(&outcome.workflow)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Workflow written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Commands::Validate { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let candidate: serde_json::Value = serde_json::from_str(&content)?;

            let resolved = resolve(candidate);
            let report = validate(&resolved);
            if !report.valid {
                println!("{} is invalid:", file.display());
                for violation in &report.violations {
                    println!("  - {}", violation);
                }
                std::process::exit(1);
            }

            let graph: WorkflowGraph = serde_json::from_value(resolved)
                .with_context(|| format!("{} does not match the n8n document schema", file.display()))?;
            println!(
                "{} is valid ({} nodes, {} connection sources)",
                file.display(),
                graph.nodes.len(),
                graph.connections.len()
            );
        }
        Commands::Catalog => {
            for desc in catalog().iter() {
                println!(
                    "{:<18} {:<40} {:?}{}",
                    desc.key,
                    desc.wire_type,
                    desc.category,
                    if desc.requires_credential { " (credentials)" } else { "" }
                );
            }
            println!("{} node types", catalog().len());
        }
    }

    Ok(())
}
