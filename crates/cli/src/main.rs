//! GPU Workload Manager CLI
//!
//! A command-line tool for submitting, inspecting and deleting GPU
//! workloads (training, inference, notebook, compute) on a cluster.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{delete, describe, list, submit};

/// GPU Workload Manager CLI
#[derive(Parser)]
#[command(name = "gwm")]
#[command(author, version, about = "CLI for GPU Workload Manager", long_about = None)]
pub struct Cli {
    /// Target namespace (defaults to the configured namespace)
    #[arg(long, short, env = "GWM_NAMESPACE", global = true)]
    pub namespace: Option<String>,

    /// Output format (defaults to the configured format, else table)
    #[arg(long, short = 'o', global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a job from a declarative file or from flags
    Submit(submit::SubmitArgs),

    /// List managed jobs
    List {
        /// Search every namespace known to host jobs
        #[arg(long, short = 'A')]
        all_namespaces: bool,
    },

    /// Show status, recovered spec, events and access methods for a job
    Describe {
        /// Job name (or a pod name copied from the cluster)
        identifier: String,
    },

    /// Delete a job, including orphaned pods left behind by a vanished
    /// controller
    Delete {
        /// Job name (or a pod name copied from the cluster)
        identifier: String,

        /// Skip waiting for the deletion to become visible
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let config = config::Config::load().unwrap_or_default();
    let namespace = cli
        .namespace
        .clone()
        .or_else(|| config.default_namespace.clone());
    let format = resolve_format(cli.format, &config);

    let client = gwm_engine::ClusterClient::connect().await?;

    match cli.command {
        Commands::Submit(args) => {
            submit::run(&client, args, namespace.as_deref(), format).await?;
        }
        Commands::List { all_namespaces } => {
            let ns = if all_namespaces {
                None
            } else {
                namespace.as_deref()
            };
            list::run(&client, ns, format).await?;
        }
        Commands::Describe { identifier } => {
            describe::run(&client, &identifier, namespace.as_deref(), format).await?;
        }
        Commands::Delete { identifier, force } => {
            delete::run(&client, &identifier, namespace.as_deref(), force).await?;
        }
    }

    Ok(())
}

/// The command-line flag wins; otherwise the configured default format,
/// falling back to table when it is absent or unrecognized.
fn resolve_format(flag: Option<output::OutputFormat>, config: &config::Config) -> output::OutputFormat {
    flag.or_else(|| {
        config
            .default_format
            .as_deref()
            .and_then(output::OutputFormat::from_config)
    })
    .unwrap_or_default()
}
