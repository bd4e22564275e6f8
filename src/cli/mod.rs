//! # Command Line Interface
//!
//! Operator commands for checking which identity resolves, inspecting a
//! cluster and producing a kubeconfig through the same caches the tool
//! handlers use.

pub mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::clients::{ClusterApi, ServiceKind};
use crate::config::AppConfig;
use crate::credentials::{resolve, CredentialFields};
use crate::kubeconfig::KubeconfigMode;
use crate::observability::{init_logging, log_config_info};
use crate::runtime::AckRuntime;
use output::{print_output, OutputFormat};

#[derive(Parser)]
#[command(name = "ackplane")]
#[command(about = "Credential-scoped ACK client and kubeconfig tooling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Region override (defaults to REGION_ID)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show which credential strategy resolves from the environment
    Credentials,

    /// Print cluster detail from the container service
    DescribeCluster {
        /// Cluster id
        #[arg(long)]
        cluster_id: String,
    },

    /// Provision a kubeconfig, print it, then release cached files
    Kubeconfig {
        /// Cluster id
        #[arg(long)]
        cluster_id: String,

        /// Acquisition mode (LOCAL, ACK_PUBLIC, ACK_PRIVATE, INCLUSTER)
        #[arg(long)]
        mode: Option<KubeconfigMode>,

        /// Kubeconfig file for LOCAL mode
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

/// Redacted summary of the resolved identity
#[derive(Debug, Serialize)]
pub struct CredentialReport {
    pub strategy: &'static str,
    pub access_key_id: Option<String>,
    pub region: String,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    init_logging(&config.logging, cli.verbose)?;
    log_config_info(&config);

    let region = cli.region.clone().unwrap_or_default();
    let runtime = AckRuntime::from_config(config)?;
    let fields = CredentialFields::default();

    match cli.command {
        Commands::Credentials => {
            let report = credential_report(&runtime, &fields, &region)?;
            print_output(&report, cli.output)?;
        }
        Commands::DescribeCluster { cluster_id } => {
            let client = runtime.get_client(&fields, &region, ServiceKind::ContainerService).await?;
            let detail = client
                .describe_cluster_detail(&cluster_id)
                .await
                .with_context(|| format!("Failed to describe cluster {}", cluster_id))?;
            print_output(&detail, cli.output)?;
        }
        Commands::Kubeconfig { cluster_id, mode, path } => {
            let result = runtime.get_config_path(&cluster_id, &region, mode, path.as_deref(), &fields).await;
            let content = match result {
                Ok(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display())),
                Err(e) => Err(e.into()),
            };
            runtime.cleanup();
            print!("{}", content?);
        }
    }

    Ok(())
}

fn credential_report(
    runtime: &AckRuntime,
    fields: &CredentialFields,
    region: &str,
) -> anyhow::Result<CredentialReport> {
    let merged = fields.clone().or(&runtime.config().credentials);
    let credential = resolve(&merged)?;
    let access_key_id = Some(credential.redacted_id()).filter(|id| !id.is_empty());

    Ok(CredentialReport {
        strategy: credential.kind(),
        access_key_id,
        region: runtime.clients().effective_region(&merged, region).to_string(),
    })
}
