//! eks-toggle - pause and resume Karpenter on EKS clusters

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use eks_toggle::lambda;
use eks_toggle::server::{self, AppState};
use eks_toggle::{DEFAULT_CONFIG_PATH, DEFAULT_LISTEN_ADDR, LAMBDA_RUNTIME_ENV};
use eks_toggle_common::audit::TracingIntentRecorder;
use eks_toggle_common::telemetry::{init_telemetry, TelemetryConfig};
use eks_toggle_common::ToggleConfig;
use eks_toggle_scaler::{AwsRegionBackend, ScaleOrchestrator};

/// eks-toggle - set a Karpenter CPU limit and resize its node group in one call
#[derive(Parser, Debug)]
#[command(name = "eks-toggle", version, about, long_about = None)]
struct Cli {
    /// Path to the cluster mapping YAML
    #[arg(
        long,
        global = true,
        env = "EKS_TOGGLE_CONFIG",
        default_value = DEFAULT_CONFIG_PATH
    )]
    config: PathBuf,

    /// Address the local server listens on
    #[arg(
        long,
        global = true,
        env = "EKS_TOGGLE_LISTEN",
        default_value = DEFAULT_LISTEN_ADDR
    )]
    listen: SocketAddr,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API on a local listener
    Serve,

    /// Run under the AWS Lambda runtime
    ///
    /// Default when AWS_LAMBDA_RUNTIME_API is set.
    Lambda,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Every outbound TLS connection (STS, EKS, the cluster API) goes through rustls
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!(
            "CRITICAL: Failed to install aws-lc-rs crypto provider: {:?}. \
             eks-toggle cannot make TLS connections without it.",
            e
        );
        std::process::exit(1);
    }

    init_telemetry(TelemetryConfig::default())?;

    let cli = Cli::parse();

    let config = ToggleConfig::load(&cli.config)?;
    let clusters: Vec<&str> = config.clusters.clusters().collect();
    info!(
        config = %cli.config.display(),
        clusters = ?clusters,
        default_region = %config.default_region,
        "Loaded cluster mapping"
    );

    let backend = AwsRegionBackend::new(config.node_pool.clone());
    let orchestrator = ScaleOrchestrator::new(
        Arc::new(config),
        Arc::new(backend),
        Arc::new(TracingIntentRecorder),
    );
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };

    let command = cli.command.unwrap_or_else(|| {
        if std::env::var_os(LAMBDA_RUNTIME_ENV).is_some() {
            Commands::Lambda
        } else {
            Commands::Serve
        }
    });

    match command {
        Commands::Lambda => lambda::run(state).await?,
        Commands::Serve => server::serve(cli.listen, state).await?,
    }

    Ok(())
}
