use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use nodepool_cordon::cli::{format_dry_run, load_env_file, Args};
use nodepool_cordon::cluster::{ClusterApi, DryRunCluster, KubeCluster};
use nodepool_cordon::reconcile::{ReconcileConfig, Reconciler, RunReport};

async fn reconcile<C: ClusterApi>(
    cluster: C,
    config: ReconcileConfig,
) -> Result<RunReport, anyhow::Error> {
    Ok(Reconciler::new(cluster, config).run().await?)
}

async fn execute(args: &Args, config: ReconcileConfig) -> Result<RunReport, anyhow::Error> {
    let cluster = KubeCluster::connect(args.kubeconfig.as_deref())
        .await
        .context("Failed to build cluster client")?;
    debug!("Cluster client properly retrieved");

    if args.dry_run {
        info!("Dry-run mode: no changes will be sent to the cluster");
        reconcile(DryRunCluster::new(cluster), config).await
    } else {
        reconcile(cluster, config).await
    }
}

#[tokio::main]
async fn main() {
    let mut args = Args::parse();

    // Load .env file first so its values can feed flag environment variables
    if let Some(env_file) = args.env_file.clone() {
        if let Err(e) = load_env_file(&env_file) {
            eprintln!("Failed to load env file {}: {}", env_file.display(), e);
            process::exit(1);
        }
        args = Args::parse();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .init();

    let config = args.reconcile_config();

    match execute(&args, config.clone()).await {
        Ok(report) => {
            if args.dry_run {
                println!("{}", format_dry_run(&report, &config));
            }
        }
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}
