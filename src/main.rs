//! Redis Fleet operator - keeps fleets of Redis pods at their declared size

use std::time::Duration;

use clap::{Parser, Subcommand};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, CustomResourceExt};

use redis_fleet::config::ControllerConfig;
use redis_fleet::controller_runner::build_fleet_controller;
use redis_fleet::crd::RedisFleet;
use redis_fleet::retry::{retry_with_backoff, RetryConfig};
use redis_fleet::telemetry::{init_telemetry, TelemetryConfig};
use redis_fleet::FIELD_MANAGER;

/// Redis Fleet - CRD-driven operator for fleets of Redis pods
#[derive(Parser, Debug)]
#[command(name = "redis-fleet", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(flatten)]
    config: ControllerConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Installs the RedisFleet CRD, then reconciles every RedisFleet in the
    /// watched namespace (or the whole cluster) until SIGTERM.
    Controller,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&RedisFleet::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    init_telemetry(TelemetryConfig {
        watch_namespace: cli.config.watch_namespace.clone(),
        ..Default::default()
    })
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli.config).await,
    }
}

async fn run_controller(config: ControllerConfig) -> anyhow::Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    tracing::info!(
        image = %config.child_image,
        namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        "Starting Redis Fleet controller"
    );

    let client = build_client(&config).await?;

    retry_with_backoff(
        &RetryConfig::with_max_attempts(10),
        "install RedisFleet CRD",
        || ensure_crd_installed(&client),
    )
    .await?;

    build_fleet_controller(client, &config).await;

    tracing::info!("Redis Fleet controller shut down");
    Ok(())
}

/// Build a kube client from the configured kubeconfig, or infer one
///
/// Read timeout is kept above the watcher timeout so idle watches are closed
/// by the API server first.
async fn build_client(config: &ControllerConfig) -> anyhow::Result<Client> {
    let mut kube_config = match &config.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                anyhow::anyhow!("Failed to read kubeconfig {}: {}", path.display(), e)
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| anyhow::anyhow!("Invalid kubeconfig {}: {}", path.display(), e))?
        }
        None => Config::infer()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to infer kube config: {}", e))?,
    };
    kube_config.connect_timeout = Some(Duration::from_secs(10));
    kube_config.read_timeout = Some(Duration::from_secs(30));

    Client::try_from(kube_config).map_err(|e| anyhow::anyhow!("Failed to create kube client: {}", e))
}

/// Ensure the RedisFleet CRD is installed
///
/// The operator installs its own CRD on startup using server-side apply so
/// the CRD version always matches the operator version.
async fn ensure_crd_installed(client: &Client) -> anyhow::Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::api::{Patch, PatchParams};

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    tracing::info!("Installing RedisFleet CRD...");
    crds.patch(
        "redisfleets.fleet.dev",
        &params,
        &Patch::Apply(&RedisFleet::crd()),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to install RedisFleet CRD: {}", e))?;

    tracing::info!("RedisFleet CRD installed/updated");
    Ok(())
}
