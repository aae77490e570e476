//! Test helpers for integration tests
//!
//! Provides utilities for managing the kind cluster, per-test namespaces and
//! an in-process controller.

use std::future::Future;
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;

use k8s_openapi::api::core::v1::{Namespace, Pod};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, Config, CustomResourceExt, ResourceExt};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use redis_fleet::config::ControllerConfig;
use redis_fleet::controller_runner::build_fleet_controller;
use redis_fleet::crd::{RedisFleet, RedisFleetSpec};
use redis_fleet::workload::managed_pod_selector;
use redis_fleet::FIELD_MANAGER;

/// Name of the kind cluster used for integration tests
pub const TEST_CLUSTER_NAME: &str = "redis-fleet-integration-test";

/// How long to wait for the controller to converge
pub const CONVERGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Global lock to ensure cluster is created only once
static CLUSTER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Track if CRD has been installed (async-safe)
static CRD_INSTALLED: OnceCell<Result<(), String>> = OnceCell::const_new();

/// Check if a kind cluster with the given name exists
pub fn kind_cluster_exists(name: &str) -> bool {
    let output = Command::new("kind")
        .args(["get", "clusters"])
        .output()
        .expect("failed to run kind");

    let clusters = String::from_utf8_lossy(&output.stdout);
    clusters.lines().any(|line| line.trim() == name)
}

/// Create a kind cluster for testing
pub fn create_kind_cluster(name: &str) -> Result<(), String> {
    if kind_cluster_exists(name) {
        println!("Kind cluster '{name}' already exists, reusing it");
        return Ok(());
    }

    println!("Creating kind cluster '{name}'...");
    let output = Command::new("kind")
        .args(["create", "cluster", "--name", name, "--wait", "60s"])
        .output()
        .map_err(|e| format!("failed to run kind: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "failed to create kind cluster: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    println!("Kind cluster '{name}' created successfully");
    Ok(())
}

/// Install the RedisFleet CRD into the cluster
pub async fn install_crd(client: &Client) -> Result<(), kube::Error> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    println!("Installing RedisFleet CRD...");
    crds.patch(
        "redisfleets.fleet.dev",
        &params,
        &Patch::Apply(&RedisFleet::crd()),
    )
    .await?;

    // Wait for CRD to be established
    sleep(Duration::from_secs(2)).await;

    println!("CRD installed successfully");
    Ok(())
}

/// Create a Kubernetes client connected to the test cluster
pub async fn create_test_client() -> Result<Client, String> {
    // Use the kind cluster context directly without modifying kubeconfig
    let context_name = format!("kind-{TEST_CLUSTER_NAME}");

    let config = Config::from_kubeconfig(&kube::config::KubeConfigOptions {
        context: Some(context_name),
        ..Default::default()
    })
    .await
    .map_err(|e| format!("failed to load kubeconfig: {e}"))?;

    Client::try_from(config).map_err(|e| format!("failed to create client: {e}"))
}

/// Ensure the test cluster is ready (thread-safe, cluster created once)
///
/// Returns a fresh Client for each call - clients should not be shared across test threads.
pub async fn ensure_test_cluster() -> Result<Client, String> {
    let cluster_result = CLUSTER_INIT.get_or_init(|| create_kind_cluster(TEST_CLUSTER_NAME));
    cluster_result.clone()?;

    let client = create_test_client().await?;

    let crd_result = CRD_INSTALLED
        .get_or_init(|| async {
            let client = create_test_client().await?;
            install_crd(&client)
                .await
                .map_err(|e| format!("failed to install CRD: {e}"))
        })
        .await;

    crd_result.clone()?;

    Ok(client)
}

/// Create a fresh namespace for one test
pub async fn create_namespace(client: &Client, name: &str) {
    let api: Api<Namespace> = Api::all(client.clone());
    let _ = api.delete(name, &DeleteParams::default()).await;
    wait_until(CONVERGE_TIMEOUT, || {
        let api = api.clone();
        async move { matches!(api.get_opt(name).await, Ok(None)) }
    })
    .await;

    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    api.create(&PostParams::default(), &ns)
        .await
        .expect("failed to create namespace");
}

/// Delete a test namespace, ignoring errors
pub async fn cleanup_namespace(client: &Client, name: &str) {
    let api: Api<Namespace> = Api::all(client.clone());
    let _ = api.delete(name, &DeleteParams::default()).await;
}

/// Controller running in-process for the duration of a test
///
/// Aborted when dropped.
pub struct RunningController {
    handle: JoinHandle<()>,
}

impl Drop for RunningController {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start a controller that only watches `namespace`
pub fn start_controller(client: Client, namespace: &str) -> RunningController {
    let config = ControllerConfig {
        watch_namespace: Some(namespace.to_string()),
        backoff_base_secs: 1,
        backoff_max_secs: 5,
        ..Default::default()
    };
    RunningController {
        handle: tokio::spawn(build_fleet_controller(client, &config)),
    }
}

/// Build a RedisFleet with the given replica count
pub fn sample_fleet(name: &str, replicas: i32) -> RedisFleet {
    RedisFleet::new(
        name,
        RedisFleetSpec {
            replicas,
            port: 6379,
        },
    )
}

/// Names of managed pods in `namespace`, sorted
pub async fn managed_pod_names(client: &Client, namespace: &str) -> Vec<String> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let pods = api
        .list(&ListParams::default().labels(&managed_pod_selector()))
        .await
        .expect("failed to list pods");
    let mut names: Vec<String> = pods
        .items
        .iter()
        .filter(|p| p.metadata.deletion_timestamp.is_none())
        .map(|p| p.name_any())
        .collect();
    names.sort();
    names
}

/// Poll `condition` every 500ms until it holds, panicking after `timeout`
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {timeout:?}");
        }
        sleep(Duration::from_millis(500)).await;
    }
}
