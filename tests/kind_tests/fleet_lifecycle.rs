//! Integration tests for the RedisFleet controller
//!
//! Each test runs its own controller scoped to its own namespace, then
//! drives a fleet through a lifecycle step and waits for the cluster to
//! converge.

use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::ResourceExt;

use redis_fleet::crd::RedisFleet;

use super::helpers::{
    cleanup_namespace, create_namespace, ensure_test_cluster, managed_pod_names, sample_fleet,
    start_controller, wait_until, CONVERGE_TIMEOUT,
};

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Story: A user creates a fleet, scales it up, then scales it down
///
/// Expected behavior:
/// - pods `cache-1..=cache-N` appear and are recorded on the fleet
/// - scaling down removes the highest-numbered pods
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_fleet_scales_up_and_down() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "rf-scale";
    create_namespace(&client, ns).await;
    let _controller = start_controller(client.clone(), ns);
    let fleets: Api<RedisFleet> = Api::namespaced(client.clone(), ns);

    fleets
        .create(&PostParams::default(), &sample_fleet("cache", 3))
        .await
        .expect("failed to create fleet");

    wait_until(CONVERGE_TIMEOUT, || {
        let client = client.clone();
        async move {
            managed_pod_names(&client, ns).await == names(&["cache-1", "cache-2", "cache-3"])
        }
    })
    .await;

    let fleet = fleets.get("cache").await.expect("failed to get fleet");
    assert_eq!(fleet.finalizers(), ["cache-1", "cache-2", "cache-3"]);

    let patch = serde_json::json!({ "spec": { "replicas": 1 } });
    fleets
        .patch("cache", &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .expect("failed to scale down");

    wait_until(CONVERGE_TIMEOUT, || {
        let client = client.clone();
        async move { managed_pod_names(&client, ns).await == names(&["cache-1"]) }
    })
    .await;

    wait_until(CONVERGE_TIMEOUT, || {
        let fleets = fleets.clone();
        async move {
            fleets
                .get("cache")
                .await
                .map(|f| f.finalizers() == ["cache-1"])
                .unwrap_or(false)
        }
    })
    .await;

    cleanup_namespace(&client, ns).await;
}

/// Story: Someone deletes a fleet pod by hand and the controller recreates it
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_deleted_pod_is_recreated() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "rf-heal";
    create_namespace(&client, ns).await;
    let _controller = start_controller(client.clone(), ns);
    let fleets: Api<RedisFleet> = Api::namespaced(client.clone(), ns);
    let pods: Api<Pod> = Api::namespaced(client.clone(), ns);

    fleets
        .create(&PostParams::default(), &sample_fleet("cache", 2))
        .await
        .expect("failed to create fleet");

    wait_until(CONVERGE_TIMEOUT, || {
        let client = client.clone();
        async move { managed_pod_names(&client, ns).await == names(&["cache-1", "cache-2"]) }
    })
    .await;

    let original_uid = pods
        .get("cache-2")
        .await
        .expect("cache-2 should exist")
        .uid();
    pods.delete("cache-2", &DeleteParams::default().grace_period(0))
        .await
        .expect("failed to delete pod");

    wait_until(CONVERGE_TIMEOUT, || {
        let pods = pods.clone();
        let original_uid = original_uid.clone();
        async move {
            match pods.get_opt("cache-2").await {
                Ok(Some(pod)) => pod.uid() != original_uid && pod.metadata.deletion_timestamp.is_none(),
                _ => false,
            }
        }
    })
    .await;

    cleanup_namespace(&client, ns).await;
}

/// Story: A user deletes a fleet; its pods go first, then the fleet
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_deleting_fleet_removes_every_pod() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "rf-teardown";
    create_namespace(&client, ns).await;
    let _controller = start_controller(client.clone(), ns);
    let fleets: Api<RedisFleet> = Api::namespaced(client.clone(), ns);

    fleets
        .create(&PostParams::default(), &sample_fleet("cache", 2))
        .await
        .expect("failed to create fleet");

    wait_until(CONVERGE_TIMEOUT, || {
        let client = client.clone();
        async move { managed_pod_names(&client, ns).await.len() == 2 }
    })
    .await;

    fleets
        .delete("cache", &DeleteParams::default())
        .await
        .expect("failed to delete fleet");

    wait_until(CONVERGE_TIMEOUT, || {
        let fleets = fleets.clone();
        async move { matches!(fleets.get_opt("cache").await, Ok(None)) }
    })
    .await;

    wait_until(CONVERGE_TIMEOUT, || {
        let client = client.clone();
        async move { managed_pod_names(&client, ns).await.is_empty() }
    })
    .await;

    cleanup_namespace(&client, ns).await;
}
