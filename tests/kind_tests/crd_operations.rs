//! Integration tests for CRD operations
//!
//! These tests tell the story of how users interact with RedisFleet resources
//! through the Kubernetes API, without a controller running.

use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::ResourceExt;

use redis_fleet::crd::RedisFleet;

use super::helpers::{cleanup_namespace, create_namespace, ensure_test_cluster, sample_fleet};

/// Story: A user creates a fleet and reads it back unchanged
///
/// Without a controller nothing touches the fleet, so the spec round-trips
/// and the ownership tracker starts out empty.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_user_creates_and_reads_fleet() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "rf-crd-create";
    create_namespace(&client, ns).await;
    let api: Api<RedisFleet> = Api::namespaced(client.clone(), ns);

    api.create(&PostParams::default(), &sample_fleet("cache", 3))
        .await
        .expect("failed to create fleet");

    let fetched = api.get("cache").await.expect("failed to get fleet");
    assert_eq!(fetched.spec.replicas, 3);
    assert_eq!(fetched.spec.port, 6379);
    assert!(fetched.finalizers().is_empty());

    cleanup_namespace(&client, ns).await;
}

/// Story: A user scales a fleet by patching its replica count
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_user_patches_replicas() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "rf-crd-patch";
    create_namespace(&client, ns).await;
    let api: Api<RedisFleet> = Api::namespaced(client.clone(), ns);

    api.create(&PostParams::default(), &sample_fleet("cache", 3))
        .await
        .expect("failed to create fleet");

    let patch = serde_json::json!({ "spec": { "replicas": 5 } });
    let patched = api
        .patch("cache", &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .expect("failed to patch fleet");
    assert_eq!(patched.spec.replicas, 5);

    api.delete("cache", &DeleteParams::default())
        .await
        .expect("failed to delete fleet");
    cleanup_namespace(&client, ns).await;
}

/// Story: The short name `rf` resolves to the RedisFleet resource
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_crd_is_discoverable() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");

    let discovery = kube::discovery::Discovery::new(client)
        .run()
        .await
        .expect("discovery failed");
    let group = discovery
        .get("fleet.dev")
        .expect("fleet.dev group should be served");
    let (resource, _caps) = group
        .recommended_kind("RedisFleet")
        .expect("RedisFleet kind should be served");
    assert_eq!(resource.plural, "redisfleets");
}
