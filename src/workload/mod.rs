//! Child pod construction for RedisFleet
//!
//! Every child is a bare Pod with a single Redis container. Pods are fungible:
//! the only thing distinguishing `cache-1` from `cache-2` is the name.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, ContainerPort, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

use crate::crd::RedisFleet;
use crate::Error;

/// Default container image for fleet pods
pub const DEFAULT_CHILD_IMAGE: &str = "redis:5.0.14";

/// Label identifying the application running in the pod
pub const NAME_LABEL: &str = "app.kubernetes.io/name";

/// Label identifying the operator that manages the pod
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`] on pods created by this operator
pub const MANAGED_BY_VALUE: &str = "redis-fleet";

/// Label carrying the owning fleet's name
pub const FLEET_LABEL: &str = "fleet.dev/fleet";

/// Label selector matching every pod this operator manages
pub fn managed_pod_selector() -> String {
    format!("{}={}", MANAGED_BY_LABEL, MANAGED_BY_VALUE)
}

/// Build the child pod `name` for `fleet`
///
/// The pod carries a controller owner reference to the fleet so the garbage
/// collector and the deletion router can find its parent.
pub fn build_child_pod(fleet: &RedisFleet, name: &str, image: &str) -> Result<Pod, Error> {
    let namespace = fleet
        .namespace()
        .ok_or_else(|| Error::validation("RedisFleet must be namespaced"))?;
    let owner = fleet.controller_owner_ref(&()).ok_or_else(|| {
        Error::internal_with_context(
            "workload",
            format!("RedisFleet {} has no uid to own pods with", fleet.name_any()),
        )
    })?;

    let mut labels = BTreeMap::new();
    labels.insert(NAME_LABEL.to_string(), "redis".to_string());
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
    labels.insert(FLEET_LABEL.to_string(), fleet.name_any());

    Ok(Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace),
            labels: Some(labels),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: name.to_string(),
                image: Some(image.to_string()),
                image_pull_policy: Some("IfNotPresent".to_string()),
                ports: Some(vec![ContainerPort {
                    container_port: fleet.spec.port,
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Returns true if `pod` is controlled by `fleet`
///
/// Matches on kind, apiVersion and name; the uid is compared as well when
/// both sides carry one, so a pod left behind by a deleted fleet of the same
/// name is not adopted.
pub fn is_owned_by(pod: &Pod, fleet: &RedisFleet) -> bool {
    let fleet_uid = fleet.uid();
    pod.owner_references().iter().any(|owner| {
        owner.kind == RedisFleet::kind(&())
            && owner.api_version == RedisFleet::api_version(&())
            && owner.name == fleet.name_any()
            && fleet_uid.as_deref().map_or(true, |uid| owner.uid == uid)
    })
}
