//! Routes child pod deletions back to the fleet that owns them
//!
//! A fleet only needs attention when one of its pods disappears, so the
//! controller watches managed pods and turns each `Delete` event into a
//! trigger for the owning fleet. Creates and updates of pods are ignored.

use futures::{stream, Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::Api;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Resource, ResourceExt};
use tracing::{debug, warn};

use crate::crd::RedisFleet;

use super::trigger::ReconcileTrigger;

/// Triggers for every RedisFleet listed as an owner of a deleted pod
///
/// Owners are matched on kind and apiVersion. A pod without a namespace or
/// without a RedisFleet owner yields nothing.
pub fn triggers_for_deleted_child(pod: &Pod) -> Vec<ReconcileTrigger> {
    let Some(namespace) = pod.namespace() else {
        return Vec::new();
    };
    let kind = RedisFleet::kind(&());
    let api_version = RedisFleet::api_version(&());

    pod.owner_references()
        .iter()
        .filter(|owner| owner.kind == kind && owner.api_version == api_version)
        .map(|owner| ReconcileTrigger::new(namespace.clone(), owner.name.clone()))
        .collect()
}

/// Stream of fleet references to reconcile after one of their pods is deleted
pub fn deleted_child_triggers(
    pods: Api<Pod>,
    config: watcher::Config,
) -> impl Stream<Item = ObjectRef<RedisFleet>> + Send + 'static {
    watcher(pods, config)
        .default_backoff()
        .filter_map(|event| async move {
            match event {
                Ok(watcher::Event::Delete(pod)) => {
                    let triggers = triggers_for_deleted_child(&pod);
                    for trigger in &triggers {
                        debug!(pod = %pod.name_any(), fleet = %trigger, "child pod deleted, re-triggering fleet");
                    }
                    Some(stream::iter(
                        triggers.into_iter().map(|t| t.object_ref()),
                    ))
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "pod watch error");
                    None
                }
            }
        })
        .flatten()
}
