//! Resource store consumed by the reconciler
//!
//! The reconciler only needs get/create/update/delete on two kinds, so it
//! talks to this trait instead of `kube::Api` directly. Production code uses
//! [`KubeStore`]; tests substitute an in-memory store or a mock.
//!
//! Implementations map API outcomes onto [`Error::NotFound`],
//! [`Error::AlreadyExists`] and [`Error::Conflict`] so the reconciler can tell
//! benign races from real failures.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::crd::RedisFleet;
use crate::Error;

/// Kind label used in store errors for fleets
pub const FLEET_KIND: &str = "RedisFleet";

/// Kind label used in store errors for pods
pub const POD_KIND: &str = "Pod";

/// Store operations needed to reconcile a RedisFleet
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Get a fleet by key, `None` if it does not exist
    async fn get_fleet(&self, namespace: &str, name: &str) -> Result<Option<RedisFleet>, Error>;

    /// Get a child pod by key, `None` if it does not exist
    async fn get_child(&self, namespace: &str, name: &str) -> Result<Option<Pod>, Error>;

    /// Create a child pod
    ///
    /// Fails with [`Error::AlreadyExists`] if a pod with that name exists.
    async fn create_child(&self, pod: &Pod) -> Result<(), Error>;

    /// Replace a fleet, guarded by the resourceVersion it was read at
    ///
    /// Fails with [`Error::Conflict`] if the fleet changed since it was read.
    async fn update_fleet(&self, fleet: &RedisFleet) -> Result<RedisFleet, Error>;

    /// Delete a child pod
    ///
    /// Fails with [`Error::NotFound`] if the pod does not exist.
    async fn delete_child(&self, namespace: &str, name: &str) -> Result<(), Error>;
}

/// [`ResourceStore`] backed by the Kubernetes API
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a new store wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Map a kube error for `kind namespace/name` onto the store error taxonomy
pub fn classify(err: kube::Error, kind: &str, namespace: &str, name: &str) -> Error {
    match &err {
        kube::Error::Api(ae) if ae.code == 404 => Error::not_found(kind, namespace, name),
        kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
            Error::already_exists(kind, namespace, name)
        }
        kube::Error::Api(ae) if ae.code == 409 => {
            Error::conflict(kind, namespace, name, ae.message.clone())
        }
        _ => Error::from(err),
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_fleet(&self, namespace: &str, name: &str) -> Result<Option<RedisFleet>, Error> {
        let api: Api<RedisFleet> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| classify(e, FLEET_KIND, namespace, name))
    }

    async fn get_child(&self, namespace: &str, name: &str) -> Result<Option<Pod>, Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| classify(e, POD_KIND, namespace, name))
    }

    async fn create_child(&self, pod: &Pod) -> Result<(), Error> {
        let namespace = pod
            .namespace()
            .ok_or_else(|| Error::validation("child pod must be namespaced"))?;
        let name = pod.name_any();
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), pod)
            .await
            .map_err(|e| classify(e, POD_KIND, &namespace, &name))?;
        debug!(pod = %name, namespace = %namespace, "created pod");
        Ok(())
    }

    async fn update_fleet(&self, fleet: &RedisFleet) -> Result<RedisFleet, Error> {
        let namespace = fleet
            .namespace()
            .ok_or_else(|| Error::validation("RedisFleet must be namespaced"))?;
        let name = fleet.name_any();
        let api: Api<RedisFleet> = Api::namespaced(self.client.clone(), &namespace);
        api.replace(&name, &PostParams::default(), fleet)
            .await
            .map_err(|e| classify(e, FLEET_KIND, &namespace, &name))
    }

    async fn delete_child(&self, namespace: &str, name: &str) -> Result<(), Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map_err(|e| classify(e, POD_KIND, namespace, name))?;
        debug!(pod = %name, namespace = %namespace, "deleted pod");
        Ok(())
    }
}
