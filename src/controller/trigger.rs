//! Reconcile trigger: the key of a fleet that needs reconciling

use std::fmt;

use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;

use crate::crd::RedisFleet;
use crate::Error;

/// Namespace and name of a RedisFleet to reconcile
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReconcileTrigger {
    /// Fleet namespace
    pub namespace: String,
    /// Fleet name
    pub name: String,
}

impl ReconcileTrigger {
    /// Trigger for the fleet `namespace/name`
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Trigger for an observed fleet object
    pub fn for_fleet(fleet: &RedisFleet) -> Result<Self, Error> {
        let namespace = fleet.namespace().ok_or_else(|| {
            Error::validation_for_field(
                fleet.name_any(),
                "metadata.namespace",
                "RedisFleet must be namespaced",
            )
        })?;
        Ok(Self::new(namespace, fleet.name_any()))
    }

    /// `namespace/name` key used for backoff bookkeeping
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Controller queue reference for this fleet
    pub fn object_ref(&self) -> ObjectRef<RedisFleet> {
        ObjectRef::new(&self.name).within(&self.namespace)
    }
}

impl fmt::Display for ReconcileTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
