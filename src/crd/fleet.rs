//! RedisFleet Custom Resource Definition
//!
//! A RedisFleet declares how many Redis pods should run in its namespace and
//! which port they listen on. The operator names the pods `<fleet>-1` through
//! `<fleet>-<replicas>` and records each one it owns in the fleet's
//! finalizer list (see [`crate::tracker`]).

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Highest valid TCP port
const MAX_PORT: i32 = 65535;

/// Specification for a RedisFleet
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "fleet.dev",
    version = "v1alpha1",
    kind = "RedisFleet",
    plural = "redisfleets",
    shortname = "rf",
    namespaced,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Port","type":"integer","jsonPath":".spec.port"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RedisFleetSpec {
    /// Desired number of Redis pods
    pub replicas: i32,

    /// Container port exposed by every pod in the fleet
    pub port: i32,
}

impl RedisFleetSpec {
    /// Validate the fleet specification
    ///
    /// `fleet` is only used to give the error some context.
    pub fn validate(&self, fleet: &str) -> Result<(), Error> {
        if self.replicas < 0 {
            return Err(Error::validation_for_field(
                fleet,
                "spec.replicas",
                format!("replicas must be >= 0, got {}", self.replicas),
            ));
        }
        if !(1..=MAX_PORT).contains(&self.port) {
            return Err(Error::validation_for_field(
                fleet,
                "spec.port",
                format!("port must be between 1 and {}, got {}", MAX_PORT, self.port),
            ));
        }
        Ok(())
    }

    /// Desired replica count as an unsigned value
    ///
    /// Negative counts are rejected by [`validate`](Self::validate); this
    /// clamps them to zero for callers that run before validation.
    pub fn desired_count(&self) -> usize {
        usize::try_from(self.replicas).unwrap_or(0)
    }
}

impl RedisFleet {
    /// Returns true once the API server has marked this fleet for deletion
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}
