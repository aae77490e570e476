//! Operator configuration
//!
//! Every setting can come from a flag or an environment variable so the
//! operator Deployment can be configured without changing its args.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::workload::DEFAULT_CHILD_IMAGE;
use crate::Error;

/// Settings for the fleet controller
#[derive(Args, Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    /// Only watch RedisFleets (and their pods) in this namespace
    #[arg(long, env = "FLEET_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Container image used for fleet pods
    #[arg(long, env = "FLEET_CHILD_IMAGE", default_value = DEFAULT_CHILD_IMAGE)]
    pub child_image: String,

    /// First requeue delay after a failed reconcile, in seconds
    #[arg(long, env = "FLEET_BACKOFF_BASE_SECS", default_value_t = 5)]
    pub backoff_base_secs: u64,

    /// Upper bound for the requeue delay, in seconds
    #[arg(long, env = "FLEET_BACKOFF_MAX_SECS", default_value_t = 300)]
    pub backoff_max_secs: u64,

    /// Path to a kubeconfig file (defaults to in-cluster or ~/.kube/config)
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            child_image: DEFAULT_CHILD_IMAGE.to_string(),
            backoff_base_secs: 5,
            backoff_max_secs: 300,
            kubeconfig: None,
        }
    }
}

impl ControllerConfig {
    /// Reject settings the controller cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.child_image.trim().is_empty() {
            return Err(Error::validation("child image must not be empty"));
        }
        if self.backoff_base_secs == 0 {
            return Err(Error::validation("backoff base must be at least 1 second"));
        }
        if self.backoff_max_secs < self.backoff_base_secs {
            return Err(Error::validation(format!(
                "backoff max ({}s) must be >= backoff base ({}s)",
                self.backoff_max_secs, self.backoff_base_secs
            )));
        }
        Ok(())
    }

    /// First requeue delay after a failure
    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    /// Maximum requeue delay
    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}
